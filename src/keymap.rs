//! Key-event to byte translation.
//!
//! Consoles deliver discrete key events rather than bytes. This module
//! produces the bytes a terminal driver would have sent for the same key:
//! capability sequences for named keys, xterm modifier forms when
//! Shift/Alt/Ctrl are held, and the usual Ctrl/Alt folding for printable
//! keys.

use bitflags::bitflags;
use tracing::debug;

use crate::capability::{tparm, Capabilities, Param, StrCap};

bitflags! {
    /// Modifier and lock key state attached to a key event.
    ///
    /// Bit values match the Windows `dwControlKeyState` field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControlKeys: u32 {
        /// Right Alt (AltGr).
        const RIGHT_ALT  = 0x0001;
        /// Left Alt.
        const LEFT_ALT   = 0x0002;
        /// Right Ctrl.
        const RIGHT_CTRL = 0x0004;
        /// Left Ctrl.
        const LEFT_CTRL  = 0x0008;
        /// Shift.
        const SHIFT      = 0x0010;
        /// Num Lock on.
        const NUMLOCK    = 0x0020;
        /// Scroll Lock on.
        const SCROLLLOCK = 0x0040;
        /// Caps Lock on.
        const CAPSLOCK   = 0x0080;
        /// Enhanced (extended) key.
        const ENHANCED   = 0x0100;
    }
}

impl ControlKeys {
    /// Either Ctrl key.
    pub fn ctrl(self) -> bool {
        self.intersects(ControlKeys::LEFT_CTRL | ControlKeys::RIGHT_CTRL)
    }

    /// Either Alt key.
    pub fn alt(self) -> bool {
        self.intersects(ControlKeys::LEFT_ALT | ControlKeys::RIGHT_ALT)
    }

    /// Shift key.
    pub fn shift(self) -> bool {
        self.contains(ControlKeys::SHIFT)
    }

    /// xterm modifier mask: Shift=1, Alt=2, Ctrl=4.
    pub fn modifier_mask(self) -> u8 {
        u8::from(self.shift()) | u8::from(self.alt()) << 1 | u8::from(self.ctrl()) << 2
    }
}

/// A key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// `true` for key-down.
    pub key_down: bool,
    /// Virtual key code.
    pub virtual_key: u16,
    /// Character produced by the key, `'\0'` when none.
    pub character: char,
    /// Modifier state.
    pub control_keys: ControlKeys,
}

impl KeyEvent {
    /// A key-down event.
    pub fn down(virtual_key: u16, character: char, control_keys: ControlKeys) -> Self {
        Self {
            key_down: true,
            virtual_key,
            character,
            control_keys,
        }
    }

    /// A key-up event.
    pub fn up(virtual_key: u16, character: char, control_keys: ControlKeys) -> Self {
        Self {
            key_down: false,
            ..Self::down(virtual_key, character, control_keys)
        }
    }
}

/// Virtual key codes with a dedicated translation.
pub mod vk {
    /// Backspace.
    pub const BACK: u16 = 0x08;
    /// Tab.
    pub const TAB: u16 = 0x09;
    /// Alt (menu) key.
    pub const MENU: u16 = 0x12;
    /// Page Up.
    pub const PRIOR: u16 = 0x21;
    /// Page Down.
    pub const NEXT: u16 = 0x22;
    /// End.
    pub const END: u16 = 0x23;
    /// Home.
    pub const HOME: u16 = 0x24;
    /// Left arrow.
    pub const LEFT: u16 = 0x25;
    /// Up arrow.
    pub const UP: u16 = 0x26;
    /// Right arrow.
    pub const RIGHT: u16 = 0x27;
    /// Down arrow.
    pub const DOWN: u16 = 0x28;
    /// Insert.
    pub const INSERT: u16 = 0x2D;
    /// Delete.
    pub const DELETE: u16 = 0x2E;
    /// F1.
    pub const F1: u16 = 0x70;
    /// F2.
    pub const F2: u16 = 0x71;
    /// F3.
    pub const F3: u16 = 0x72;
    /// F4.
    pub const F4: u16 = 0x73;
    /// F5.
    pub const F5: u16 = 0x74;
    /// F6.
    pub const F6: u16 = 0x75;
    /// F7.
    pub const F7: u16 = 0x76;
    /// F8.
    pub const F8: u16 = 0x77;
    /// F9.
    pub const F9: u16 = 0x78;
    /// F10.
    pub const F10: u16 = 0x79;
    /// F11.
    pub const F11: u16 = 0x7A;
    /// F12.
    pub const F12: u16 = 0x7B;
    /// The `/?` key on US layouts.
    pub const OEM_2: u16 = 191;
}

const ESC: char = '\x1b';

/// Translate a key event into input bytes.
pub fn translate_key(event: &KeyEvent, caps: &Capabilities) -> Vec<u8> {
    let mut chars: Vec<char> = Vec::new();
    let keys = event.control_keys;
    let ch = event.character;

    if !event.key_down {
        // Alt + numpad entry delivers the character on Alt release.
        if event.virtual_key == vk::MENU && ch != '\0' {
            chars.push(ch);
        }
        return encode(&chars);
    }

    if ch == '\x03' {
        chars.push(ch);
        return encode(&chars);
    }

    let altgr_mask = ControlKeys::RIGHT_ALT
        | ControlKeys::LEFT_ALT
        | ControlKeys::RIGHT_CTRL
        | ControlKeys::LEFT_CTRL
        | ControlKeys::SHIFT;
    if ch != '\0' && keys & altgr_mask == ControlKeys::RIGHT_ALT | ControlKeys::LEFT_CTRL {
        chars.push(ch);
        return encode(&chars);
    }

    if let Some(seq) = escape_sequence(event.virtual_key, keys.modifier_mask(), caps) {
        return seq;
    }

    if ch != '\0' {
        if keys.alt() {
            chars.push(ESC);
        }
        if keys.ctrl() && ch.is_ascii() && ch != ' ' && ch != '\n' && ch != '\x7f' {
            let folded = if ch == '?' {
                '\x7f'
            } else {
                char::from((ch.to_ascii_uppercase() as u32 & 0x1f) as u8)
            };
            chars.push(folded);
        } else if keys.ctrl() && ch == '\n' {
            chars.push(ESC);
            chars.push('\r');
        } else {
            chars.push(ch);
        }
    } else if keys.ctrl() {
        let code = match event.virtual_key {
            k @ 0x41..=0x5A => Some(char::from((k - 0x40) as u8)),
            vk::OEM_2 => Some('\x7f'),
            _ => None,
        };
        if let Some(code) = code {
            if keys.alt() {
                chars.push(ESC);
            }
            chars.push(code);
        }
    }
    encode(&chars)
}

fn encode(chars: &[char]) -> Vec<u8> {
    chars.iter().collect::<String>().into_bytes()
}

/// Sequence for a named virtual key, if it has one.
fn escape_sequence(virtual_key: u16, mask: u8, caps: &Capabilities) -> Option<Vec<u8>> {
    let modified = mask > 0;
    let cap = |c: StrCap| caps.string(c).map(str::to_string);
    let pick = |form: &str, c: StrCap| {
        if modified {
            Some(form.to_string())
        } else {
            cap(c)
        }
    };

    let template = match virtual_key {
        vk::BACK => {
            if mask & 2 != 0 {
                Some("\\E^H".to_string())
            } else {
                cap(StrCap::KeyBackspace)
            }
        }
        vk::TAB if mask & 1 != 0 => cap(StrCap::KeyBtab),
        vk::PRIOR => cap(StrCap::KeyPpage),
        vk::NEXT => cap(StrCap::KeyNpage),
        vk::END => pick("\\E[1;%p1%dF", StrCap::KeyEnd),
        vk::HOME => pick("\\E[1;%p1%dH", StrCap::KeyHome),
        vk::LEFT => pick("\\E[1;%p1%dD", StrCap::KeyLeft),
        vk::UP => pick("\\E[1;%p1%dA", StrCap::KeyUp),
        vk::RIGHT => pick("\\E[1;%p1%dC", StrCap::KeyRight),
        vk::DOWN => pick("\\E[1;%p1%dB", StrCap::KeyDown),
        vk::INSERT => cap(StrCap::KeyIc),
        vk::DELETE => cap(StrCap::KeyDc),
        vk::F1..=vk::F12 => {
            let index = usize::from(virtual_key - vk::F1);
            let (form, key) = FUNCTION_KEYS[index];
            pick(form, key)
        }
        _ => None,
    }?;

    match tparm(&template, &[Param::from(mask + 1)]) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            debug!(virtual_key, "cannot expand key sequence: {}", e);
            None
        }
    }
}

const FUNCTION_KEYS: [(&str, StrCap); 12] = [
    ("\\E[1;%p1%dP", StrCap::KeyF1),
    ("\\E[1;%p1%dQ", StrCap::KeyF2),
    ("\\E[1;%p1%dR", StrCap::KeyF3),
    ("\\E[1;%p1%dS", StrCap::KeyF4),
    ("\\E[15;%p1%d~", StrCap::KeyF5),
    ("\\E[17;%p1%d~", StrCap::KeyF6),
    ("\\E[18;%p1%d~", StrCap::KeyF7),
    ("\\E[19;%p1%d~", StrCap::KeyF8),
    ("\\E[20;%p1%d~", StrCap::KeyF9),
    ("\\E[21;%p1%d~", StrCap::KeyF10),
    ("\\E[23;%p1%d~", StrCap::KeyF11),
    ("\\E[24;%p1%d~", StrCap::KeyF12),
];
