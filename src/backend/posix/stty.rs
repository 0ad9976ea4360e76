//! `stty` invocation and text handling.
//!
//! Attributes of a real tty are read by parsing `stty -a` and written by
//! passing only the changed settings back to `stty`. Linux and BSD output
//! differ in layout; both are handled by matching individual tokens.

use std::path::PathBuf;
use std::process::Command;

use regex::Regex;
use tracing::{debug, trace};

use crate::attributes::{
    stty_names, Attributes, ControlChar, ControlFlags, InputFlags, LocalFlags, OutputFlags, Size,
    UNDEFINED,
};
use crate::error::{Result, TtyError};

/// Error text of a partially applied `stty` invocation.
const PARTIAL_FAILURE: &str = "unable to perform all requested operations";

#[cfg(target_os = "linux")]
const DEVICE_FLAG: &str = "-F";
#[cfg(not(target_os = "linux"))]
const DEVICE_FLAG: &str = "-f";

/// Runs `stty` against one device.
pub trait SttyRunner: Send + Sync {
    /// Run `stty` with `args` and return its standard output.
    fn run(&self, args: &[String]) -> Result<String>;
}

/// [`SttyRunner`] spawning the real tool.
#[derive(Debug, Clone)]
pub struct ExecStty {
    program: PathBuf,
    device: String,
}

impl ExecStty {
    /// Run `program` against `device`.
    pub fn new(program: impl Into<PathBuf>, device: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            device: device.into(),
        }
    }
}

impl SttyRunner for ExecStty {
    fn run(&self, args: &[String]) -> Result<String> {
        let command = format!(
            "{} {} {} {}",
            self.program.display(),
            DEVICE_FLAG,
            self.device,
            args.join(" ")
        );
        trace!(%command, "running stty");
        let output = Command::new(&self.program)
            .arg(DEVICE_FLAG)
            .arg(&self.device)
            .args(args)
            .output()
            .map_err(|e| TtyError::Stty {
                command: command.clone(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(TtyError::Stty {
                command,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Name `stty` accepts when setting `cc` on this platform.
fn set_name(cc: ControlChar) -> &'static str {
    match cc {
        #[cfg(not(target_os = "linux"))]
        ControlChar::VReprint => "reprint",
        other => other.stty_name(),
    }
}

/// Names `stty -a` may print for `cc`.
fn print_names(cc: ControlChar) -> &'static [&'static str] {
    match cc {
        ControlChar::VReprint => &["rprnt", "reprint"],
        ControlChar::VEof => &["eof"],
        ControlChar::VEol => &["eol"],
        ControlChar::VEol2 => &["eol2"],
        ControlChar::VErase => &["erase"],
        ControlChar::VWerase => &["werase"],
        ControlChar::VKill => &["kill"],
        ControlChar::VErase2 => &["erase2"],
        ControlChar::VIntr => &["intr"],
        ControlChar::VQuit => &["quit"],
        ControlChar::VSusp => &["susp"],
        ControlChar::VDsusp => &["dsusp"],
        ControlChar::VStart => &["start"],
        ControlChar::VStop => &["stop"],
        ControlChar::VLnext => &["lnext"],
        ControlChar::VDiscard => &["discard"],
        ControlChar::VMin => &["min"],
        ControlChar::VTime => &["time"],
        ControlChar::VStatus => &["status"],
    }
}

struct CcPatterns {
    assigned: Regex,
    spaced: Regex,
}

fn cc_patterns(name: &str) -> Result<CcPatterns> {
    let build = |pattern: String| Regex::new(&pattern).map_err(|e| TtyError::Parse(e.to_string()));
    Ok(CcPatterns {
        assigned: build(format!(r"(?:^|[\s;]){name}\s*=\s*([^\s;]+)"))?,
        spaced: build(format!(r"(?:^|[\s;]){name}\s+([^\s;=]+)"))?,
    })
}

/// Parse the full output of `stty -a`.
pub fn parse_attributes(text: &str) -> Result<Attributes> {
    let mut attrs = Attributes::new();
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|t| !t.is_empty())
        .collect();

    attrs.set_input_flags(parse_flags::<InputFlags>(&tokens));
    attrs.set_output_flags(parse_flags::<OutputFlags>(&tokens));
    attrs.set_control_flags(parse_flags::<ControlFlags>(&tokens));
    attrs.set_local_flags(parse_flags::<LocalFlags>(&tokens));

    for cc in ControlChar::ALL {
        let Some(raw) = find_control_char(text, cc)? else {
            continue;
        };
        let value = if cc.is_numeric() {
            raw.parse()
                .map_err(|_| TtyError::Parse(format!("invalid {} value `{raw}`", cc.stty_name())))?
        } else {
            parse_control_char(&raw)?
        };
        attrs.set_control_char(cc, value);
    }
    Ok(attrs)
}

fn parse_flags<F: bitflags::Flags + Copy>(tokens: &[&str]) -> F {
    let mut flags = F::empty();
    for (name, flag) in stty_names::<F>() {
        for token in tokens {
            if *token == name {
                flags.insert(flag);
            } else if token.strip_prefix('-') == Some(name.as_str()) {
                flags.remove(flag);
            }
        }
    }
    flags
}

fn find_control_char(text: &str, cc: ControlChar) -> Result<Option<String>> {
    for name in print_names(cc) {
        let patterns = cc_patterns(name)?;
        for pattern in [&patterns.assigned, &patterns.spaced] {
            if let Some(value) = pattern.captures(text).and_then(|c| c.get(1)) {
                return Ok(Some(value.as_str().to_string()));
            }
        }
    }
    Ok(None)
}

/// Parse one control-character value as printed by `stty`.
///
/// Understands `<undef>` and `undef` in any case, `DEL`, `^?`, `^X`, `M-^X`, `M-X`,
/// decimal, leading-zero octal and literal characters.
pub fn parse_control_char(value: &str) -> Result<i32> {
    let bad = || TtyError::Parse(format!("invalid control character value `{value}`"));
    if ["<undef>", "undef", "^-"]
        .iter()
        .any(|form| value.eq_ignore_ascii_case(form))
    {
        return Ok(UNDEFINED);
    }
    if value == "DEL" || value == "^?" {
        return Ok(0x7f);
    }
    if let Some(rest) = value.strip_prefix("M-") {
        return Ok(0x80 + parse_control_char(rest)?);
    }
    if let Some(rest) = value.strip_prefix('^') {
        let mut chars = rest.chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Ok(i32::from(c.to_ascii_uppercase() as u8 & 0x1f)),
            _ => Err(bad()),
        };
    }
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        let radix = if value.starts_with('0') { 8 } else { 10 };
        return i32::from_str_radix(value, radix).map_err(|_| bad());
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c as i32),
        _ => Err(bad()),
    }
}

/// Format a control-character value the way `stty` accepts it.
pub fn format_control_char(cc: ControlChar, value: i32) -> String {
    if value < 0 {
        return "undef".to_string();
    }
    if cc.is_numeric() {
        return value.to_string();
    }
    let mut out = String::new();
    let mut v = value;
    if v >= 0x80 {
        out.push_str("M-");
        v -= 0x80;
    }
    if v < 0x20 || v == 0x7f {
        out.push('^');
        v ^= 0x40;
    }
    out.push(char::from_u32(v as u32).unwrap_or('?'));
    out
}

/// Parse the size from `stty -a` output (`24 rows`, `rows 24`, `rows = 24`).
pub fn parse_size(text: &str) -> Result<Size> {
    let find = |what: &str| -> Result<u16> {
        let before = Regex::new(&format!(r"(\d+)\s+{what}"));
        let after = Regex::new(&format!(r"{what}\s*=?\s*(\d+)"));
        let (before, after) = match (before, after) {
            (Ok(before), Ok(after)) => (before, after),
            (Err(e), _) | (_, Err(e)) => return Err(TtyError::Parse(e.to_string())),
        };
        before
            .captures(text)
            .or_else(|| after.captures(text))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| TtyError::Parse(format!("no {what} in stty output")))
    };
    Ok(Size::new(find("columns")?, find("rows")?))
}

fn diff_flags<F: bitflags::Flags + Copy>(desired: F, current: F, out: &mut Vec<String>) {
    for (name, flag) in stty_names::<F>() {
        let want = desired.contains(flag);
        if want != current.contains(flag) {
            out.push(if want { name } else { format!("-{name}") });
        }
    }
}

/// `stty` arguments turning `current` into `desired`.
///
/// Only settings that differ are listed.
pub fn flags_to_set(desired: &Attributes, current: &Attributes) -> Vec<String> {
    let mut args = Vec::new();
    diff_flags(desired.input_flags(), current.input_flags(), &mut args);
    diff_flags(desired.output_flags(), current.output_flags(), &mut args);
    diff_flags(desired.control_flags(), current.control_flags(), &mut args);
    diff_flags(desired.local_flags(), current.local_flags(), &mut args);
    for cc in ControlChar::ALL {
        let want = desired.control_char(cc);
        if want != current.control_char(cc) {
            args.push(set_name(cc).to_string());
            args.push(format_control_char(cc, want));
        }
    }
    args
}

/// Query the current attributes.
pub fn query(runner: &dyn SttyRunner) -> Result<Attributes> {
    parse_attributes(&runner.run(&["-a".to_string()])?)
}

/// Commit `desired`, issuing only the settings that changed.
///
/// A partial failure is checked once against a fresh query; settings that
/// are still wrong are reported as [`TtyError::PartialApply`].
pub fn apply(runner: &dyn SttyRunner, desired: &Attributes) -> Result<()> {
    let current = query(runner)?;
    let args = flags_to_set(desired, &current);
    if args.is_empty() {
        return Ok(());
    }
    debug!(args = %args.join(" "), "applying attributes");
    match runner.run(&args) {
        Ok(_) => Ok(()),
        Err(TtyError::Stty { message, .. }) if message.contains(PARTIAL_FAILURE) => {
            let remaining = flags_to_set(desired, &query(runner)?);
            if remaining.is_empty() {
                Ok(())
            } else {
                Err(TtyError::PartialApply { flags: remaining })
            }
        }
        Err(e) => Err(e),
    }
}
