//! Terminfo parameterized string formatter.
//!
//! Capability strings are stored in their source form (`\E[%i%p1%d;%p2%dH`)
//! and interpreted here: escapes and `^X` controls are decoded, `$<..>`
//! padding is dropped, and `%` directives run on a small stack machine.

use crate::error::{Result, TtyError};

/// A capability parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Integer parameter.
    Int(i64),
    /// String parameter.
    Str(String),
}

impl Param {
    fn as_int(&self) -> i64 {
        match self {
            Param::Int(n) => *n,
            Param::Str(s) => s.trim().parse().unwrap_or(0),
        }
    }

    fn into_string(self) -> String {
        match self {
            Param::Int(n) => n.to_string(),
            Param::Str(s) => s,
        }
    }
}

macro_rules! int_param {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Param {
                fn from(n: $ty) -> Self {
                    Param::Int(n as i64)
                }
            }
        )*
    };
}

int_param!(i32, i64, u8, u16, u32, usize);

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Param::Int(i64::from(b))
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Str(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Str(s)
    }
}

/// Format a capability string with parameters.
pub fn tparm(cap: &str, params: &[Param]) -> Result<Vec<u8>> {
    Formatter::new(cap, params).run()
}

struct Formatter<'a> {
    src: &'a [u8],
    pos: usize,
    params: Vec<Param>,
    stack: Vec<Param>,
    dynamic: [i64; 26],
    fixed: [i64; 26],
    out: Vec<u8>,
}

impl<'a> Formatter<'a> {
    fn new(cap: &'a str, params: &[Param]) -> Self {
        let mut all = params.to_vec();
        all.resize(9, Param::Int(0));
        Self {
            src: cap.as_bytes(),
            pos: 0,
            params: all,
            stack: Vec::new(),
            dynamic: [0; 26],
            fixed: [0; 26],
            out: Vec::with_capacity(cap.len()),
        }
    }

    fn next(&mut self) -> Option<u8> {
        let c = self.src.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect_next(&mut self, what: &str) -> Result<u8> {
        self.next()
            .ok_or_else(|| TtyError::Format(format!("unexpected end of string, expected {what}")))
    }

    fn pop(&mut self) -> Result<Param> {
        self.stack
            .pop()
            .ok_or_else(|| TtyError::Format("stack underflow".into()))
    }

    fn pop_int(&mut self) -> Result<i64> {
        Ok(self.pop()?.as_int())
    }

    fn push_int(&mut self, n: i64) {
        self.stack.push(Param::Int(n));
    }

    fn run(mut self) -> Result<Vec<u8>> {
        while let Some(c) = self.next() {
            match c {
                b'\\' => self.escape()?,
                b'^' => {
                    let x = self.expect_next("control character")?;
                    self.out.push(if x == b'?' { 0x7f } else { x & 0x1f });
                }
                b'$' if self.src.get(self.pos) == Some(&b'<') => {
                    while let Some(p) = self.next() {
                        if p == b'>' {
                            break;
                        }
                    }
                }
                b'%' => self.directive()?,
                _ => self.out.push(c),
            }
        }
        Ok(self.out)
    }

    fn escape(&mut self) -> Result<()> {
        let c = self.expect_next("escape")?;
        let byte = match c {
            b'E' | b'e' => 0x1b,
            b'a' => 0x07,
            b'n' | b'l' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'b' => 0x08,
            b'f' => 0x0c,
            b's' => b' ',
            b'0'..=b'7' => {
                let mut value = u32::from(c - b'0');
                for _ in 0..2 {
                    match self.src.get(self.pos) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                (value & 0xff) as u8
            }
            other => other,
        };
        self.out.push(byte);
        Ok(())
    }

    fn directive(&mut self) -> Result<()> {
        let c = self.expect_next("directive")?;
        match c {
            b'%' => self.out.push(b'%'),
            b'c' => {
                let n = self.pop_int()?;
                self.out.push(n as u8);
            }
            b'p' => {
                let d = self.expect_next("parameter number")?;
                if !(b'1'..=b'9').contains(&d) {
                    return Err(TtyError::Format(format!("bad parameter %p{}", d as char)));
                }
                let param = self.params[usize::from(d - b'1')].clone();
                self.stack.push(param);
            }
            b'P' => {
                let v = self.expect_next("variable name")?;
                let n = self.pop_int()?;
                *self.variable(v)? = n;
            }
            b'g' => {
                let v = self.expect_next("variable name")?;
                let n = *self.variable(v)?;
                self.push_int(n);
            }
            b'\'' => {
                let ch = self.expect_next("character constant")?;
                if self.next() != Some(b'\'') {
                    return Err(TtyError::Format("unterminated character constant".into()));
                }
                self.push_int(i64::from(ch));
            }
            b'{' => {
                let mut n: i64 = 0;
                let mut negative = false;
                loop {
                    match self.expect_next("`}`")? {
                        b'}' => break,
                        b'-' if n == 0 => negative = true,
                        d @ b'0'..=b'9' => n = n * 10 + i64::from(d - b'0'),
                        other => {
                            return Err(TtyError::Format(format!(
                                "bad integer constant character `{}`",
                                other as char
                            )))
                        }
                    }
                }
                self.push_int(if negative { -n } else { n });
            }
            b'l' => {
                let s = self.pop()?.into_string();
                self.push_int(s.len() as i64);
            }
            b'+' | b'-' | b'*' | b'/' | b'm' | b'&' | b'|' | b'^' | b'=' | b'>' | b'<' | b'A'
            | b'O' => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let r = match c {
                    b'+' => a.wrapping_add(b),
                    b'-' => a.wrapping_sub(b),
                    b'*' => a.wrapping_mul(b),
                    b'/' => a.checked_div(b).unwrap_or(0),
                    b'm' => a.checked_rem(b).unwrap_or(0),
                    b'&' => a & b,
                    b'|' => a | b,
                    b'^' => a ^ b,
                    b'=' => i64::from(a == b),
                    b'>' => i64::from(a > b),
                    b'<' => i64::from(a < b),
                    b'A' => i64::from(a != 0 && b != 0),
                    _ => i64::from(a != 0 || b != 0),
                };
                self.push_int(r);
            }
            b'!' => {
                let a = self.pop_int()?;
                self.push_int(i64::from(a == 0));
            }
            b'~' => {
                let a = self.pop_int()?;
                self.push_int(!a);
            }
            b'i' => {
                for p in self.params.iter_mut().take(2) {
                    if let Param::Int(n) = p {
                        *n += 1;
                    }
                }
            }
            b'?' | b';' => {}
            b't' => {
                if self.pop_int()? == 0 {
                    self.skip_branch(true)?;
                }
            }
            b'e' => self.skip_branch(false)?,
            _ => {
                self.pos -= 1;
                self.printf()?;
            }
        }
        Ok(())
    }

    fn variable(&mut self, v: u8) -> Result<&mut i64> {
        match v {
            b'a'..=b'z' => Ok(&mut self.dynamic[usize::from(v - b'a')]),
            b'A'..=b'Z' => Ok(&mut self.fixed[usize::from(v - b'A')]),
            _ => Err(TtyError::Format(format!("bad variable name `{}`", v as char))),
        }
    }

    /// Skip to the end of the current branch.
    ///
    /// With `stop_at_else`, a `%e` at the same nesting level also ends the
    /// skip so the else branch runs.
    fn skip_branch(&mut self, stop_at_else: bool) -> Result<()> {
        let mut level = 0usize;
        while let Some(c) = self.next() {
            if c != b'%' {
                continue;
            }
            match self.next() {
                Some(b'?') => level += 1,
                Some(b';') => {
                    if level == 0 {
                        return Ok(());
                    }
                    level -= 1;
                }
                Some(b'e') if level == 0 && stop_at_else => return Ok(()),
                Some(b'\'') => {
                    self.pos += 2;
                }
                Some(_) => {}
                None => break,
            }
        }
        Err(TtyError::Format("unterminated conditional".into()))
    }

    /// `%[[:]flags][width[.precision]][doxXs]`
    fn printf(&mut self) -> Result<()> {
        if self.src.get(self.pos) == Some(&b':') {
            self.pos += 1;
        }
        let mut left = false;
        let mut plus = false;
        let mut space = false;
        let mut alternate = false;
        let mut zero = false;
        while let Some(&c) = self.src.get(self.pos) {
            match c {
                b'-' => left = true,
                b'+' => plus = true,
                b' ' => space = true,
                b'#' => alternate = true,
                b'0' => zero = true,
                _ => break,
            }
            self.pos += 1;
        }
        let width = self.number();
        let precision = if self.src.get(self.pos) == Some(&b'.') {
            self.pos += 1;
            Some(self.number().unwrap_or(0))
        } else {
            None
        };

        let conv = self.expect_next("conversion")?;
        let body = match conv {
            b'd' | b'o' | b'x' | b'X' => {
                let n = self.pop_int()?;
                let digits = match conv {
                    b'd' => n.unsigned_abs().to_string(),
                    b'o' => format!("{:o}", n),
                    b'x' => format!("{:x}", n),
                    _ => format!("{:X}", n),
                };
                let mut digits = match precision {
                    Some(p) if digits.len() < p => {
                        format!("{}{}", "0".repeat(p - digits.len()), digits)
                    }
                    _ => digits,
                };
                if alternate && n != 0 {
                    match conv {
                        b'o' if !digits.starts_with('0') => digits.insert(0, '0'),
                        b'x' => digits.insert_str(0, "0x"),
                        b'X' => digits.insert_str(0, "0X"),
                        _ => {}
                    }
                }
                let sign = if conv != b'd' {
                    ""
                } else if n < 0 {
                    "-"
                } else if plus {
                    "+"
                } else if space {
                    " "
                } else {
                    ""
                };
                let len = sign.len() + digits.len();
                match width {
                    Some(w) if zero && !left && precision.is_none() && len < w => {
                        format!("{}{}{}", sign, "0".repeat(w - len), digits)
                    }
                    _ => format!("{sign}{digits}"),
                }
            }
            b's' => {
                let s = self.pop()?.into_string();
                match precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s,
                }
            }
            other => {
                return Err(TtyError::Format(format!(
                    "unknown directive `%{}`",
                    other as char
                )))
            }
        };

        let padding = width.map_or(0, |w| w.saturating_sub(body.len()));
        if left {
            self.out.extend_from_slice(body.as_bytes());
            self.out.extend(std::iter::repeat(b' ').take(padding));
        } else {
            self.out.extend(std::iter::repeat(b' ').take(padding));
            self.out.extend_from_slice(body.as_bytes());
        }
        Ok(())
    }

    fn number(&mut self) -> Option<usize> {
        let start = self.pos;
        while matches!(self.src.get(self.pos), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
    }
}
