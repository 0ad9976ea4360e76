//! Capability sources: the infocmp text format, built-in tables and the
//! `infocmp` tool.

use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

use super::names::{BoolCap, NumCap, StrCap};
use super::{CapabilityLookup, Capabilities};
use crate::error::{Result, TtyError};

/// Type used when a requested type is unknown.
pub const FALLBACK_TYPE: &str = "ansi";

const BUILTIN: &[(&str, &str)] = &[
    ("ansi", include_str!("data/ansi.caps")),
    ("dumb", include_str!("data/dumb.caps")),
    ("vt100", include_str!("data/vt100.caps")),
    ("xterm", include_str!("data/xterm.caps")),
    ("xterm-256color", include_str!("data/xterm-256color.caps")),
    ("screen", include_str!("data/screen.caps")),
    ("screen-256color", include_str!("data/screen-256color.caps")),
    ("tmux", include_str!("data/tmux.caps")),
    ("tmux-256color", include_str!("data/tmux-256color.caps")),
    ("windows-vtp", include_str!("data/windows-vtp.caps")),
    ("windows-conemu", include_str!("data/windows-conemu.caps")),
];

/// Parse a terminal description in infocmp source format.
///
/// The first field holds `|`-separated names. Each following field is a
/// boolean (`am`), number (`cols#80`) or string (`cup=\E[...`). `\,`
/// escapes a comma, lines starting with `#` are comments, cancelled
/// (`name@`) and unknown capabilities are skipped. String values are kept
/// in their escaped form.
pub fn parse_infocmp(text: &str) -> Result<Capabilities> {
    let body: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");

    let mut fields = split_fields(&body).into_iter();
    let names = fields
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| TtyError::Parse("capability source has no names line".into()))?;

    let mut caps = Capabilities {
        names: names.split('|').map(|n| n.trim().to_string()).collect(),
        ..Capabilities::default()
    };

    for field in fields {
        if field.is_empty() || field.ends_with('@') {
            continue;
        }
        if let Some((name, value)) = field.split_once('=') {
            if let Some(cap) = StrCap::from_name(name) {
                caps.strings.insert(cap, value.to_string());
            }
        } else if let Some((name, value)) = field.split_once('#') {
            if let Some(cap) = NumCap::from_name(name) {
                let n = parse_number(value)
                    .ok_or_else(|| TtyError::Parse(format!("bad numeric capability `{field}`")))?;
                caps.numbers.insert(cap, n);
            }
        } else if let Some(cap) = BoolCap::from_name(&field) {
            caps.bools.insert(cap);
        }
    }
    Ok(caps)
}

fn split_fields(body: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        fields.push(current.trim().to_string());
    }
    fields
}

fn parse_number(value: &str) -> Option<i32> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        i32::from_str_radix(hex, 16).ok()
    } else if value.len() > 1 && value.starts_with('0') {
        i32::from_str_radix(&value[1..], 8).ok()
    } else {
        value.parse().ok()
    }
}

/// Lookup over the tables compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLookup;

impl BuiltinLookup {
    /// Source text of a built-in table.
    pub fn source(term_type: &str) -> Option<&'static str> {
        BUILTIN
            .iter()
            .find(|(name, _)| *name == term_type)
            .map(|(_, source)| *source)
    }

    /// Names of all built-in tables.
    pub fn types() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }
}

impl CapabilityLookup for BuiltinLookup {
    fn lookup(&self, term_type: &str) -> Capabilities {
        let source = Self::source(term_type).unwrap_or_else(|| {
            debug!(term_type, "unknown terminal type, using {}", FALLBACK_TYPE);
            BUILTIN[0].1
        });
        parse_infocmp(source).unwrap_or_else(|e| {
            warn!("built-in capability table is invalid: {}", e);
            Capabilities::default()
        })
    }
}

/// Lookup through the system `infocmp` tool, falling back to the built-in
/// tables when the tool is missing or does not know the type.
#[derive(Debug, Clone)]
pub struct InfocmpLookup {
    command: PathBuf,
}

impl InfocmpLookup {
    /// Use `infocmp` from `PATH`.
    pub fn new() -> Self {
        Self::with_command("infocmp")
    }

    /// Use a specific `infocmp` executable.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn query(&self, term_type: &str) -> Result<Capabilities> {
        let output = Command::new(&self.command)
            .arg("-x")
            .arg(term_type)
            .output()?;
        if !output.status.success() {
            return Err(TtyError::Parse(format!(
                "infocmp exited with {}",
                output.status
            )));
        }
        parse_infocmp(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for InfocmpLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityLookup for InfocmpLookup {
    fn lookup(&self, term_type: &str) -> Capabilities {
        match self.query(term_type) {
            Ok(caps) => caps,
            Err(e) => {
                debug!(term_type, "infocmp lookup failed: {}", e);
                BuiltinLookup.lookup(term_type)
            }
        }
    }
}
