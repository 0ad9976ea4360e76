//! Terminal capabilities.
//!
//! A terminal type string resolves to three typed tables (boolean, numeric
//! and string capabilities) through a [`CapabilityLookup`]. String values
//! stay in terminfo source form and are expanded by [`tparm`] at output
//! time.

mod infocmp;
mod names;
mod tparm;

pub use infocmp::{parse_infocmp, BuiltinLookup, InfocmpLookup, FALLBACK_TYPE};
pub use names::{BoolCap, NumCap, StrCap};
pub use tparm::{tparm, Param};

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;

/// Resolves a terminal type to its capabilities.
///
/// Implementations never fail: an unknown type yields the minimal
/// [`FALLBACK_TYPE`] table.
pub trait CapabilityLookup: Send + Sync {
    /// Capabilities of `term_type`.
    fn lookup(&self, term_type: &str) -> Capabilities;
}

/// Capability tables of one terminal type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub(crate) names: Vec<String>,
    pub(crate) bools: BTreeSet<BoolCap>,
    pub(crate) numbers: BTreeMap<NumCap, i32>,
    pub(crate) strings: BTreeMap<StrCap, String>,
}

impl Capabilities {
    /// Names of the described type, primary name first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether a boolean capability is present.
    pub fn bool(&self, cap: BoolCap) -> bool {
        self.bools.contains(&cap)
    }

    /// Value of a numeric capability.
    pub fn number(&self, cap: NumCap) -> Option<i32> {
        self.numbers.get(&cap).copied()
    }

    /// Unexpanded value of a string capability.
    pub fn string(&self, cap: StrCap) -> Option<&str> {
        self.strings.get(&cap).map(String::as_str)
    }

    /// Set or clear a boolean capability.
    pub fn set_bool(&mut self, cap: BoolCap, on: bool) {
        if on {
            self.bools.insert(cap);
        } else {
            self.bools.remove(&cap);
        }
    }

    /// Set a numeric capability.
    pub fn set_number(&mut self, cap: NumCap, value: i32) {
        self.numbers.insert(cap, value);
    }

    /// Set a string capability (in terminfo source form).
    pub fn set_string(&mut self, cap: StrCap, value: impl Into<String>) {
        self.strings.insert(cap, value.into());
    }

    /// Remove a string capability.
    pub fn remove_string(&mut self, cap: StrCap) -> Option<String> {
        self.strings.remove(&cap)
    }

    /// Expand a string capability with parameters.
    ///
    /// Returns `Ok(None)` when the capability is absent.
    pub fn format(&self, cap: StrCap, params: &[Param]) -> Result<Option<Vec<u8>>> {
        self.string(cap).map(|s| tparm(s, params)).transpose()
    }
}
