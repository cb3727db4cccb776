use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Unix permission bits for an archive entry.
///
/// Only values in `0..=0o7777` can be constructed, so an absent override is
/// always expressed as `Option::<Mode>::None` rather than a sentinel value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "ModeRepr")]
pub struct Mode(u32);

impl Mode {
    pub const MAX: u32 = 0o7777;

    /// Default mode for regular file entries (`rw-r--r--`).
    pub const FILE: Mode = Mode(0o644);

    /// Default mode for directory entries (`rwxr-xr-x`).
    pub const DIRECTORY: Mode = Mode(0o755);

    pub fn new(bits: u32) -> Result<Self> {
        if bits > Self::MAX {
            return Err(Error::InvalidMode(bits));
        }
        Ok(Self(bits))
    }

    /// Parse octal text such as `"0644"`, `"644"` or `"0o755"`.
    pub fn parse_octal(text: &str) -> Result<Self> {
        let digits = text.trim();
        let digits = digits.strip_prefix("0o").unwrap_or(digits);
        let bits = u32::from_str_radix(digits, 8)
            .map_err(|_| Error::UnparsableMode(text.to_string()))?;
        Self::new(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_octal(s)
    }
}

impl TryFrom<u32> for Mode {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self> {
        Self::new(bits)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Bits(u32),
    Octal(String),
}

impl TryFrom<ModeRepr> for Mode {
    type Error = Error;

    fn try_from(repr: ModeRepr) -> Result<Self> {
        match repr {
            ModeRepr::Bits(bits) => Self::new(bits),
            ModeRepr::Octal(text) => Self::parse_octal(&text),
        }
    }
}
