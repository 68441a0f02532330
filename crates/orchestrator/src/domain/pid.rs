#![forbid(unsafe_code)]

use std::fmt;

/// Process identifier as exposed by the process table. Unique among running
/// processes, reusable once a process has terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(u32);

impl Pid {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Parse a process-table entry name. Only positive decimal integers are
    /// process identifiers; everything else (`self`, `sys`, ...) is not.
    pub fn parse(name: &str) -> Option<Self> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match name.parse::<u32>() {
            Ok(0) | Err(_) => None,
            Ok(raw) => Some(Self(raw)),
        }
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for Pid {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl TryFrom<i32> for Pid {
    type Error = std::num::TryFromIntError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        u32::try_from(raw).map(Self)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
