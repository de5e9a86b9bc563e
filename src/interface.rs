use std::{
    fmt,
    net::Ipv4Addr,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    str::FromStr,
};

use ipnet::Ipv4Net;

use crate::error::RangeError;

const LINK_LOCAL_PREFIX: u8 = 30;

/// A VLAN sub-interface layered on a physical interface, e.g. `eth0.37`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SubInterface {
    physical: String,
    index: u32,
}

impl SubInterface {
    pub fn new(physical: &str, index: u32) -> Self {
        Self {
            physical: physical.into(),
            index,
        }
    }

    pub fn physical(&self) -> &str {
        &self.physical
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Third octet of the link-local block assigned to this sub-interface.
    pub fn net(&self) -> u8 {
        (self.index % 255) as u8
    }

    /// The point-to-point block `169.254.<net>.1/30` written into the artifact.
    pub fn address_block(&self) -> Ipv4Net {
        Ipv4Net::new_assert(Ipv4Addr::new(169, 254, self.net(), 1), LINK_LOCAL_PREFIX)
    }

    pub fn artifact_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("interface_{}", self))
    }
}

impl fmt::Display for SubInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.physical, self.index)
    }
}

/// Inclusive range of sub-interface numbers, parsed from `start-end`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ProbeRange {
    start: u32,
    end: u32,
}

impl ProbeRange {
    /// Creates `[start, end]`; fails if `start > end`.
    pub fn new(start: u32, end: u32) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Descending { start, end });
        }
        Ok(Self { start, end })
    }

    /// First sub-interface number.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last sub-interface number, whose tear-down ends the run.
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of sub-interfaces in the range.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: u32) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// Sub-interface numbers in increasing order.
    pub fn iter(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }
}

impl FromStr for ProbeRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RangeError::Empty);
        }
        let (start, end) = s.split_once('-').ok_or(RangeError::MissingSeparator)?;
        let parse = |bound: &str| {
            bound
                .trim()
                .parse::<u32>()
                .map_err(|_| RangeError::InvalidBound(bound.trim().into()))
        };
        Self::new(parse(start)?, parse(end)?)
    }
}

impl fmt::Display for ProbeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
