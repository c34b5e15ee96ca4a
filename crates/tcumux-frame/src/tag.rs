//! Console tags.
//!
//! Each on-chip processor owns one console, identified on the wire by a
//! single tag byte. The set is fixed by the hardware.

use std::fmt;
use std::str::FromStr;

/// Number of consoles multiplexed on the link.
pub const TAG_COUNT: usize = 6;

/// A console identifier as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Sensor Processing Engine.
    Spe = 0xe0,
    /// CPU complex.
    Ccplex = 0xe1,
    /// Boot and Power Management Processor.
    Bpmp = 0xe2,
    /// Safety Cluster Engine.
    Sce = 0xe3,
    /// TrustZone.
    Tz = 0xe4,
    /// Camera Real-time Engine.
    Rce = 0xe5,
}

impl Tag {
    /// Every tag, in wire order.
    pub const ALL: [Tag; TAG_COUNT] = [
        Tag::Spe,
        Tag::Ccplex,
        Tag::Bpmp,
        Tag::Sce,
        Tag::Tz,
        Tag::Rce,
    ];

    /// Look up the tag for a wire byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0xe0 => Some(Tag::Spe),
            0xe1 => Some(Tag::Ccplex),
            0xe2 => Some(Tag::Bpmp),
            0xe3 => Some(Tag::Sce),
            0xe4 => Some(Tag::Tz),
            0xe5 => Some(Tag::Rce),
            _ => None,
        }
    }

    /// The wire byte for this tag.
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Dense index in `0..TAG_COUNT`, for fixed-size per-console tables.
    pub fn index(self) -> usize {
        (self as u8 - Tag::Spe as u8) as usize
    }

    /// Console name as reported to users.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Spe => "SPE",
            Tag::Ccplex => "CCPLEX",
            Tag::Bpmp => "BPMP",
            Tag::Sce => "SCE",
            Tag::Tz => "TZ",
            Tag::Rce => "RCE",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a console name does not match any tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown console name: {0}")]
pub struct UnknownTag(pub String);

impl FromStr for Tag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_bytes_match_hardware_assignment() {
        let table: Vec<(u8, &str)> = Tag::ALL.iter().map(|t| (t.byte(), t.name())).collect();
        assert_eq!(
            table,
            vec![
                (0xe0, "SPE"),
                (0xe1, "CCPLEX"),
                (0xe2, "BPMP"),
                (0xe3, "SCE"),
                (0xe4, "TZ"),
                (0xe5, "RCE"),
            ]
        );
    }

    #[test]
    fn indices_are_dense_and_ordered() {
        for (i, tag) in Tag::ALL.iter().enumerate() {
            assert_eq!(tag.index(), i);
        }
    }

    #[test]
    fn from_byte_rejects_outside_range() {
        assert_eq!(Tag::from_byte(0xdf), None);
        assert_eq!(Tag::from_byte(0xe6), None);
        assert_eq!(Tag::from_byte(0xfd), None);
        assert_eq!(Tag::from_byte(0xff), None);
        for tag in Tag::ALL {
            assert_eq!(Tag::from_byte(tag.byte()), Some(tag));
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("ccplex".parse::<Tag>(), Ok(Tag::Ccplex));
        assert_eq!("RCE".parse::<Tag>(), Ok(Tag::Rce));
        assert!("GPU".parse::<Tag>().is_err());
    }
}
