//! FDB (Forwarding Database) types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GswError;

/// Entries in the MAC bridge table.
pub const MAC_BRIDGE_ENTRIES: u16 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FdbEntryType {
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress {
    bytes: [u8; 6],
}

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Packs the address into MAC bridge key words 0..=2.
    pub fn to_key_words(&self) -> [u16; 3] {
        let b = &self.bytes;
        [
            u16::from_be_bytes([b[4], b[5]]),
            u16::from_be_bytes([b[2], b[3]]),
            u16::from_be_bytes([b[0], b[1]]),
        ]
    }

    pub fn from_key_words(words: &[u16]) -> Self {
        let word = |i: usize| words.get(i).copied().unwrap_or(0).to_be_bytes();
        let (lo, mid, hi) = (word(0), word(1), word(2));
        Self::new([hi[0], hi[1], mid[0], mid[1], lo[0], lo[1]])
    }
}

impl FromStr for MacAddress {
    type Err = GswError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(GswError::invalid_config(format!(
                "Invalid MAC address format: {}",
                s
            )));
        }
        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| GswError::invalid_config(format!("Invalid hex in MAC: {}", part)))?;
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Decoded MAC bridge row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FdbRecord {
    pub index: u16,
    pub mac: MacAddress,
    pub fid: u16,
    pub entry_type: FdbEntryType,
    /// Port bitmap for static entries, raw `val[0]` otherwise.
    pub port_map: u16,
    /// Learned port of a dynamic entry.
    pub learned_port: Option<u8>,
}

impl FdbRecord {
    pub fn is_static(&self) -> bool {
        self.entry_type == FdbEntryType::Static
    }

    /// Whether the record forwards to `port`.
    pub fn matches_port(&self, port: u8) -> bool {
        match self.entry_type {
            FdbEntryType::Static => self.port_map & crate::port_bit(port) != 0,
            FdbEntryType::Dynamic => self.learned_port == Some(port),
        }
    }
}

/// One entry reported by an FDB dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FdbDumpEntry {
    pub mac: MacAddress,
    /// Always 0: the hardware keys by flow id, not VID.
    pub vid: u16,
    pub is_static: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mac_parse_and_display() {
        let mac: MacAddress = "00:11:22:aa:BB:ff".parse().unwrap();
        assert_eq!(mac.as_bytes(), &[0x00, 0x11, 0x22, 0xaa, 0xbb, 0xff]);
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:ff");
    }

    #[test]
    fn test_mac_parse_errors() {
        assert!("00:11:22:33:44".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44:zz".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_mac_key_words() {
        let mac = MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(mac.to_key_words(), [0x4455, 0x2233, 0x0011]);
        assert_eq!(MacAddress::from_key_words(&[0x4455, 0x2233, 0x0011, 7]), mac);
    }

    #[test]
    fn test_mac_serde_as_string() {
        let mac = MacAddress::new([0x02, 0, 0, 0, 0, 0x01]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"02:00:00:00:00:01\"");
        let back: MacAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn test_record_port_match() {
        let mac = MacAddress::new([0x02, 0, 0, 0, 0, 0x01]);
        let fixed = FdbRecord {
            index: 0,
            mac,
            fid: 7,
            entry_type: FdbEntryType::Static,
            port_map: 0x0038,
            learned_port: None,
        };
        assert!(fixed.is_static());
        assert!(fixed.matches_port(3));
        assert!(!fixed.matches_port(1));

        let learned = FdbRecord {
            entry_type: FdbEntryType::Dynamic,
            port_map: 0x0030,
            learned_port: Some(3),
            ..fixed
        };
        assert!(learned.matches_port(3));
        assert!(!learned.matches_port(4));
    }
}
