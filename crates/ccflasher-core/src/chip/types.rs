//! Chip identity types

use core::fmt;

/// Answer to `GET_CHIP_ID`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipId {
    /// Chip id byte
    pub id: u8,
    /// Silicon revision
    pub revision: u8,
}

impl ChipId {
    /// Chip id and revision as one 16-bit value, id in the high byte
    pub const fn raw(&self) -> u16 {
        ((self.id as u16) << 8) | self.revision as u16
    }

    /// The model this id belongs to
    pub const fn model(&self) -> ChipModel {
        ChipModel::from_id(self.id)
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} rev 0x{:02X}", self.id, self.revision)
    }
}

/// Known chip families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipModel {
    /// CC1110 sub-GHz SoC
    Cc1110,
    /// CC1111 sub-GHz SoC with USB
    Cc1111,
    /// CC2530 2.4 GHz 802.15.4 SoC
    Cc2530,
    /// CC2531 2.4 GHz 802.15.4 SoC with USB
    Cc2531,
    /// Anything else, with its id byte
    Unknown(u8),
}

impl ChipModel {
    /// Map a chip id byte to a model
    pub const fn from_id(id: u8) -> Self {
        match id {
            0x01 => Self::Cc1110,
            0x11 => Self::Cc1111,
            0xA5 => Self::Cc2530,
            0xB5 => Self::Cc2531,
            other => Self::Unknown(other),
        }
    }

    /// Largest flash size this model ships with
    ///
    /// The CC253x parts have up to 256 KiB; everything else is assumed to
    /// fit the 32 KiB of the CC111x family.
    pub const fn max_flash_size(&self) -> u32 {
        match self {
            Self::Cc2530 | Self::Cc2531 => 256 * 1024,
            _ => 32 * 1024,
        }
    }

    /// Whether the part carries a factory IEEE address
    pub const fn has_ieee_address(&self) -> bool {
        matches!(self, Self::Cc2530 | Self::Cc2531)
    }

    /// Whether the part has a USB controller
    pub const fn has_usb(&self) -> bool {
        matches!(self, Self::Cc1111 | Self::Cc2531)
    }
}

impl fmt::Display for ChipModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cc1110 => write!(f, "CC1110"),
            Self::Cc1111 => write!(f, "CC1111"),
            Self::Cc2530 => write!(f, "CC2530"),
            Self::Cc2531 => write!(f, "CC2531"),
            Self::Unknown(id) => write!(f, "Unknown (0x{:02X})", id),
        }
    }
}

/// Everything [`identify`](crate::protocol::DebugSession::identify) learns about a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipIdentity {
    /// Raw id
    pub id: ChipId,
    /// Model derived from the id
    pub model: ChipModel,
    /// Debug access is locked (info page reads back as zeros)
    pub locked: bool,
    /// Detected flash size in bytes, `None` when locked
    pub flash_size: Option<u32>,
    /// Factory IEEE address, CC253x only and only when unlocked
    pub ieee_address: Option<[u8; 8]>,
    /// First bytes of the flash information page
    pub info_page: [u8; 8],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_from_id() {
        assert_eq!(ChipModel::from_id(0x01), ChipModel::Cc1110);
        assert_eq!(ChipModel::from_id(0x11), ChipModel::Cc1111);
        assert_eq!(ChipModel::from_id(0xA5), ChipModel::Cc2530);
        assert_eq!(ChipModel::from_id(0xB5), ChipModel::Cc2531);
        assert_eq!(ChipModel::from_id(0x42), ChipModel::Unknown(0x42));
    }

    #[test]
    fn test_nominal_sizes() {
        assert_eq!(ChipModel::Cc2531.max_flash_size(), 262_144);
        assert_eq!(ChipModel::Cc1110.max_flash_size(), 32_768);
        assert_eq!(ChipModel::Unknown(0).max_flash_size(), 32_768);
    }

    #[test]
    fn test_raw_id() {
        let id = ChipId {
            id: 0xA5,
            revision: 0x21,
        };
        assert_eq!(id.raw(), 0xA521);
        assert_eq!(alloc::format!("{}", id.model()), "CC2530");
    }
}
