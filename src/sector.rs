use binrw::{binrw, BinRead};
use std::fmt::{Display, Formatter};
use std::io::Cursor;

/// Boundary and sentinel values for 32-bit sector identifiers.
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/0afa4e43-b18f-432a-9917-4f276eca7a73
pub const MAX_REG_SECT: u32 = 0xFFFFFFFA;
pub const NOT_APPLICABLE: u32 = 0xFFFFFFFB;
pub const DIF_SECT: u32 = 0xFFFFFFFC;
pub const FAT_SECT: u32 = 0xFFFFFFFD;
pub const END_OF_CHAIN: u32 = 0xFFFFFFFE;
pub const FREE_SECT: u32 = 0xFFFFFFFF;

/// A 32-bit sector/stream identifier, as stored in the FAT, mini-FAT, DIFAT
/// and directory entries.
///
/// REGSECT 0x00000000 - 0xFFFFFFF9 Regular sector number.
///
/// MAXREGSECT 0xFFFFFFFA Maximum regular sector number.
///
/// Not applicable 0xFFFFFFFB Reserved for future use.
///
/// DIFSECT 0xFFFFFFFC Specifies a DIFAT sector in the FAT.
///
/// FATSECT 0xFFFFFFFD Specifies a FAT sector in the FAT.
///
/// ENDOFCHAIN 0xFFFFFFFE End of a linked chain of sectors.
///
/// FREESECT 0xFFFFFFFF Specifies an unallocated sector in the FAT, Mini FAT, or DIFAT.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorId {
    #[brw(magic(0xFFFFFFFAu32))]
    MaxRegSector,
    #[brw(magic(0xFFFFFFFBu32))]
    NotApplicable,
    #[brw(magic(0xFFFFFFFCu32))]
    DifatSector,
    #[brw(magic(0xFFFFFFFDu32))]
    FatSector,
    #[default]
    #[brw(magic(0xFFFFFFFEu32))]
    EndOfChain,
    #[brw(magic(0xFFFFFFFFu32))]
    FreeSector,
    Regular(u32),
}

impl SectorId {
    /// True for any value that is not a plain, addressable sector index.
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, SectorId::Regular(_))
    }

    /// The regular sector index this id addresses, if any.
    pub fn index(&self) -> Option<u32> {
        match self {
            SectorId::Regular(v) => Some(*v),
            _ => None,
        }
    }
}

impl Display for SectorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SectorId::MaxRegSector => write!(f, "MaxRegSector"),
            SectorId::NotApplicable => write!(f, "NotApplicable"),
            SectorId::DifatSector => write!(f, "DifatSector"),
            SectorId::FatSector => write!(f, "FatSector"),
            SectorId::EndOfChain => write!(f, "EndOfChain"),
            SectorId::FreeSector => write!(f, "FreeSector"),
            SectorId::Regular(v) => write!(f, "{v}"),
        }
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum MinorVersion {
    #[brw(magic(0x003Eu16))]
    MainVersion,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Eq, PartialEq, Clone, Copy, Default)]
pub enum MajorVersion {
    #[brw(magic(0x0003u16))]
    #[default]
    Version3,
    #[brw(magic(0x0004u16))]
    Version4,
}

impl MajorVersion {
    pub fn expected_sector_shift(&self) -> u16 {
        match self {
            MajorVersion::Version3 => 9,
            MajorVersion::Version4 => 12,
        }
    }

    pub fn number(&self) -> u16 {
        match self {
            MajorVersion::Version3 => 3,
            MajorVersion::Version4 => 4,
        }
    }
}

/// Sector size in bytes implied by a sector-shift exponent (`1 << shift`).
pub fn sector_size_for_shift(shift: u16) -> usize {
    1usize << shift
}

/// Reads `count` consecutive [`SectorId`] values from `buf`.
pub fn read_sector_ids(buf: &[u8], count: usize) -> binrw::BinResult<Vec<SectorId>> {
    let mut cursor = Cursor::new(buf);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(SectorId::read_le(&mut cursor)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_classification() {
        assert!(SectorId::EndOfChain.is_sentinel());
        assert!(SectorId::FreeSector.is_sentinel());
        assert!(!SectorId::Regular(3).is_sentinel());
        assert_eq!(SectorId::Regular(7).index(), Some(7));
        assert_eq!(SectorId::EndOfChain.index(), None);
    }

    #[test]
    fn shift_to_size() {
        assert_eq!(sector_size_for_shift(9), 512);
        assert_eq!(sector_size_for_shift(12), 4096);
    }
}
