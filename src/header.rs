//! Header parser (spec §4.1).
//!
//! Every field is read unconditionally and validated by hand rather than
//! rejected outright by a `binrw` magic match: most version/byte-order/
//! shift mismatches are warnings, not parse failures (§4.1 steps 2, 5, 6,
//! 7, 8).

use crate::diagnostics::{Category, ReaderOptions};
use crate::error::{CfbError, CfbResult};
use crate::sector::{sector_size_for_shift, MajorVersion, SectorId};
use crate::source::ByteSource;
use binrw::{binrw, BinRead};
use std::io::Cursor;

pub const HEADER_LEN: u64 = 512;
const MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const EXPECTED_BYTE_ORDER: u16 = 0xFFFE;
const EXPECTED_MINI_SECTOR_SHIFT: u16 = 6;
const EXPECTED_MINI_STREAM_CUTOFF: u32 = 4096;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
pub(crate) struct RawHeader {
    pub magic: [u8; 8],
    pub clsid: [u8; 16],
    pub minor_version: u16,
    pub major_version: u16,
    pub byte_order: u16,
    pub sector_shift: u16,
    pub mini_sector_shift: u16,
    pub reserved: [u8; 6],
    pub number_of_directory_sectors: u32,
    pub number_of_fat_sectors: u32,
    pub first_directory_sector: u32,
    pub transaction_signature_number: u32,
    pub mini_stream_cutoff_size: u32,
    pub first_mini_fat_sector: u32,
    pub number_of_mini_fat_sectors: u32,
    pub first_difat_sector: u32,
    pub number_of_difat_sectors: u32,
    #[br(count = 109)]
    pub difat_head: Vec<u32>,
}

/// Fully validated, derived header parameters (spec §3 "Header parameters").
#[derive(Debug, Clone)]
pub struct HeaderParams {
    pub major_version: MajorVersion,
    pub sector_shift: u16,
    pub sector_size: usize,
    pub mini_sector_shift: u16,
    pub mini_sector_size: usize,
    pub mini_stream_cutoff: u32,
    pub number_of_fat_sectors: u32,
    pub first_directory_sector: SectorId,
    pub first_mini_fat_sector: SectorId,
    pub number_of_mini_fat_sectors: u32,
    pub first_difat_sector: SectorId,
    pub number_of_difat_sectors: u32,
    pub difat_head: Vec<SectorId>,
    pub sector_count: u64,
}

pub(crate) fn sector_id_from_u32(v: u32) -> SectorId {
    use crate::sector::{DIF_SECT, END_OF_CHAIN, FAT_SECT, FREE_SECT, MAX_REG_SECT, NOT_APPLICABLE};
    match v {
        MAX_REG_SECT => SectorId::MaxRegSector,
        NOT_APPLICABLE => SectorId::NotApplicable,
        DIF_SECT => SectorId::DifatSector,
        FAT_SECT => SectorId::FatSector,
        END_OF_CHAIN => SectorId::EndOfChain,
        FREE_SECT => SectorId::FreeSector,
        other => SectorId::Regular(other),
    }
}

impl HeaderParams {
    pub fn parse(source: &dyn ByteSource, options: &ReaderOptions) -> CfbResult<Self> {
        let mut buf = vec![0u8; HEADER_LEN as usize];
        let n = source.read_at(0, &mut buf)?;
        if n < HEADER_LEN as usize {
            return Err(CfbError::NotCfb {
                offset: Some(n as u64),
                message: format!("file is shorter than the {HEADER_LEN}-byte header"),
            });
        }

        let raw = RawHeader::read(&mut Cursor::new(&buf)).map_err(|e| CfbError::HeaderCorrupt {
            offset: Some(0),
            message: e.to_string(),
        })?;

        if raw.magic != MAGIC {
            return Err(CfbError::NotCfb {
                offset: Some(0),
                message: "magic signature mismatch".to_string(),
            });
        }

        if raw.clsid != [0u8; 16] {
            options.emit(
                Category::NonZeroClsid,
                Some(8),
                "header CLSID is not all-zero",
            )?;
        }

        let major_version = match raw.major_version {
            3 => MajorVersion::Version3,
            4 => MajorVersion::Version4,
            other => {
                return Err(CfbError::InvalidVersion {
                    offset: Some(0x1A),
                    message: format!("unsupported major version {other}"),
                })
            }
        };

        if raw.byte_order != EXPECTED_BYTE_ORDER {
            return Err(CfbError::InvalidByteOrder {
                offset: Some(0x1C),
                message: format!("byte order mark {:#06x} is not little-endian", raw.byte_order),
            });
        }

        if raw.sector_shift != major_version.expected_sector_shift() {
            options.emit(
                Category::SectorSizeWarning,
                Some(0x1E),
                format!(
                    "sector shift {} does not match version {}'s expected {}",
                    raw.sector_shift,
                    major_version.number(),
                    major_version.expected_sector_shift()
                ),
            )?;
        }

        if raw.mini_sector_shift != EXPECTED_MINI_SECTOR_SHIFT {
            options.emit(
                Category::MiniSectorSizeWarning,
                Some(0x20),
                format!("mini sector shift {} is not 6", raw.mini_sector_shift),
            )?;
        }

        if major_version == MajorVersion::Version3 && raw.number_of_directory_sectors != 0 {
            options.emit(
                Category::HeaderFieldWarning,
                Some(0x28),
                "directory sector count is nonzero in a version 3 file",
            )?;
        }

        if raw.mini_stream_cutoff_size != EXPECTED_MINI_STREAM_CUTOFF {
            options.emit(
                Category::CutoffWarning,
                Some(0x38),
                format!(
                    "mini-stream cutoff {} differs from the spec default of {EXPECTED_MINI_STREAM_CUTOFF}",
                    raw.mini_stream_cutoff_size
                ),
            )?;
        }

        let sector_size = sector_size_for_shift(raw.sector_shift);
        let mini_sector_size = sector_size_for_shift(raw.mini_sector_shift);
        let file_len = source.length();
        let sector_count = file_len.saturating_sub(HEADER_LEN) / sector_size as u64;

        let difat_head = raw.difat_head.into_iter().map(sector_id_from_u32).collect();

        Ok(HeaderParams {
            major_version,
            sector_shift: raw.sector_shift,
            sector_size,
            mini_sector_shift: raw.mini_sector_shift,
            mini_sector_size,
            mini_stream_cutoff: raw.mini_stream_cutoff_size,
            number_of_fat_sectors: raw.number_of_fat_sectors,
            first_directory_sector: sector_id_from_u32(raw.first_directory_sector),
            first_mini_fat_sector: sector_id_from_u32(raw.first_mini_fat_sector),
            number_of_mini_fat_sectors: raw.number_of_mini_fat_sectors,
            first_difat_sector: sector_id_from_u32(raw.first_difat_sector),
            number_of_difat_sectors: raw.number_of_difat_sectors,
            difat_head,
            sector_count,
        })
    }

    /// Absolute file offset of the start of sector `index`.
    pub fn sector_offset(&self, index: u32) -> u64 {
        HEADER_LEN + index as u64 * self.sector_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ReaderOptions;
    use crate::source::SliceSource;
    use crate::testutil::minimal_v3_header_bytes;

    #[test]
    fn parses_minimal_header() {
        let bytes = minimal_v3_header_bytes();
        let src = SliceSource::new(bytes);
        let options = ReaderOptions::new();
        let header = HeaderParams::parse(&src, &options).unwrap();
        assert_eq!(header.major_version, MajorVersion::Version3);
        assert_eq!(header.sector_size, 512);
        assert_eq!(header.mini_sector_size, 64);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = minimal_v3_header_bytes();
        bytes[0] = 0;
        let src = SliceSource::new(bytes);
        let options = ReaderOptions::new();
        let err = HeaderParams::parse(&src, &options).unwrap_err();
        assert!(matches!(err, CfbError::NotCfb { .. }));
    }

    #[test]
    fn unusual_sector_shift_warns_not_fails() {
        let mut bytes = minimal_v3_header_bytes();
        bytes[0x1E] = 10; // shift 10 -> 1024 byte sectors
        bytes[0x1F] = 0;
        let src = SliceSource::new(bytes);
        let options = ReaderOptions::new();
        let header = HeaderParams::parse(&src, &options).unwrap();
        assert_eq!(header.sector_size, 1024);
    }

    #[test]
    fn promoted_sector_shift_warning_fails() {
        let mut bytes = minimal_v3_header_bytes();
        bytes[0x1E] = 10;
        bytes[0x1F] = 0;
        let src = SliceSource::new(bytes);
        let options = ReaderOptions::new().promote(Category::SectorSizeWarning);
        let err = HeaderParams::parse(&src, &options).unwrap_err();
        assert!(matches!(err, CfbError::Promoted { .. }));
    }
}
