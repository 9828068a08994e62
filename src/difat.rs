//! DIFAT walker (spec §4.2).
//!
//! The DIFAT is logically one long array of FAT sector ids: the first 109
//! entries live in the header itself ([`HeaderParams::difat_head`]); any
//! remainder lives in a singly linked chain of dedicated DIFAT sectors,
//! each holding `sector_size/4 - 1` FAT sector ids followed by a pointer
//! to the next DIFAT sector.

use crate::diagnostics::{Category, ReaderOptions};
use crate::error::{CfbError, CfbResult};
use crate::header::HeaderParams;
use crate::sector::{read_sector_ids, SectorId};
use crate::source::ByteSource;
use std::collections::HashSet;

/// Walks the header DIFAT entries, then any DIFAT sector chain, collecting
/// the ordered list of FAT sector indices.
pub fn collect_fat_sectors(
    header: &HeaderParams,
    source: &dyn ByteSource,
    options: &ReaderOptions,
) -> CfbResult<Vec<u32>> {
    let expected = header.number_of_fat_sectors as usize;
    let mut fat_sectors = Vec::with_capacity(expected);
    let mut seen = HashSet::with_capacity(expected);

    let mut push_entry = |entry: SectorId, fat_sectors: &mut Vec<u32>| -> CfbResult<bool> {
        match entry {
            SectorId::Regular(idx) => {
                if (idx as u64) >= header.sector_count {
                    return Err(CfbError::MalformedFat {
                        offset: None,
                        message: format!("FAT sector {idx} is out of range"),
                    });
                }
                if !seen.insert(idx) {
                    return Err(CfbError::MalformedFat {
                        offset: None,
                        message: format!("FAT sector {idx} appears twice in the DIFAT"),
                    });
                }
                fat_sectors.push(idx);
                Ok(true)
            }
            SectorId::FreeSector | SectorId::EndOfChain => Ok(false),
            other => Err(CfbError::MalformedFat {
                offset: None,
                message: format!("unexpected sentinel {other} in DIFAT"),
            }),
        }
    };

    let mut terminated_early = false;
    for entry in &header.difat_head {
        if fat_sectors.len() >= expected {
            break;
        }
        if !push_entry(*entry, &mut fat_sectors)? {
            terminated_early = fat_sectors.len() < expected;
            break;
        }
    }

    if terminated_early {
        options.emit(
            Category::DifatWarning,
            None,
            "DIFAT terminated inside the header entries before the declared FAT sector count",
        )?;
    }

    // Continue through the DIFAT sector chain if the header declares one.
    let entries_per_sector = header.sector_size / 4 - 1;
    let mut difat_sectors_seen = 0u32;
    let mut cur = header.first_difat_sector;

    loop {
        let idx = match cur {
            SectorId::EndOfChain | SectorId::FreeSector => break,
            SectorId::Regular(idx) => idx,
            other => {
                return Err(CfbError::MalformedFat {
                    offset: None,
                    message: format!("unexpected sentinel {other} in DIFAT sector chain"),
                })
            }
        };

        difat_sectors_seen += 1;
        if difat_sectors_seen > header.number_of_difat_sectors {
            options.emit(
                Category::DifatWarning,
                None,
                "DIFAT sector chain overran the header's declared DIFAT sector count",
            )?;
            break;
        }

        let offset = header.sector_offset(idx);
        let mut buf = vec![0u8; header.sector_size];
        source.read_at(offset, &mut buf)?;

        let entries = read_sector_ids(&buf[..entries_per_sector * 4], entries_per_sector)?;
        for entry in entries {
            if fat_sectors.len() >= expected {
                break;
            }
            push_entry(entry, &mut fat_sectors)?;
        }

        let next = read_sector_ids(&buf[entries_per_sector * 4..entries_per_sector * 4 + 4], 1)?[0];
        cur = next;
    }

    if difat_sectors_seen < header.number_of_difat_sectors {
        options.emit(
            Category::DifatWarning,
            None,
            format!(
                "DIFAT sector chain ended after {difat_sectors_seen} sectors, header declares {}",
                header.number_of_difat_sectors
            ),
        )?;
    }

    if fat_sectors.len() != expected {
        options.emit(
            Category::DifatWarning,
            None,
            format!(
                "collected {} FAT sectors, header declares {expected}",
                fat_sectors.len()
            ),
        )?;
    }

    Ok(fat_sectors)
}
