//! FAT materialization (spec §4.2).
//! https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/30e1013a-a0ff-4404-9ccf-d75d835ff404

use crate::error::CfbResult;
use crate::header::HeaderParams;
use crate::sector::{read_sector_ids, SectorId};
use crate::source::ByteSource;

/// Reads every FAT sector in `fat_sectors` (in order) and concatenates
/// their entries into one flat allocation table, indexed by sector
/// number.
pub fn materialize(
    header: &HeaderParams,
    fat_sectors: &[u32],
    source: &dyn ByteSource,
) -> CfbResult<Vec<SectorId>> {
    let entries_per_sector = header.sector_size / 4;
    let mut fat = Vec::with_capacity(fat_sectors.len() * entries_per_sector);
    let mut buf = vec![0u8; header.sector_size];
    for &idx in fat_sectors {
        let offset = header.sector_offset(idx);
        source.read_at(offset, &mut buf)?;
        fat.extend(read_sector_ids(&buf, entries_per_sector)?);
    }
    Ok(fat)
}
