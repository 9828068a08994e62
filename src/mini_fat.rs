//! Mini-FAT materialization (spec §4.2 / §4.3).
//! https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/c5d235f7-b73c-4ec5-bf8d-5c08306cd023

use crate::chain::walk_chain;
use crate::error::CfbResult;
use crate::header::HeaderParams;
use crate::sector::{read_sector_ids, SectorId};
use crate::source::ByteSource;

/// Materializes the mini-FAT by walking the regular FAT chain starting at
/// the header's first mini-FAT sector, then reading each of those sectors
/// the same way [`crate::fat::materialize`] reads FAT sectors.
pub fn materialize(
    header: &HeaderParams,
    fat: &[SectorId],
    source: &dyn ByteSource,
) -> CfbResult<Vec<SectorId>> {
    if header.number_of_mini_fat_sectors == 0 {
        return Ok(Vec::new());
    }

    let mini_fat_sectors = walk_chain(fat, header.first_mini_fat_sector)?;
    let entries_per_sector = header.sector_size / 4;
    let mut mini_fat = Vec::with_capacity(mini_fat_sectors.len() * entries_per_sector);
    let mut buf = vec![0u8; header.sector_size];
    for idx in mini_fat_sectors {
        let offset = header.sector_offset(idx);
        source.read_at(offset, &mut buf)?;
        mini_fat.extend(read_sector_ids(&buf, entries_per_sector)?);
    }
    Ok(mini_fat)
}
