//! Directory parser (spec §4.4).
//! https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cfb/a94d7445-c4be-49cd-b6b9-2f4abc663817
//!
//! Parses the fixed 128-byte directory entry records, validates them
//! per-field, then walks the red-black tree rooted at the Root Entry to
//! build an ordered child map for every storage. Kept as a flat
//! `Vec<DirectoryEntry>` plus a derived `Vec<Vec<u32>>` of children, not
//! heap-allocated tree nodes.

use crate::chain::walk_chain;
use crate::diagnostics::{Category, ReaderOptions};
use crate::error::{CfbError, CfbResult};
use crate::header::{sector_id_from_u32, HeaderParams};
use crate::name::{compare_names, decode_name, decode_name_units};
use crate::sector::{MajorVersion, SectorId};
use crate::source::ByteSource;
use binrw::{binrw, BinRead};
use std::cmp::Ordering;
use std::io::Cursor;

pub const ENTRY_LEN: usize = 128;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    #[brw(magic(0x00u8))]
    Empty,
    #[brw(magic(0x01u8))]
    Storage,
    #[brw(magic(0x02u8))]
    Stream,
    #[brw(magic(0x05u8))]
    Root,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    #[brw(magic(0x00u8))]
    Red,
    #[brw(magic(0x01u8))]
    Black,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
struct RawEntry {
    name: [u8; 64],
    name_length: u16,
    object_type: u8,
    color: u8,
    left_sibling_id: u32,
    right_sibling_id: u32,
    child_id: u32,
    clsid: [u8; 16],
    state_bits: u32,
    creation_time: u64,
    modified_time: u64,
    starting_sector_location: u32,
    stream_size: u64,
}

/// A fully validated directory entry (spec §3 "Directory entry").
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: String,
    pub(crate) name_units: Vec<u16>,
    pub object_type: ObjectType,
    pub color: Color,
    pub left: SectorId,
    pub right: SectorId,
    pub child: SectorId,
    pub clsid: [u8; 16],
    pub state_bits: u32,
    pub creation_time: u64,
    pub modified_time: u64,
    pub start_sector: SectorId,
    pub size: u64,
}

impl DirectoryEntry {
    fn parse(buf: &[u8], index: usize, version: MajorVersion, options: &ReaderOptions) -> CfbResult<Self> {
        let raw = RawEntry::read(&mut Cursor::new(buf)).map_err(|e| CfbError::HeaderCorrupt {
            offset: None,
            message: format!("directory entry {index}: {e}"),
        })?;

        let object_type = match raw.object_type {
            0x00 => ObjectType::Empty,
            0x01 => ObjectType::Storage,
            0x02 => ObjectType::Stream,
            0x05 => ObjectType::Root,
            other => {
                options.emit(
                    Category::DirectoryWarning,
                    None,
                    format!("entry {index} has invalid object type {other:#04x}, treating as empty"),
                )?;
                ObjectType::Empty
            }
        };

        let color = match raw.color {
            0x00 => Color::Red,
            0x01 => Color::Black,
            other => {
                options.emit(
                    Category::DirectoryWarning,
                    None,
                    format!("entry {index} has invalid color flag {other:#04x}, treating as black"),
                )?;
                Color::Black
            }
        };

        let mut name_length = raw.name_length;
        if name_length % 2 != 0 || name_length > 64 {
            options.emit(
                Category::DirectoryWarning,
                None,
                format!("entry {index} has invalid name length {name_length}, treating name as empty"),
            )?;
            name_length = 0;
        }

        let left = sector_id_from_u32(raw.left_sibling_id);
        let right = sector_id_from_u32(raw.right_sibling_id);
        let child = sector_id_from_u32(raw.child_id);

        if object_type == ObjectType::Empty
            && (!matches!(left, SectorId::FreeSector)
                || !matches!(right, SectorId::FreeSector)
                || !matches!(child, SectorId::FreeSector))
        {
            options.emit(
                Category::DirectoryWarning,
                None,
                format!("entry {index} is empty but has non-NOSTREAM link fields"),
            )?;
        }

        let mut size = raw.stream_size;
        if version == MajorVersion::Version3 && (size >> 32) != 0 {
            options.emit(
                Category::DirectoryWarning,
                None,
                format!("entry {index} has nonzero high 32 bits of size in a v3 file, masking"),
            )?;
            size &= 0xFFFF_FFFF;
        }

        Ok(DirectoryEntry {
            name: decode_name(&raw.name, name_length),
            name_units: decode_name_units(&raw.name, name_length),
            object_type,
            color,
            left,
            right,
            child,
            clsid: raw.clsid,
            state_bits: raw.state_bits,
            creation_time: raw.creation_time,
            modified_time: raw.modified_time,
            start_sector: sector_id_from_u32(raw.starting_sector_location),
            size,
        })
    }
}

/// Reads the directory sector chain and parses every 128-byte record.
pub fn parse_entries(
    header: &HeaderParams,
    fat: &[SectorId],
    source: &dyn ByteSource,
    options: &ReaderOptions,
) -> CfbResult<Vec<DirectoryEntry>> {
    let dir_sectors = walk_chain(fat, header.first_directory_sector)?;
    let entries_per_sector = header.sector_size / ENTRY_LEN;
    let mut entries = Vec::with_capacity(dir_sectors.len() * entries_per_sector);
    let mut buf = vec![0u8; header.sector_size];

    for sector_idx in dir_sectors {
        let offset = header.sector_offset(sector_idx);
        source.read_at(offset, &mut buf)?;
        for chunk in buf.chunks_exact(ENTRY_LEN) {
            let index = entries.len();
            entries.push(DirectoryEntry::parse(chunk, index, header.major_version, options)?);
        }
    }

    if entries.is_empty() || entries[0].object_type != ObjectType::Root {
        return Err(CfbError::HeaderCorrupt {
            offset: None,
            message: "directory entry 0 is not the Root Entry".to_string(),
        });
    }

    Ok(entries)
}

/// Walks the red-black tree rooted at each storage's `child` pointer and
/// returns, for every entry index, the ordered (CFB-sorted) list of its
/// direct children. Detects directory cycles (fatal), unsorted siblings
/// and red-black violations (warnings), and reports unreachable non-empty
/// entries (warning).
pub fn build_children(entries: &[DirectoryEntry], options: &ReaderOptions) -> CfbResult<Vec<Vec<u32>>> {
    let mut children = vec![Vec::new(); entries.len()];
    let mut visited = vec![false; entries.len()];
    visited[0] = true;

    walk_storage(entries, 0, &mut children, &mut visited, options)?;

    for (index, entry) in entries.iter().enumerate() {
        if index != 0 && entry.object_type != ObjectType::Empty && !visited[index] {
            options.emit(
                Category::DirectoryWarning,
                None,
                format!("entry {index} ('{}') is not reachable from the Root Entry", entry.name),
            )?;
        }
    }

    Ok(children)
}

fn walk_storage(
    entries: &[DirectoryEntry],
    storage_index: usize,
    children: &mut [Vec<u32>],
    visited: &mut [bool],
    options: &ReaderOptions,
) -> CfbResult<()> {
    let root = entries[storage_index].child;
    let SectorId::Regular(root_id) = root else {
        return Ok(());
    };

    let mut collected = Vec::new();
    walk_siblings(entries, root_id, &mut collected, visited, options)?;
    check_red_black(entries, root, options)?;

    for &id in &collected {
        children[storage_index].push(id);
        if matches!(entries[id as usize].object_type, ObjectType::Storage | ObjectType::Root) {
            walk_storage(entries, id as usize, children, visited, options)?;
        }
    }
    Ok(())
}

fn walk_siblings(
    entries: &[DirectoryEntry],
    node_id: u32,
    collected: &mut Vec<u32>,
    visited: &mut [bool],
    options: &ReaderOptions,
) -> CfbResult<()> {
    let idx = node_id as usize;
    if idx >= entries.len() {
        return Err(CfbError::DirectoryCycle {
            offset: None,
            message: format!("sibling id {node_id} is out of range ({} entries)", entries.len()),
        });
    }
    if visited[idx] {
        return Err(CfbError::DirectoryCycle {
            offset: None,
            message: format!("directory entry {node_id} revisited in the tree walk"),
        });
    }
    visited[idx] = true;

    let entry = &entries[idx];

    if let SectorId::Regular(left_id) = entry.left {
        walk_siblings(entries, left_id, collected, visited, options)?;
    }

    if let Some(&prev_id) = collected.last() {
        let prev = &entries[prev_id as usize];
        if compare_names(&prev.name_units, &entry.name_units) != Ordering::Less {
            options.emit(
                Category::DirectoryWarning,
                None,
                format!("'{}' does not sort after '{}' in the directory tree", entry.name, prev.name),
            )?;
        }
    }
    collected.push(node_id);

    if let SectorId::Regular(right_id) = entry.right {
        walk_siblings(entries, right_id, collected, visited, options)?;
    }

    Ok(())
}

/// Recursively checks no-two-consecutive-reds and equal-black-height,
/// emitting a warning (never failing) on any violation. Only safe to call
/// after [`walk_siblings`] has already proven the subtree acyclic.
fn check_red_black(entries: &[DirectoryEntry], root: SectorId, options: &ReaderOptions) -> CfbResult<u32> {
    let SectorId::Regular(idx) = root else {
        return Ok(0);
    };
    let entry = &entries[idx as usize];
    let left_height = check_red_black(entries, entry.left, options)?;
    let right_height = check_red_black(entries, entry.right, options)?;

    if left_height != right_height {
        options.emit(
            Category::DirectoryWarning,
            None,
            format!(
                "unequal black-height under '{}' ({left_height} vs {right_height})",
                entry.name
            ),
        )?;
    }

    if entry.color == Color::Red {
        let left_is_red = matches!(entry.left, SectorId::Regular(l) if entries[l as usize].color == Color::Red);
        let right_is_red = matches!(entry.right, SectorId::Regular(r) if entries[r as usize].color == Color::Red);
        if left_is_red || right_is_red {
            options.emit(
                Category::DirectoryWarning,
                None,
                format!("red node '{}' has a red child", entry.name),
            )?;
        }
    }

    let increment = if entry.color == Color::Black { 1 } else { 0 };
    Ok(left_height.max(right_height) + increment)
}
