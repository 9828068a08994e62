//! Container orchestration (spec §4.1–§4.5, §6).
//!
//! [`Container::open`] runs the full pipeline (header, DIFAT, FAT,
//! mini-FAT, directory, mini-stream) once, and hands back an immutable
//! value that [`Entity`](crate::entity::Entity) and
//! [`StreamView`](crate::stream::StreamView) borrow from for the rest of
//! the container's lifetime.

use crate::chain::walk_chain;
use crate::diagnostics::{Category, ReaderOptions};
use crate::difat;
use crate::directory::{self, DirectoryEntry, ObjectType};
use crate::entity::Entity;
use crate::error::{CfbError, CfbResult};
use crate::fat;
use crate::header::HeaderParams;
use crate::mini_fat;
use crate::sector::SectorId;
use crate::source::ByteSource;
use crate::stream::StreamView;

/// A fully parsed, read-only compound file.
pub struct Container {
    header: HeaderParams,
    fat: Vec<SectorId>,
    mini_fat: Vec<SectorId>,
    mini_stream: Vec<u8>,
    entries: Vec<DirectoryEntry>,
    children: Vec<Vec<u32>>,
    options: ReaderOptions,
    source: Box<dyn ByteSource + Send + Sync>,
}

impl Container {
    /// Runs the full open pipeline against `source`, consuming `options`
    /// (later, lazy operations such as opening a stream may still emit
    /// diagnostics through it).
    pub fn open(source: impl ByteSource + Send + Sync + 'static, options: ReaderOptions) -> CfbResult<Self> {
        let header = HeaderParams::parse(&source, &options)?;
        let fat_sectors = difat::collect_fat_sectors(&header, &source, &options)?;
        let fat = fat::materialize(&header, &fat_sectors, &source)?;
        let mini_fat = mini_fat::materialize(&header, &fat, &source)?;
        let entries = directory::parse_entries(&header, &fat, &source, &options)?;
        let children = directory::build_children(&entries, &options)?;
        let mini_stream = read_mini_stream(&header, &fat, &entries[0], &source)?;

        Ok(Self {
            header,
            fat,
            mini_fat,
            mini_stream,
            entries,
            children,
            options,
            source: Box::new(source),
        })
    }

    /// The Root Entry, as an entity: the starting point for every walk.
    pub fn root(&self) -> Entity<'_> {
        Entity::new(self, 0)
    }

    /// Resolves a `/`-separated path (e.g. `"Macros/VBA/Module1"`) from
    /// the root, case-insensitively per the CFB name comparator.
    pub fn entity_by_path(&self, path: &str) -> CfbResult<Entity<'_>> {
        let mut current = self.root();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            current = current.child(component).ok_or_else(|| CfbError::NotFound {
                path: path.to_string(),
            })?;
        }
        Ok(current)
    }

    /// Resolves `path` and opens it as a stream in one step (spec §6
    /// `Container.open(entity_or_path)`).
    pub fn open_path(&self, path: &str) -> CfbResult<StreamView<'_>> {
        self.entity_by_path(path)?.open()
    }

    pub(crate) fn entry(&self, index: u32) -> &DirectoryEntry {
        &self.entries[index as usize]
    }

    pub(crate) fn children_of(&self, index: u32) -> &[u32] {
        &self.children[index as usize]
    }

    /// Opens a stream entry for reading, selecting FAT-mode or
    /// mini-FAT-mode storage per the header's mini-stream cutoff (spec §9
    /// "mini-stream cutoff").
    pub(crate) fn open_stream(&self, index: u32) -> CfbResult<StreamView<'_>> {
        let entry = self.entry(index);
        if entry.object_type != ObjectType::Stream {
            return Err(CfbError::OutOfRange {
                message: format!("entry {index} ('{}') is not a stream", entry.name),
            });
        }

        // A declared size of 0 is empty on any read regardless of
        // start_sector; some writers leave a stray value there rather
        // than ENDOFCHAIN.
        if entry.size == 0 {
            return Ok(StreamView::new(1, Vec::new(), 0, |_, _| Ok(())));
        }

        if entry.size < self.header.mini_stream_cutoff as u64 {
            let mini_sector_size = self.header.mini_sector_size;
            let chain = walk_chain(&self.mini_fat, entry.start_sector)?;
            let capacity = chain.len() as u64 * mini_sector_size as u64;
            let size = self.clamp_declared_size(entry.size, capacity, index)?;
            let mini_stream = self.mini_stream.as_slice();
            Ok(StreamView::new(mini_sector_size, chain, size, move |idx, buf| {
                let offset = idx as usize * mini_sector_size;
                let end = offset + buf.len();
                if end > mini_stream.len() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "mini sector out of range",
                    ));
                }
                buf.copy_from_slice(&mini_stream[offset..end]);
                Ok(())
            }))
        } else {
            let chain = walk_chain(&self.fat, entry.start_sector)?;
            let capacity = chain.len() as u64 * self.header.sector_size as u64;
            let size = self.clamp_declared_size(entry.size, capacity, index)?;
            let header = &self.header;
            let source = self.source.as_ref();
            Ok(StreamView::new(self.header.sector_size, chain, size, move |idx, buf| {
                let offset = header.sector_offset(idx);
                let n = source.read_at(offset, buf)?;
                if n < buf.len() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "short sector read",
                    ));
                }
                Ok(())
            }))
        }
    }

    fn clamp_declared_size(&self, declared: u64, capacity: u64, index: u32) -> CfbResult<u64> {
        if declared > capacity {
            self.options.emit(
                Category::StreamSizeMismatch,
                None,
                format!(
                    "entry {index} declares size {declared} but its chain only reaches {capacity} bytes, clamping"
                ),
            )?;
            Ok(capacity)
        } else {
            Ok(declared)
        }
    }
}

/// The mini-stream is itself stored as a regular stream belonging to the
/// Root Entry; read it out in full once so every mini-mode stream view
/// can index into it directly.
fn read_mini_stream(
    header: &HeaderParams,
    fat: &[SectorId],
    root: &DirectoryEntry,
    source: &dyn ByteSource,
) -> CfbResult<Vec<u8>> {
    if root.size == 0 {
        return Ok(Vec::new());
    }
    let chain = walk_chain(fat, root.start_sector)?;
    let mut buf = Vec::with_capacity(chain.len() * header.sector_size);
    let mut sector_buf = vec![0u8; header.sector_size];
    for idx in chain {
        source.read_at(header.sector_offset(idx), &mut sector_buf)?;
        buf.extend_from_slice(&sector_buf);
    }
    buf.truncate(root.size as usize);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    fn minimal_container_bytes() -> Vec<u8> {
        // header (512) + FAT sector (512) + directory sector (512)
        let mut data = vec![0u8; 512 * 3];
        data[0..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
        data[0x18..0x1A].copy_from_slice(&3u16.to_le_bytes()); // minor version
        data[0x1A..0x1C].copy_from_slice(&3u16.to_le_bytes()); // major version
        data[0x1C..0x1E].copy_from_slice(&0xFFFEu16.to_le_bytes());
        data[0x1E..0x20].copy_from_slice(&9u16.to_le_bytes());
        data[0x20..0x22].copy_from_slice(&6u16.to_le_bytes());
        data[0x2C..0x30].copy_from_slice(&1u32.to_le_bytes()); // number_of_fat_sectors
        data[0x30..0x34].copy_from_slice(&1u32.to_le_bytes()); // first_directory_sector
        data[0x38..0x3C].copy_from_slice(&4096u32.to_le_bytes()); // mini-stream cutoff
        data[0x3C..0x40].copy_from_slice(&0xFFFFFFFEu32.to_le_bytes()); // first mini fat sector
        data[0x44..0x48].copy_from_slice(&0xFFFFFFFEu32.to_le_bytes()); // first difat sector
        // header DIFAT slot 0 -> FAT sector 0
        data[0x4C..0x50].copy_from_slice(&0u32.to_le_bytes());
        for i in 1..109 {
            let off = 0x4C + i * 4;
            data[off..off + 4].copy_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        }

        // FAT sector (index 0, at file offset 512): sector 1 (directory) -> EndOfChain
        let fat_off = 512;
        data[fat_off..fat_off + 4].copy_from_slice(&0xFFFFFFFEu32.to_le_bytes()); // sector 0 itself unused
        data[fat_off + 4..fat_off + 8].copy_from_slice(&0xFFFFFFFEu32.to_le_bytes()); // sector 1 (directory) end

        // Directory sector (index 1, at file offset 1024): just the Root Entry.
        let dir_off = 1024;
        let units: Vec<u16> = "Root Entry".encode_utf16().chain(std::iter::once(0)).collect();
        for (i, u) in units.iter().enumerate() {
            data[dir_off + i * 2..dir_off + i * 2 + 2].copy_from_slice(&u.to_le_bytes());
        }
        let name_length = (units.len() * 2) as u16;
        data[dir_off + 0x40..dir_off + 0x42].copy_from_slice(&name_length.to_le_bytes());
        data[dir_off + 0x42] = 0x05; // Root
        data[dir_off + 0x43] = 0x01; // Black
        data[dir_off + 0x44..dir_off + 0x48].copy_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        data[dir_off + 0x48..dir_off + 0x4C].copy_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        data[dir_off + 0x4C..dir_off + 0x50].copy_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        data[dir_off + 0x74..dir_off + 0x78].copy_from_slice(&0xFFFFFFFEu32.to_le_bytes());

        data
    }

    #[test]
    fn opens_a_minimal_container_and_finds_the_root() {
        let src = SliceSource::new(minimal_container_bytes());
        let container = Container::open(src, ReaderOptions::new()).unwrap();
        let root = container.root();
        assert_eq!(root.name(), "Root Entry");
        assert!(root.is_storage());
        assert!(container.entity_by_path("nonexistent").is_err());
    }
}
