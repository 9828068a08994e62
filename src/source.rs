//! Byte-source contract (spec §6, inward) plus the two shipped adapters.
//!
//! The core reader never touches a `File` or a `Mmap` directly: it only
//! ever calls [`ByteSource::read_at`]. This keeps header/FAT/directory
//! parsing identical whether the container is memory-mapped or windowed.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

/// A seekable, random-access, read-only view over a CFB container.
///
/// Implementations must not let `read_at` disturb any shared cursor:
/// positional, not stateful, reads.
pub trait ByteSource {
    /// Total length of the container, in bytes.
    fn length(&self) -> u64;

    /// Fill `buf` starting at `offset`. Returns fewer bytes than
    /// `buf.len()` only at end of source.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

/// An in-memory byte source, mainly for tests and for small embedded
/// containers.
pub struct SliceSource {
    data: Vec<u8>,
}

impl SliceSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ByteSource for SliceSource {
    fn length(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Ok(0);
        }
        let available = &self.data[offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }
}

/// Memory-mapped byte source: one shared mapping for the lifetime of the
/// container. Preferred whenever the host can afford to map the whole
/// file (the common case).
pub struct MmapSource {
    mmap: memmap2::Mmap,
}

impl MmapSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(&file)
    }

    pub fn from_file(file: &File) -> io::Result<Self> {
        // Safety: the mapping is read-only and the caller is expected not
        // to mutate the backing file out from under us for the lifetime
        // of this source, the same caveat every `memmap2` consumer
        // accepts.
        let mmap = unsafe { memmap2::Mmap::map(file)? };
        Ok(Self { mmap })
    }
}

impl ByteSource for MmapSource {
    fn length(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let offset = offset as usize;
        if offset >= self.mmap.len() {
            return Ok(0);
        }
        let available = &self.mmap[offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }
}

/// Sliding-window adapter for hosts where mapping the whole container is
/// infeasible (very large files on a constrained virtual address space).
/// Re-reads a `window_size`-byte window from the underlying file whenever
/// a request falls outside the currently cached window.
pub struct WindowedSource {
    file: Mutex<File>,
    length: u64,
    window_size: u64,
    window: Mutex<Window>,
}

struct Window {
    start: u64,
    data: Vec<u8>,
}

impl WindowedSource {
    pub const DEFAULT_WINDOW_SIZE: u64 = 16 * 1024 * 1024;

    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::with_window_size(path, Self::DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window_size(path: impl AsRef<Path>, window_size: u64) -> io::Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            length,
            window_size: window_size.max(1),
            window: Mutex::new(Window {
                start: 0,
                data: Vec::new(),
            }),
        })
    }

    /// Reads a window of at least `min_len` bytes (more, up to
    /// `window_size`, when the file has that much left) starting at
    /// `start`.
    fn fill_window(&self, file: &mut File, start: u64, min_len: u64) -> io::Result<Vec<u8>> {
        let want = min_len.max(self.window_size);
        let end = start.saturating_add(want).min(self.length);
        let len = (end - start) as usize;
        let mut data = vec![0u8; len];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut data)?;
        Ok(data)
    }
}

impl ByteSource for WindowedSource {
    fn length(&self) -> u64 {
        self.length
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.length {
            return Ok(0);
        }
        let needed = (self.length - offset).min(buf.len() as u64);
        let mut window = self.window.lock().unwrap();
        let covers = !window.data.is_empty()
            && offset >= window.start
            && offset + needed <= window.start + window.data.len() as u64;
        if !covers {
            let mut file = self.file.lock().unwrap();
            window.data = self.fill_window(&mut file, offset, needed)?;
            window.start = offset;
        }
        let local = (offset - window.start) as usize;
        let n = needed as usize;
        buf[..n].copy_from_slice(&window.data[local..local + n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reads_and_clamps() {
        let src = SliceSource::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(src.length(), 5);
        let mut buf = [0u8; 3];
        assert_eq!(src.read_at(1, &mut buf).unwrap(), 3);
        assert_eq!(buf, [2, 3, 4]);
        let mut tail = [0u8; 4];
        assert_eq!(src.read_at(3, &mut tail).unwrap(), 2);
        assert_eq!(&tail[..2], &[4, 5]);
        assert_eq!(src.read_at(10, &mut tail).unwrap(), 0);
    }

    #[test]
    fn windowed_source_matches_full_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let payload: Vec<u8> = (0..10_000u32).map(|v| (v % 256) as u8).collect();
        std::io::Write::write_all(&mut tmp, &payload).unwrap();
        let src = WindowedSource::with_window_size(tmp.path(), 1024).unwrap();
        assert_eq!(src.length(), payload.len() as u64);
        let mut buf = vec![0u8; payload.len()];
        // cross several window refills
        for chunk_start in (0..payload.len()).step_by(700) {
            let end = (chunk_start + 700).min(payload.len());
            let n = src.read_at(chunk_start as u64, &mut buf[chunk_start..end]).unwrap();
            assert_eq!(n, end - chunk_start);
        }
        assert_eq!(buf, payload);
    }

    #[test]
    fn windowed_source_fills_full_buffer_across_window_boundary() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let payload: Vec<u8> = (0..2_000u32).map(|v| (v % 256) as u8).collect();
        std::io::Write::write_all(&mut tmp, &payload).unwrap();
        let src = WindowedSource::with_window_size(tmp.path(), 1024).unwrap();

        // Populate a window covering [0, 1024).
        let mut warm = vec![0u8; 10];
        src.read_at(0, &mut warm).unwrap();

        // This request starts inside that window (offset 1000) but its end
        // (1300) falls past the window's edge at 1024.
        let mut buf = vec![0u8; 300];
        let n = src.read_at(1000, &mut buf).unwrap();
        assert_eq!(n, 300);
        assert_eq!(buf, payload[1000..1300]);
    }
}
