//! Stream views (spec §4.5).
//!
//! A [`StreamView`] is a cursor over one directory entry's data, backed
//! either by the regular FAT (reading sectors straight from the
//! [`ByteSource`](crate::source::ByteSource)) or by the mini-FAT (reading
//! mini-sectors out of the pre-materialized mini-stream buffer). Each
//! handle owns its resolved sector chain and its own position. Opening
//! the same entry twice yields two independent cursors.

use crate::error::{CfbError, CfbResult};
use std::io::{self, SeekFrom};

/// A read-only cursor over one stream's bytes.
pub struct StreamView<'a> {
    sector_size: usize,
    chain: Vec<u32>,
    size: u64,
    position: u64,
    closed: bool,
    read_sector: Box<dyn Fn(u32, &mut [u8]) -> io::Result<()> + 'a>,
}

impl<'a> StreamView<'a> {
    pub(crate) fn new(
        sector_size: usize,
        chain: Vec<u32>,
        size: u64,
        read_sector: impl Fn(u32, &mut [u8]) -> io::Result<()> + 'a,
    ) -> Self {
        Self {
            sector_size,
            chain,
            size,
            position: 0,
            closed: false,
            read_sector: Box::new(read_sector),
        }
    }

    /// Total size of the stream, in bytes (already clamped to the
    /// reachable chain capacity by the container).
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Moves the cursor per `pos`, returning the new absolute position
    /// (spec §4.5 `seek(offset, whence)`). A result that would fall before
    /// the start of the stream is rejected; a result past the end is
    /// clamped to `len()`; a subsequent `read` then returns zero bytes.
    pub fn seek(&mut self, pos: SeekFrom) -> CfbResult<u64> {
        if self.closed {
            return Err(CfbError::StreamClosed);
        }
        let base = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(delta) => self.size as i128 + delta as i128,
            SeekFrom::Current(delta) => self.position as i128 + delta as i128,
        };
        if base < 0 {
            return Err(CfbError::OutOfRange {
                message: format!("seek to {base} is before the start of the stream"),
            });
        }
        self.position = (base as u64).min(self.size);
        Ok(self.position)
    }

    /// Releases the handle. Further calls return [`CfbError::StreamClosed`].
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Reads up to `buf.len()` bytes starting at the current position,
    /// advancing it by the number of bytes read. Returns `0` at end of
    /// stream.
    pub fn read(&mut self, buf: &mut [u8]) -> CfbResult<usize> {
        if self.closed {
            return Err(CfbError::StreamClosed);
        }
        if self.position >= self.size {
            return Ok(0);
        }

        let remaining = self.size - self.position;
        let to_read = (buf.len() as u64).min(remaining) as usize;
        let mut sector_buf = vec![0u8; self.sector_size];
        let mut written = 0usize;

        while written < to_read {
            let sector_slot = (self.position / self.sector_size as u64) as usize;
            let offset_in_sector = (self.position % self.sector_size as u64) as usize;
            let Some(&sector) = self.chain.get(sector_slot) else {
                break;
            };
            (self.read_sector)(sector, &mut sector_buf)?;
            let available = self.sector_size - offset_in_sector;
            let n = available.min(to_read - written);
            buf[written..written + n].copy_from_slice(&sector_buf[offset_in_sector..offset_in_sector + n]);
            written += n;
            self.position += n as u64;
        }

        Ok(written)
    }
}

/// Lets a [`StreamView`] be handed to anything generic over `std::io::Read`
/// (a zip/xml/property-set parser, `io::copy`, ...).
impl<'a> io::Read for StreamView<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        StreamView::read(self, buf).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl<'a> io::Seek for StreamView<'a> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        StreamView::seek(self, pos).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
