//! Public façade over directory entries (spec §6 "outward interface").
//!
//! [`Entity`] hides the raw [`DirectoryEntry`](crate::directory::DirectoryEntry)
//! representation and the storage/stream distinction behind one handle
//! that knows how to list its children in CFB order, look a child up by
//! name, and open itself as a stream.

use crate::container::Container;
use crate::directory::ObjectType;
use crate::error::CfbResult;
use crate::name::compare_names;
use crate::stream::StreamView;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// The two shapes a directory entry can take (spec §6, `Entity.kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Storage,
    Stream,
}

/// FILETIME epoch (1601-01-01) to Unix epoch (1970-01-01), in 100ns ticks.
const FILETIME_UNIX_EPOCH_DIFF: i64 = 116_444_736_000_000_000;

#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
    container: &'a Container,
    index: u32,
}

impl<'a> Entity<'a> {
    pub(crate) fn new(container: &'a Container, index: u32) -> Self {
        Self { container, index }
    }

    pub fn name(&self) -> &'a str {
        &self.container.entry(self.index).name
    }

    pub fn is_stream(&self) -> bool {
        self.container.entry(self.index).object_type == ObjectType::Stream
    }

    pub fn is_storage(&self) -> bool {
        matches!(
            self.container.entry(self.index).object_type,
            ObjectType::Storage | ObjectType::Root
        )
    }

    /// Alias for [`Entity::is_stream`] (spec §6 outward interface).
    pub fn is_file(&self) -> bool {
        self.is_stream()
    }

    /// Alias for [`Entity::is_storage`] (spec §6 outward interface).
    pub fn is_dir(&self) -> bool {
        self.is_storage()
    }

    pub fn kind(&self) -> Kind {
        if self.is_stream() {
            Kind::Stream
        } else {
            Kind::Storage
        }
    }

    pub fn is_root(&self) -> bool {
        self.container.entry(self.index).object_type == ObjectType::Root
    }

    pub fn clsid(&self) -> [u8; 16] {
        self.container.entry(self.index).clsid
    }

    pub fn state_bits(&self) -> u32 {
        self.container.entry(self.index).state_bits
    }

    /// Stream size in bytes. Always `0` for storages.
    pub fn size(&self) -> u64 {
        self.container.entry(self.index).size
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        filetime_to_datetime(self.container.entry(self.index).creation_time)
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        filetime_to_datetime(self.container.entry(self.index).modified_time)
    }

    /// Direct children, in CFB sort order (shorter names first, then
    /// case-insensitive code-unit order). Empty for streams.
    pub fn children(&self) -> impl Iterator<Item = Entity<'a>> + 'a {
        let container = self.container;
        container
            .children_of(self.index)
            .iter()
            .copied()
            .map(move |id| Entity::new(container, id))
    }

    /// Looks up a direct child by name using the CFB name comparator
    /// (length-first, then case-insensitive).
    pub fn child(&self, name: &str) -> Option<Entity<'a>> {
        let target: Vec<u16> = name.encode_utf16().collect();
        let container = self.container;
        container
            .children_of(self.index)
            .iter()
            .copied()
            .find(|&id| compare_names(&target, &container.entry(id).name_units) == Ordering::Equal)
            .map(|id| Entity::new(container, id))
    }

    /// Opens this entity for reading. Fails with
    /// [`CfbError::OutOfRange`](crate::error::CfbError::OutOfRange) if
    /// called on a storage.
    pub fn open(&self) -> CfbResult<StreamView<'a>> {
        self.container.open_stream(self.index)
    }
}

fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let ticks = filetime as i64 - FILETIME_UNIX_EPOCH_DIFF;
    let secs = ticks.div_euclid(10_000_000);
    let nanos = ticks.rem_euclid(10_000_000) * 100;
    DateTime::<Utc>::from_timestamp(secs, nanos as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_filetime_is_none() {
        assert!(filetime_to_datetime(0).is_none());
    }

    #[test]
    fn filetime_epoch_matches_unix_epoch() {
        let dt = filetime_to_datetime(FILETIME_UNIX_EPOCH_DIFF as u64).unwrap();
        assert_eq!(dt.timestamp(), 0);
    }
}
