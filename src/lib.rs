//! Read-only parser for the Microsoft Compound File Binary format (OLE2 /
//! structured storage), the container format behind legacy `.doc`,
//! `.xls`, `.msi` and similar files.
//!
//! Open a container from any [`ByteSource`](source::ByteSource) with
//! [`Container::open`](container::Container::open), then walk it from
//! [`Container::root`](container::Container::root):
//!
//! ```no_run
//! use cfb_reader::{Container, ReaderOptions};
//! use cfb_reader::source::MmapSource;
//!
//! # fn main() -> cfb_reader::error::CfbResult<()> {
//! let source = MmapSource::open("sample.doc")?;
//! let container = Container::open(source, ReaderOptions::new())?;
//! for child in container.root().children() {
//!     println!("{} ({} bytes)", child.name(), child.size());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Malformed-but-recoverable files (an unusual sector shift, an
//! unreachable directory entry, a stream whose declared size outruns its
//! chain) are reported through a [`diagnostics::Sink`] rather than
//! failing the open outright; callers who want strict validation can
//! promote any [`diagnostics::Category`] to a hard error via
//! [`ReaderOptions::promote`].

pub mod chain;
pub mod container;
pub mod diagnostics;
pub mod difat;
pub mod directory;
pub mod entity;
pub mod error;
pub mod fat;
pub mod header;
pub mod mini_fat;
pub mod name;
pub mod sector;
pub mod source;
pub mod stream;

#[cfg(test)]
pub(crate) mod testutil;

pub use container::Container;
pub use diagnostics::{Category, Diagnostic, ReaderOptions, Sink};
pub use entity::{Entity, Kind};
pub use error::{CfbError, CfbResult};
pub use stream::StreamView;
