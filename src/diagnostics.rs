//! Warning/error taxonomy (spec §4.6).
//!
//! Every recoverable anomaly is emitted through a [`Sink`] as a
//! [`Diagnostic`]; callers may promote any [`Category`] to a hard error via
//! [`ReaderOptions`], in which case emission returns [`CfbError::Promoted`]
//! instead of reaching the sink.

use crate::error::CfbError;
use std::collections::HashSet;
use std::fmt;

/// The category hierarchy from spec §4.6. Variants that are always fatal
/// (never routed through a [`Sink`]) are represented directly as
/// [`CfbError`] variants instead of here; this enum only lists categories
/// that start out as warnings and *may* be promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Header CLSID field was not all-zero.
    NonZeroClsid,
    /// Sector shift did not match the version's expected value.
    SectorSizeWarning,
    /// Mini sector shift was not 6.
    MiniSectorSizeWarning,
    /// Mini-stream cutoff was not the spec default of 4096.
    CutoffWarning,
    /// Directory sector count nonzero in a v3 file, or similar header
    /// field anomalies that do not invalidate the file.
    HeaderFieldWarning,
    /// DIFAT chain truncated, overran, or terminated unexpectedly early.
    DifatWarning,
    /// Name-sort violation, red-black violation, oversize name, non-empty
    /// "empty" slot, or an orphaned directory entry.
    DirectoryWarning,
    /// Declared stream size disagreed with the reachable chain capacity.
    StreamSizeMismatch,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single emitted diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub category: Category,
    pub offset: Option<u64>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(off) => write!(f, "[{}] (offset {off}) {}", self.category, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

/// Receives non-fatal diagnostics produced while opening a container or
/// walking its directory tree.
pub trait Sink {
    fn observe(&self, diagnostic: &Diagnostic);
}

/// Default sink: forwards every diagnostic to the ambient `log` facade at
/// `warn` level. Callers who want structured collection should supply
/// their own [`Sink`] via [`ReaderOptions::with_sink`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Sink for LogSink {
    fn observe(&self, diagnostic: &Diagnostic) {
        log::warn!("{diagnostic}");
    }
}

/// Collects every diagnostic into a `Vec`, useful for tests and for
/// callers who want to inspect warnings after the fact rather than stream
/// them through `log`.
#[derive(Debug, Default)]
pub struct CollectingSink {
    inner: std::sync::Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.inner.lock().unwrap())
    }
}

impl Sink for CollectingSink {
    fn observe(&self, diagnostic: &Diagnostic) {
        self.inner.lock().unwrap().push(diagnostic.clone());
    }
}

/// Per-open configuration: which warning categories are promoted to hard
/// errors, and which sink receives the rest.
pub struct ReaderOptions {
    promoted: HashSet<Category>,
    sink: Box<dyn Sink + Send + Sync>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            promoted: HashSet::new(),
            sink: Box::new(LogSink),
        }
    }
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("promoted", &self.promoted)
            .finish_non_exhaustive()
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Promote `category` so that emitting it returns a [`CfbError`]
    /// instead of reaching the sink.
    pub fn promote(mut self, category: Category) -> Self {
        self.promoted.insert(category);
        self
    }

    pub fn with_sink(mut self, sink: impl Sink + Send + Sync + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn is_promoted(&self, category: Category) -> bool {
        self.promoted.contains(&category)
    }

    /// Emit a diagnostic: routes to the sink, or returns an error if the
    /// category has been promoted.
    pub fn emit(
        &self,
        category: Category,
        offset: Option<u64>,
        message: impl Into<String>,
    ) -> Result<(), CfbError> {
        let message = message.into();
        if self.is_promoted(category) {
            return Err(CfbError::Promoted {
                category,
                offset,
                message,
            });
        }
        self.sink.observe(&Diagnostic {
            category,
            offset,
            message,
        });
        Ok(())
    }
}
