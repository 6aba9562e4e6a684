//! PDF capability seam.
//!
//! The engine only needs two things from a PDF library: the words of every
//! page with their boxes, and a way to write selected pages back out with
//! rectangle overlays stamped on them. [`PdfBackend`] captures exactly that,
//! and [`LopdfBackend`] is the implementation shipped with the service.

mod lopdf_backend;
mod objects;
mod render;
mod text;

use integra_models::{Annotation, PageText};
use integra_utils::StatementResult;

pub use lopdf_backend::{LopdfBackend, LopdfDocument};

/// A decoded source document. Opened once per file and shared read-only.
pub trait SourceDocument: Send + Sync + 'static {
    fn page_count(&self) -> usize;

    /// Words and size of page `page_index` (0-based).
    fn page_text(&self, page_index: usize) -> StatementResult<PageText>;
}

/// One page of an output document: which source page, and what to stamp on it.
#[derive(Debug)]
pub struct RenderPage<'a, D> {
    /// Submission index of the source file; pages sharing it share `document`.
    pub file_index: usize,
    pub document: &'a D,
    pub page_index: usize,
    pub annotations: &'a [Annotation],
}

/// Decodes source files and renders annotated page subsets.
pub trait PdfBackend: Send + Sync + 'static {
    type Document: SourceDocument;

    /// Decode `bytes`; `name` is only used in error messages.
    fn open(&self, name: &str, bytes: &[u8]) -> StatementResult<Self::Document>;

    /// Write a new document made of `pages`, in order, with their overlays.
    fn render(&self, unit: &str, pages: &[RenderPage<'_, Self::Document>]) -> StatementResult<Vec<u8>>;
}
