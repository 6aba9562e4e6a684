//! Statement identifier cross-referencing engine.
//!
//! Source statements are split into words, rows and regions per page; every
//! unit of the reference sheet gets the pages that mention its identifiers,
//! with highlight or mask overlays, rendered into one document per unit.

pub mod annotator;
pub mod assembler;
pub mod dispatcher;
pub mod layout;
pub mod matcher;
pub mod pdf;
pub mod pdf_processor;
pub mod regions;
pub mod rows;
pub mod selector;
pub mod service;

pub use annotator::PageAnnotator;
pub use assembler::{PageRef, UnitAssembler, UnitPages};
pub use dispatcher::{DispatchOutcome, Dispatcher, ProgressFn, SkippedFile, SourceFile};
pub use matcher::{IdentifierMatcher, UnitPageMatch};
pub use pdf::{LopdfBackend, LopdfDocument, PdfBackend, RenderPage, SourceDocument};
pub use pdf_processor::{PdfProcessor, ProcessedFile};
pub use service::{Reconciliation, ReconciliationService, RunOutcome, RunRequest, RunStats, UnitDocument};
