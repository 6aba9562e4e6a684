//! Reference Sheet Processing Module
//!
//! Reads the spreadsheet mapping units to their identifiers and writes the
//! per-unit matched / unmatched extracts.
//! Supports CSV and Excel (XLSX/XLS) input.

pub mod parser;
pub mod extractor;

pub use parser::{SheetParser, SheetFormat, ParsedSheet, SheetRow};
pub use extractor::{ReferenceExtractor, ReferenceTable, ReferenceRow};
