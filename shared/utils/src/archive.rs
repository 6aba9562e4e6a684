//! Zip packaging of per-unit outputs.

use std::io::{Cursor, Write};

use integra_models::DocumentKind;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::StatementResult;

/// Everything emitted for one unit.
#[derive(Debug, Clone)]
pub struct UnitBundle {
    pub unit: String,
    pub pdf: Vec<u8>,
    pub matched_xlsx: Vec<u8>,
    pub unmatched_xlsx: Vec<u8>,
}

/// A finished archive and the name it should be served under.
#[derive(Debug, Clone)]
pub struct Archive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

fn options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn write_entries<'a>(entries: impl IntoIterator<Item = (String, &'a [u8])>) -> StatementResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(name, options())?;
        writer.write_all(data)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Unit label made safe for an entry name: path separators and control
/// characters become `_`, and a label of only dots becomes `_`.
pub fn entry_stem(unit: &str) -> String {
    let stem: String = unit
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();

    if stem.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        stem
    }
}

/// Zip holding `<unit><pdf suffix>` and the two workbook extracts.
pub fn package_unit(kind: DocumentKind, bundle: &UnitBundle) -> StatementResult<Archive> {
    let stem = entry_stem(&bundle.unit);
    let bytes = write_entries([
        (format!("{}{}", stem, kind.pdf_suffix()), bundle.pdf.as_slice()),
        (format!("{}{}.xlsx", stem, kind.matched_stem()), bundle.matched_xlsx.as_slice()),
        (format!("{}{}.xlsx", stem, kind.unmatched_stem()), bundle.unmatched_xlsx.as_slice()),
    ])?;

    Ok(Archive {
        file_name: format!("{}{}", stem, kind.folder_suffix()),
        bytes,
    })
}

/// Master `<label>.zip` nesting one archive per unit, in the given order.
pub fn package_run(label: &str, units: &[Archive]) -> StatementResult<Archive> {
    let bytes = write_entries(
        units
            .iter()
            .map(|archive| (archive.file_name.clone(), archive.bytes.as_slice())),
    )?;

    tracing::debug!(label, units = units.len(), size = bytes.len(), "Master archive written");

    Ok(Archive {
        file_name: format!("{}.zip", label),
        bytes,
    })
}

/// Default archive stem for the current month, e.g. `oct-2026`.
pub fn default_label(now: chrono::DateTime<chrono::Local>) -> String {
    now.format("%b-%Y").to_string().to_lowercase()
}
