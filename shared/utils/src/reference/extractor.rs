//! Reference Extractor
//!
//! Builds the unit-to-identifier map from a parsed sheet and splits the
//! original rows into matched / unmatched extracts once a run is done.

use integra_models::{DocumentKind, MatchRecord, UnitIdentifierMap};
use rust_xlsxwriter::Workbook;

use super::parser::ParsedSheet;
use crate::error::{StatementError, StatementResult};
use crate::validation::validate_required_columns;

/// One usable reference row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRow {
    pub row_number: usize,
    pub unit: String,
    pub identifier: String,
    /// All original cells, for writing extracts.
    pub cells: Vec<String>,
}

/// Rows of the reference sheet that carry both a unit and an identifier.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    pub kind: DocumentKind,
    pub headers: Vec<String>,
    pub rows: Vec<ReferenceRow>,
    pub warnings: Vec<String>,
}

impl ReferenceTable {
    pub fn unit_map(&self) -> UnitIdentifierMap {
        self.rows
            .iter()
            .map(|row| (row.unit.clone(), row.identifier.clone()))
            .collect()
    }

    /// Rows of `unit`, partitioned by whether their identifier was observed.
    pub fn split_for_unit<'a>(
        &'a self,
        unit: &str,
        matches: &MatchRecord,
    ) -> (Vec<&'a ReferenceRow>, Vec<&'a ReferenceRow>) {
        self.rows
            .iter()
            .filter(|row| row.unit == unit)
            .partition(|row| matches.contains(&row.identifier))
    }

    /// Serialize a subset of rows as a single-sheet workbook, header row first.
    ///
    /// Every cell is written as text so identifiers keep their leading zeros;
    /// empty cells stay blank.
    pub fn write_xlsx(&self, rows: &[&ReferenceRow]) -> StatementResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for (col, header) in self.headers.iter().enumerate() {
            sheet.write_string(0, column(col)?, header)?;
        }
        for (idx, row) in rows.iter().enumerate() {
            let line = u32::try_from(idx + 1)
                .map_err(|_| StatementError::packaging("Extract has too many rows"))?;
            for (col, cell) in row.cells.iter().enumerate() {
                if !cell.is_empty() {
                    sheet.write_string(line, column(col)?, cell)?;
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

fn column(idx: usize) -> StatementResult<u16> {
    u16::try_from(idx).map_err(|_| StatementError::packaging("Extract has too many columns"))
}

/// Turns a parsed sheet into a [`ReferenceTable`] for one document kind.
pub struct ReferenceExtractor {
    kind: DocumentKind,
}

impl ReferenceExtractor {
    pub fn new(kind: DocumentKind) -> Self {
        Self { kind }
    }

    pub fn extract(&self, sheet: &ParsedSheet) -> StatementResult<ReferenceTable> {
        let unit_column = DocumentKind::UNIT_COLUMN;
        let id_column = self.kind.identifier_column();
        validate_required_columns(&sheet.headers, &[unit_column, id_column])?;

        let unit_idx = sheet
            .column_index(unit_column)
            .ok_or_else(|| StatementError::configuration(format!("Missing column {}", unit_column)))?;
        let id_idx = sheet
            .column_index(id_column)
            .ok_or_else(|| StatementError::configuration(format!("Missing column {}", id_column)))?;

        let mut rows = Vec::new();
        let mut warnings = sheet.parse_warnings.clone();

        for row in &sheet.rows {
            let unit = row.get(unit_idx).unwrap_or_default().trim();
            let identifier = row.get(id_idx).unwrap_or_default().trim();

            if unit.is_empty() || identifier.is_empty() {
                warnings.push(format!(
                    "Row {}: missing {} or {}, skipped",
                    row.row_number, unit_column, id_column
                ));
                continue;
            }

            rows.push(ReferenceRow {
                row_number: row.row_number,
                unit: unit.to_string(),
                identifier: identifier.to_string(),
                cells: row.cells.clone(),
            });
        }

        if rows.is_empty() {
            return Err(StatementError::configuration(format!(
                "Reference sheet '{}' has no rows with both {} and {} (mismatch file)",
                sheet.filename, unit_column, id_column
            )));
        }

        tracing::debug!(
            sheet = %sheet.filename,
            kind = %self.kind,
            rows = rows.len(),
            skipped = warnings.len(),
            "Reference sheet extracted"
        );

        Ok(ReferenceTable {
            kind: self.kind,
            headers: sheet.headers.clone(),
            rows,
            warnings,
        })
    }
}
