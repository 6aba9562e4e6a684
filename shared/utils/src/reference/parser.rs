//! Reference Sheet Parser
//!
//! Multi-format parser turning CSV and Excel workbooks into rows of
//! normalized text cells.

use anyhow::{Context, Result};
use std::path::Path;

/// Supported reference sheet formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
    Xls,
}

impl SheetFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }
}

/// One data row of the sheet; cells are aligned with the header row.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based row number in the source, counting the header row.
    pub row_number: usize,
    pub cells: Vec<String>,
}

impl SheetRow {
    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

/// Complete parsed sheet with metadata
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub filename: String,
    pub format: SheetFormat,
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
    pub parse_warnings: Vec<String>,
}

impl ParsedSheet {
    /// Position of a column, matched case-insensitively on the trimmed header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    }
}

/// Main reference sheet parser
#[derive(Debug, Default)]
pub struct SheetParser;

impl SheetParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse sheet from bytes
    pub fn parse_bytes(&self, filename: &str, data: &[u8], format: Option<SheetFormat>) -> Result<ParsedSheet> {
        let format = format
            .or_else(|| SheetFormat::from_extension(Path::new(filename)))
            .context("Could not determine reference sheet format")?;

        match format {
            SheetFormat::Csv => self.parse_csv(filename, data),
            SheetFormat::Xlsx | SheetFormat::Xls => self.parse_excel(filename, data, format),
        }
    }

    /// Parse CSV format
    fn parse_csv(&self, filename: &str, data: &[u8]) -> Result<ParsedSheet> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        let mut warnings = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            match result {
                Ok(record) => {
                    let cells = (0..headers.len())
                        .map(|i| record.get(i).map(normalize_text_cell).unwrap_or_default())
                        .collect();
                    rows.push(SheetRow { row_number: idx + 2, cells });
                }
                Err(e) => {
                    warnings.push(format!("Row {}: Parse error - {}", idx + 2, e));
                }
            }
        }

        Ok(ParsedSheet {
            filename: filename.to_string(),
            format: SheetFormat::Csv,
            headers,
            rows,
            parse_warnings: warnings,
        })
    }

    /// Parse Excel format
    fn parse_excel(&self, filename: &str, data: &[u8], format: SheetFormat) -> Result<ParsedSheet> {
        use calamine::{open_workbook_from_rs, DataType, Range, Reader, Xls, Xlsx};

        let cursor = std::io::Cursor::new(data);

        let range: Range<DataType> = if format == SheetFormat::Xls {
            let mut workbook: Xls<_> = open_workbook_from_rs(cursor)
                .context("Failed to open Excel workbook")?;
            let sheet_name = workbook
                .sheet_names()
                .first()
                .cloned()
                .context("No sheets found in workbook")?;
            workbook
                .worksheet_range(&sheet_name)
                .context("Failed to read worksheet")??
        } else {
            let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
                .context("Failed to open Excel workbook")?;
            let sheet_name = workbook
                .sheet_names()
                .first()
                .cloned()
                .context("No sheets found in workbook")?;
            workbook
                .worksheet_range(&sheet_name)
                .context("Failed to read worksheet")??
        };

        let mut rows_iter = range.rows();

        // First row is headers
        let headers: Vec<String> = rows_iter
            .next()
            .context("Empty worksheet")?
            .iter()
            .map(|cell: &DataType| cell.to_string().trim().to_string())
            .collect();

        let mut rows = Vec::new();
        let mut warnings = Vec::new();

        for (idx, row) in rows_iter.enumerate() {
            let cells: Vec<String> = (0..headers.len())
                .map(|i| row.get(i).map(normalize_excel_cell).unwrap_or_default())
                .collect();

            if cells.iter().all(String::is_empty) {
                warnings.push(format!("Row {}: empty row skipped", idx + 2));
                continue;
            }

            rows.push(SheetRow { row_number: idx + 2, cells });
        }

        Ok(ParsedSheet {
            filename: filename.to_string(),
            format,
            headers,
            rows,
            parse_warnings: warnings,
        })
    }
}

/// Render an Excel cell as text without floating-point artifacts.
fn normalize_excel_cell(cell: &calamine::DataType) -> String {
    use calamine::DataType;

    match cell {
        DataType::Empty => String::new(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) => format_number(*f),
        DataType::String(s) => normalize_text_cell(s),
        DataType::Error(_) => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Trim and drop a trailing `.0…` from digit strings such as `"1234567890.0"`.
/// Leading zeros are significant and kept.
pub fn normalize_text_cell(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some((whole, fraction)) = trimmed.split_once('.') {
        if !whole.is_empty()
            && whole.bytes().all(|b| b.is_ascii_digit())
            && !fraction.is_empty()
            && fraction.bytes().all(|b| b == b'0')
        {
            return whole.to_string();
        }
    }

    trimmed.to_string()
}
