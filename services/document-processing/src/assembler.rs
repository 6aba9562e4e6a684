//! Per-Unit Assembler
//!
//! Single-writer accumulator fed by the coordinator with finished files.
//! Pages are kept as `(file_index, page_index)` references plus overlays; the
//! source documents themselves live in the dispatcher's arena.

use std::collections::HashMap;

use integra_models::{Annotation, MatchLedger, MatchRecord, MergeOrder, UnitIdentifierMap};

use crate::pdf_processor::ProcessedFile;

/// A retained page of a unit's output document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRef {
    pub file_index: usize,
    pub page_index: usize,
    pub annotations: Vec<Annotation>,
}

/// Everything needed to render one unit's document.
#[derive(Debug, Clone)]
pub struct UnitPages {
    pub unit: String,
    pub pages: Vec<PageRef>,
    pub matches: MatchRecord,
}

#[derive(Debug)]
pub struct UnitAssembler {
    units: UnitIdentifierMap,
    pages: HashMap<String, Vec<PageRef>>,
    ledger: MatchLedger,
}

impl UnitAssembler {
    pub fn new(units: &UnitIdentifierMap) -> Self {
        Self {
            units: units.clone(),
            pages: HashMap::new(),
            ledger: MatchLedger::for_units(units),
        }
    }

    /// Append a finished file. Pages of the file keep their relative order.
    pub fn absorb(&mut self, file: ProcessedFile) {
        let file_index = file.file_index;

        for (unit, result) in file.units {
            self.ledger
                .absorb(&self.units, &unit, result.matches.iter().map(String::as_str));

            if result.pages.is_empty() {
                continue;
            }
            self.pages
                .entry(unit)
                .or_default()
                .extend(result.pages.into_iter().map(|page| PageRef {
                    file_index,
                    page_index: page.page_index,
                    annotations: page.annotations,
                }));
        }
    }

    pub fn ledger(&self) -> &MatchLedger {
        &self.ledger
    }

    /// Units with at least one page and one match, in reference sheet order.
    ///
    /// Under [`MergeOrder::Submission`] pages are reordered by file index; the
    /// sort is stable so page order within a file is untouched.
    pub fn finish(mut self, order: MergeOrder) -> (Vec<UnitPages>, MatchLedger) {
        let mut emitted = Vec::new();

        for unit in self.units.units() {
            let Some(mut pages) = self.pages.remove(unit) else {
                tracing::debug!(unit, "Unit dropped: no retained pages");
                continue;
            };
            let matches = match self.ledger.record(unit) {
                Some(record) if !record.is_empty() => record.clone(),
                _ => {
                    tracing::debug!(unit, pages = pages.len(), "Unit dropped: no matches");
                    continue;
                }
            };

            if order == MergeOrder::Submission {
                pages.sort_by_key(|page| page.file_index);
            }

            emitted.push(UnitPages {
                unit: unit.to_string(),
                pages,
                matches,
            });
        }

        (emitted, self.ledger)
    }
}
