//! Reconciliation Service
//!
//! Orchestrates a run: reference sheet, parallel page processing, per-unit
//! rendering, extracts and archives.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use integra_models::{MatchRecord, RunConfig, UnitIdentifierMap};
use integra_utils::{
    default_label, package_run, package_unit, validate_model, Archive, ProcessingConfig, ReferenceExtractor,
    ReferenceTable, SheetParser, StatementError, StatementResult, UnitBundle,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::assembler::UnitPages;
use crate::dispatcher::{Dispatcher, ProgressFn, SkippedFile, SourceFile};
use crate::pdf::{PdfBackend, RenderPage};
use crate::pdf_processor::PdfProcessor;

/// Statistics reported with every run, including runs without matches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub files_total: usize,
    pub files_processed: usize,
    pub skipped: Vec<SkippedFile>,
    pub highlight_count: usize,
    pub mask_count: usize,
    pub unit_name_count: usize,
    pub units_emitted: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub warnings: Vec<String>,
}

fn as_millis<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

/// Rendered output of one unit.
#[derive(Debug, Clone)]
pub struct UnitDocument {
    pub unit: String,
    pub pdf: Vec<u8>,
    pub page_count: usize,
    pub matches: MatchRecord,
}

/// Engine output before packaging.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Units with at least one retained page and one match, in reference order.
    pub documents: Vec<UnitDocument>,
    pub matches: BTreeMap<String, BTreeSet<String>>,
    pub unmatched: BTreeMap<String, BTreeSet<String>>,
    pub stats: RunStats,
}

/// A full run request: reference sheet plus statements.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub reference_name: String,
    pub reference: Vec<u8>,
    pub documents: Vec<SourceFile>,
    pub config: RunConfig,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed { archive: Archive, stats: RunStats },
    /// No unit had both a retained page and a match. Not an error.
    NoMatches { stats: RunStats },
}

pub struct ReconciliationService<B: PdfBackend> {
    backend: Arc<B>,
    processing: ProcessingConfig,
}

impl<B: PdfBackend> Clone for ReconciliationService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            processing: self.processing.clone(),
        }
    }
}

impl<B: PdfBackend> ReconciliationService<B> {
    pub fn new(backend: B, processing: ProcessingConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            processing,
        }
    }

    pub fn processing(&self) -> &ProcessingConfig {
        &self.processing
    }

    /// Parse and validate the reference sheet for `config.kind`.
    pub fn load_reference(&self, name: &str, data: &[u8], config: &RunConfig) -> StatementResult<ReferenceTable> {
        let sheet = SheetParser::new()
            .parse_bytes(name, data, None)
            .map_err(|e| StatementError::configuration(format!("Unreadable reference sheet '{}': {:#}", name, e)))?;

        let table = ReferenceExtractor::new(config.kind).extract(&sheet)?;
        for warning in &table.warnings {
            warn!(sheet = name, "{}", warning);
        }
        Ok(table)
    }

    /// Run the engine over `documents` and render every emitted unit.
    pub async fn reconcile(
        &self,
        units: UnitIdentifierMap,
        documents: Vec<SourceFile>,
        config: RunConfig,
        on_progress: Option<ProgressFn<'_>>,
    ) -> StatementResult<Reconciliation> {
        let started = Instant::now();
        validate_model(&config)?;
        if units.is_empty() {
            return Err(StatementError::configuration("Reference map contains no units"));
        }
        if documents.is_empty() {
            return Err(StatementError::validation("documents", "At least one statement is required"));
        }

        let files_total = documents.len();
        let processor = Arc::new(PdfProcessor::new(config, Arc::new(units))?);

        info!(
            files = files_total,
            units = processor.units().len(),
            identifiers = processor.units().identifier_count(),
            kind = %processor.config().kind,
            "Starting reconciliation"
        );

        let outcome = Dispatcher::new(&self.processing)
            .run(Arc::clone(&self.backend), Arc::clone(&processor), documents, on_progress)
            .await?;

        let (emitted, ledger) = outcome.assembler.finish(self.processing.merge_order);
        let unmatched = ledger.unmatched(processor.units());
        let matches = ledger.into_sets();

        let backend = Arc::clone(&self.backend);
        let arena = outcome.arena;
        let documents = tokio::task::spawn_blocking(move || render_units(backend.as_ref(), &arena, emitted))
            .await
            .map_err(|e| StatementError::internal(format!("Render task failed: {}", e)))??;

        let stats = RunStats {
            files_total,
            files_processed: outcome.files_processed,
            skipped: outcome.skipped,
            highlight_count: outcome.highlight_count,
            mask_count: outcome.mask_count,
            unit_name_count: outcome.unit_name_count,
            units_emitted: documents.len(),
            elapsed: started.elapsed(),
            warnings: outcome.warnings,
        };

        info!(
            units_emitted = stats.units_emitted,
            highlights = stats.highlight_count,
            masks = stats.mask_count,
            skipped = stats.skipped.len(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Reconciliation finished"
        );

        Ok(Reconciliation {
            documents,
            matches,
            unmatched,
            stats,
        })
    }

    /// Full run: reference sheet in, master archive out.
    pub async fn run(&self, request: RunRequest, on_progress: Option<ProgressFn<'_>>) -> StatementResult<RunOutcome> {
        let started = Instant::now();
        validate_model(&request.config)?;

        // the sheet is checked before any statement is opened
        let table = self.load_reference(&request.reference_name, &request.reference, &request.config)?;
        let kind = request.config.kind;
        let label = request
            .config
            .label
            .clone()
            .unwrap_or_else(|| default_label(chrono::Local::now()));

        let mut result = self
            .reconcile(table.unit_map(), request.documents, request.config, on_progress)
            .await?;
        let mut warnings = table.warnings.clone();
        warnings.append(&mut result.stats.warnings);
        result.stats.warnings = warnings;

        if result.documents.is_empty() {
            result.stats.elapsed = started.elapsed();
            info!("No unit had matching statements");
            return Ok(RunOutcome::NoMatches { stats: result.stats });
        }

        let mut archives = Vec::with_capacity(result.documents.len());
        for document in result.documents {
            let (matched, unmatched) = table.split_for_unit(&document.unit, &document.matches);
            let bundle = UnitBundle {
                matched_xlsx: table.write_xlsx(&matched)?,
                unmatched_xlsx: table.write_xlsx(&unmatched)?,
                unit: document.unit,
                pdf: document.pdf,
            };
            archives.push(package_unit(kind, &bundle)?);
        }

        let archive = package_run(&label, &archives)?;
        result.stats.elapsed = started.elapsed();
        info!(archive = %archive.file_name, size = archive.bytes.len(), "Run packaged");

        Ok(RunOutcome::Completed {
            archive,
            stats: result.stats,
        })
    }
}

fn render_units<B: PdfBackend>(
    backend: &B,
    arena: &[Option<Arc<B::Document>>],
    units: Vec<UnitPages>,
) -> StatementResult<Vec<UnitDocument>> {
    units
        .into_iter()
        .map(|unit| {
            let pages = unit
                .pages
                .iter()
                .map(|page| {
                    let document = arena
                        .get(page.file_index)
                        .and_then(|slot| slot.as_deref())
                        .ok_or_else(|| {
                            StatementError::internal(format!("No decoded document for file {}", page.file_index))
                        })?;
                    Ok(RenderPage {
                        file_index: page.file_index,
                        document,
                        page_index: page.page_index,
                        annotations: &page.annotations,
                    })
                })
                .collect::<StatementResult<Vec<_>>>()?;

            let pdf = backend.render(&unit.unit, &pages)?;
            tracing::debug!(unit = %unit.unit, pages = pages.len(), size = pdf.len(), "Unit rendered");

            Ok(UnitDocument {
                page_count: pages.len(),
                unit: unit.unit,
                pdf,
                matches: unit.matches,
            })
        })
        .collect()
}
