use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::document::{Color, OverlayStyle};

/// Statement family a run processes. Decides the reference column, the
/// identifier format and the output file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Bank statements keyed by account number.
    Bank,
    /// Statutory insurance statements keyed by ESI number.
    Esic,
    /// Provident-fund statements keyed by UAN.
    Pf,
}

impl DocumentKind {
    pub const UNIT_COLUMN: &'static str = "UNIT";

    pub fn identifier_column(&self) -> &'static str {
        match self {
            Self::Bank => "BANK_ACC_NO",
            Self::Esic => "ESINO",
            Self::Pf => "UAN",
        }
    }

    /// Format every candidate word must fully match.
    pub fn default_pattern(&self) -> &'static str {
        match self {
            Self::Bank => r"\d+",
            Self::Esic => r"\d{10,12}",
            Self::Pf => r"\d{12,15}",
        }
    }

    pub fn pdf_suffix(&self) -> &'static str {
        match self {
            Self::Bank => "_Bank.pdf",
            Self::Esic => "_ESINO.pdf",
            Self::Pf => "_Processed.pdf",
        }
    }

    pub fn matched_stem(&self) -> &'static str {
        match self {
            Self::Pf => "_Match",
            Self::Bank | Self::Esic => "_Matched",
        }
    }

    pub fn unmatched_stem(&self) -> &'static str {
        match self {
            Self::Pf => "_Unmatch",
            Self::Bank | Self::Esic => "_Unmatched",
        }
    }

    /// Suffix of the per-unit archive inside the master archive.
    pub fn folder_suffix(&self) -> &'static str {
        match self {
            Self::Pf => "_Processed.zip",
            Self::Bank | Self::Esic => "_Folder.zip",
        }
    }

    /// Overlay used for occurrences of the unit's own name.
    pub fn unit_name_style(&self) -> OverlayStyle {
        match self {
            Self::Esic => OverlayStyle {
                fill: Color::BLUE,
                stroke: Color::BLUE,
                opacity: 0.3,
                border_width: 1.0,
                read_only: true,
            },
            Self::Bank | Self::Pf => OverlayStyle {
                fill: Color::YELLOW,
                stroke: Color::YELLOW,
                opacity: 0.5,
                border_width: 1.0,
                read_only: true,
            },
        }
    }
}

/// A statement family name that is not one of `bank`, `esic` or `pf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl std::fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown statement kind '{}', expected bank, esic or pf", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl std::str::FromStr for DocumentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bank" => Ok(Self::Bank),
            "esic" | "esi" => Ok(Self::Esic),
            "pf" | "uan" => Ok(Self::Pf),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bank => write!(f, "bank"),
            Self::Esic => write!(f, "esic"),
            Self::Pf => write!(f, "pf"),
        }
    }
}

/// How matched and unmatched content is overlaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMode {
    /// Only matched rows are marked.
    #[default]
    Highlight,
    /// Matched rows are highlighted and every other body row is blacked out.
    Mask,
}

/// Which pages of a source file survive into a unit's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePolicy {
    #[default]
    AllPages,
    /// Relevant pages plus the first and last page of each file.
    RelevantPagesOnly,
}

/// Fractions of the page height delimiting header and footer bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_threshold_order"))]
pub struct RegionThresholds {
    #[validate(range(min = 0.0, max = 1.0))]
    pub header_first_page: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub header_other: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub footer: f64,
}

impl RegionThresholds {
    pub fn header_fraction(&self, page_index: usize) -> f64 {
        if page_index == 0 {
            self.header_first_page
        } else {
            self.header_other
        }
    }
}

impl Default for RegionThresholds {
    fn default() -> Self {
        Self {
            header_first_page: 0.30,
            header_other: 0.12,
            footer: 0.95,
        }
    }
}

fn validate_threshold_order(thresholds: &RegionThresholds) -> Result<(), ValidationError> {
    if thresholds.header_first_page > thresholds.footer || thresholds.header_other > thresholds.footer {
        return Err(ValidationError::new("header_below_footer"));
    }
    Ok(())
}

/// Area covered by the overlay of a matched identifier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HighlightScope {
    /// The whole row the word belongs to.
    #[default]
    Row,
    /// Only the word itself.
    Word,
    /// The word grown by fixed offsets, for layouts where a row spans several
    /// text lines.
    Padded {
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
    },
}

/// Options of a single reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RunConfig {
    pub kind: DocumentKind,
    #[serde(default)]
    pub overlay_mode: OverlayMode,
    #[serde(default)]
    pub page_policy: PagePolicy,
    /// Overrides the kind's default identifier format.
    #[serde(default)]
    #[validate(custom = "validate_pattern")]
    pub identifier_pattern: Option<String>,
    #[serde(default)]
    #[validate]
    pub region_thresholds: RegionThresholds,
    #[serde(default = "default_row_tolerance")]
    #[validate(range(min = 0.0, max = 200.0))]
    pub row_tolerance: f64,
    #[serde(default)]
    pub highlight_scope: HighlightScope,
    #[serde(default = "default_true")]
    pub mark_unit_names: bool,
    /// Stem of the master archive name, e.g. `oct-2026`.
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub label: Option<String>,
}

fn default_row_tolerance() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

fn validate_pattern(pattern: &str) -> Result<(), ValidationError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_regex"))
}

impl RunConfig {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            overlay_mode: OverlayMode::default(),
            page_policy: PagePolicy::default(),
            identifier_pattern: None,
            region_thresholds: RegionThresholds::default(),
            row_tolerance: default_row_tolerance(),
            highlight_scope: HighlightScope::default(),
            mark_unit_names: true,
            label: None,
        }
    }

    pub fn with_overlay_mode(mut self, mode: OverlayMode) -> Self {
        self.overlay_mode = mode;
        self
    }

    pub fn with_page_policy(mut self, policy: PagePolicy) -> Self {
        self.page_policy = policy;
        self
    }

    pub fn pattern(&self) -> &str {
        self.identifier_pattern
            .as_deref()
            .unwrap_or_else(|| self.kind.default_pattern())
    }
}

/// What to do when a source file cannot be decoded or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failing file.
    AbortRun,
    /// Report the file and continue with the rest of the batch.
    #[default]
    SkipFile,
}

/// Order in which per-file results are concatenated within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrder {
    /// Files appear in the order their tasks finished.
    #[default]
    Completion,
    /// Files appear in the order they were submitted; byte-stable across runs.
    Submission,
}

/// Progress signal emitted after each file task completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub files_completed: usize,
    pub files_total: usize,
    pub elapsed: Duration,
    pub estimated_remaining: Duration,
}

impl Progress {
    /// Extrapolate the remaining time from the mean time per completed file.
    pub fn estimate(files_completed: usize, files_total: usize, elapsed: Duration) -> Self {
        let estimated_remaining = if files_completed == 0 {
            Duration::ZERO
        } else {
            let per_file = elapsed.as_secs_f64() / files_completed as f64;
            let total = per_file * files_total as f64;
            Duration::from_secs_f64((total - elapsed.as_secs_f64()).max(0.0))
        };

        Self {
            files_completed,
            files_total,
            elapsed,
            estimated_remaining,
        }
    }
}
