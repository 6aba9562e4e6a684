//! # Integra Core Domain Models
//!
//! Shared types for the statement reconciliation engine: page geometry,
//! extracted words and rows, overlay annotations, the unit-to-identifier
//! reference map and the options of a reconciliation run.
//!
//! ## Key Models
//!
//! - **Rect / PageSize**: page geometry with a top-left origin
//! - **Word / Row / Region**: extracted text and the lines it forms
//! - **Annotation / OverlayStyle**: write-once overlays stamped on pages
//! - **UnitIdentifierMap**: unit label to identifier set, exact-string membership
//! - **MatchLedger / MatchRecord**: identifiers observed per unit during a run
//! - **RunConfig**: overlay mode, page policy, identifier format, region thresholds

pub mod geometry;
pub mod document;
pub mod unit;
pub mod run;


pub use geometry::*;
pub use document::*;
pub use unit::*;
pub use run::*;
