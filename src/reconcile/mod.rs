//! Package reconciliation
//!
//! Makes a channel's publications of one named package match a
//! present/absent intent.

mod engine;
mod state;

pub use engine::{
    Intent, ReconcileFailure, ReconcileRequest, ReconciliationEngine, ReconciliationResult,
    UploadDirective,
};
pub use state::{ReconcileState, StateTrail};
