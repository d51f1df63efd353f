//! Error taxonomy for batch runs.
//!
//! Schema problems on required inputs are fatal; optional side outputs and
//! auto-discovered references degrade with a logged warning instead (the
//! degradation decisions live in the pipeline, not here).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The batch input is missing a required column. Fatal before any
    /// output is written.
    #[error("input file is missing required column '{0}'")]
    InputSchema(String),

    /// A golden/reviewed reference file lacks required columns.
    #[error("reference file must include columns {0}")]
    ReferenceSchema(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
