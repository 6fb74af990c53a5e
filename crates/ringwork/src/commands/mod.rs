pub mod correlate;
pub mod crossdate;
pub mod releases;
pub mod run;
pub mod stats;

use anyhow::{Context, Result};
use ringwork_core::ingestion::{load_inputs, LoadedInputs};

use crate::Session;

pub(crate) fn inputs(session: &Session) -> Result<LoadedInputs> {
    load_inputs(&session.config.inputs, &session.base_dir).context("failed to load inputs")
}
