use std::path::PathBuf;

use anyhow::{Context, Result};
use ringwork_core::outputs::write_outputs;
use ringwork_core::pipeline::run_pipeline;
use tracing::info;

use crate::{render, Session};

pub fn handle(session: &Session, output: Option<PathBuf>) -> Result<()> {
    let inputs = super::inputs(session)?;
    let config = &session.config;
    let output_dir = output.unwrap_or_else(|| session.base_dir.join(&config.output.dir));

    let result = run_pipeline(&inputs, config).context("analysis failed")?;
    let written = write_outputs(&result, &inputs, config, &output_dir)
        .with_context(|| format!("failed to write outputs to {}", output_dir.display()))?;
    info!(files = written.len(), dir = %output_dir.display(), "run complete");

    println!(
        "{}",
        render::correlations(
            &result.correlations,
            &result.removed,
            config.correlation.threshold
        )
    );
    println!("{}", render::chronology_stats(&result.stats));
    if !result.climate.is_empty() {
        println!("{}", render::climate(&result.climate));
        println!("{}", render::extremes(&result.extremes));
    }
    println!("{}", render::release_counts(&result.releases));
    println!(
        "Wrote {} files to {}",
        written.len(),
        output_dir.display()
    );
    Ok(())
}
