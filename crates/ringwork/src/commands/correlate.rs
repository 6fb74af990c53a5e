use anyhow::Result;
use ringwork_core::correlation::correlate_and_filter;

use crate::{render, Session};

pub fn handle(session: &Session) -> Result<()> {
    let inputs = super::inputs(session)?;
    let config = &session.config.correlation;
    let (correlations, outcome) = correlate_and_filter(&inputs.ring_widths, config)?;

    println!(
        "Series correlation ({}, prewhitened: {})",
        config.method.as_str(),
        config.prewhiten
    );
    println!(
        "{}",
        render::correlations(&correlations, &outcome.removed, config.threshold)
    );
    println!(
        "{} of {} series kept",
        outcome.table.series_count(),
        inputs.ring_widths.series_count()
    );
    Ok(())
}
