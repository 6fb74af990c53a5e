use anyhow::Result;
use ringwork_core::correlation::correlate_and_filter;
use ringwork_core::crossdate::crossdate_segments;

use crate::{render, Session};

pub fn handle(session: &Session) -> Result<()> {
    let inputs = super::inputs(session)?;
    let config = &session.config;
    let (_, outcome) = correlate_and_filter(&inputs.ring_widths, &config.correlation)?;
    let report = crossdate_segments(&outcome.table, &config.crossdate)?;

    println!(
        "Segment correlations ({} years, lag {}, p < {})",
        report.seg_length,
        report.seg_length / 2,
        config.crossdate.pcrit
    );
    println!("{}", render::crossdate(&report));

    let flagged: usize = report.series.iter().map(|s| s.flagged().count()).sum();
    if flagged == 0 {
        println!("No flagged segments.");
    } else {
        println!("{flagged} flagged segment(s); check dating of the highlighted series.");
    }
    Ok(())
}
