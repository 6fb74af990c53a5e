use anyhow::Result;
use ringwork_core::release::detect_table_releases;

use crate::{render, Session};

pub fn handle(session: &Session) -> Result<()> {
    let inputs = super::inputs(session)?;
    let config = &session.config.release;
    let report = detect_table_releases(inputs.release_table(), config)?;

    println!(
        "Radial growth averaging: {}/{} year windows, buffer {}, minor {:.0}%, major {:.0}%, length {}",
        config.prior,
        config.after,
        config.buffer,
        config.minor * 100.0,
        config.major * 100.0,
        config.length
    );
    println!("{}", render::release_counts(&report));
    println!(
        "{} release event(s) across {} series",
        report.events().count(),
        report.series.len()
    );
    Ok(())
}
