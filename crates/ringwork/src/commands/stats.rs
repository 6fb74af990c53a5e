use anyhow::Result;
use ringwork_core::series_stats::series_stats;

use crate::{render, Session};

pub fn handle(session: &Session) -> Result<()> {
    let inputs = super::inputs(session)?;
    let stats = series_stats(&inputs.ring_widths)?;
    println!("{}", render::series_stats(&stats));
    Ok(())
}
