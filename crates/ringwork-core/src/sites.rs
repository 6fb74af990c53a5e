use polars::prelude::*;
use serde::Serialize;
use tracing::warn;

use ringwork_parser::Site;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSummary {
    pub site: Site,
    pub series: Vec<String>,
}

/// Core ids conventionally start with their site code; a series belongs
/// to the site with the longest matching prefix.
pub fn site_for_series<'a>(sites: &'a [Site], series_id: &str) -> Option<&'a Site> {
    sites
        .iter()
        .filter(|site| {
            series_id
                .to_ascii_lowercase()
                .starts_with(&site.site_id.to_ascii_lowercase())
        })
        .max_by_key(|site| site.site_id.len())
}

pub fn summarize_sites(sites: &[Site], series_ids: &[String]) -> Vec<SiteSummary> {
    let mut summaries: Vec<SiteSummary> = sites
        .iter()
        .map(|site| SiteSummary {
            site: site.clone(),
            series: Vec::new(),
        })
        .collect();

    for series_id in series_ids {
        match site_for_series(sites, series_id) {
            Some(site) => {
                if let Some(summary) = summaries
                    .iter_mut()
                    .find(|summary| summary.site.site_id == site.site_id)
                {
                    summary.series.push(series_id.clone());
                }
            }
            None => warn!(series = %series_id, "series matches no site id"),
        }
    }
    summaries
}

pub fn sites_frame(summaries: &[SiteSummary]) -> PolarsResult<DataFrame> {
    df!(
        "site_id" => summaries.iter().map(|s| s.site.site_id.as_str()).collect::<Vec<_>>(),
        "name" => summaries.iter().map(|s| s.site.name.as_deref()).collect::<Vec<_>>(),
        "latitude" => summaries.iter().map(|s| s.site.latitude).collect::<Vec<_>>(),
        "longitude" => summaries.iter().map(|s| s.site.longitude).collect::<Vec<_>>(),
        "taxon" => summaries.iter().map(|s| s.site.taxon.as_str()).collect::<Vec<_>>(),
        "elevation_m" => summaries.iter().map(|s| s.site.elevation_m).collect::<Vec<_>>(),
        "n_series" => summaries.iter().map(|s| s.series.len() as u32).collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str) -> Site {
        Site {
            site_id: id.to_string(),
            name: None,
            latitude: 40.0,
            longitude: -77.0,
            taxon: "QUAL".to_string(),
            elevation_m: None,
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let sites = vec![site("BC"), site("BCX")];
        assert_eq!(site_for_series(&sites, "BCX01a").unwrap().site_id, "BCX");
        assert_eq!(site_for_series(&sites, "bc02b").unwrap().site_id, "BC");
        assert!(site_for_series(&sites, "TR01").is_none());
    }

    #[test]
    fn counts_series_per_site() {
        let sites = vec![site("BC"), site("TR")];
        let ids: Vec<String> = ["BC01", "BC02", "TR01", "ZZ9"]
            .iter()
            .map(|id| id.to_string())
            .collect();
        let summaries = summarize_sites(&sites, &ids);
        assert_eq!(summaries[0].series, vec!["BC01", "BC02"]);
        assert_eq!(summaries[1].series.len(), 1);
    }
}
