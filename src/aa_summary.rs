// Tabular route summary derived from a prediction result
use crate::aa_models::{AAError, PredictionResult, Result};
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub index: u32,
    pub avg: Option<f64>,
    pub max: Option<f64>,
    pub waypoints: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryView {
    /// No predict call has completed yet.
    NoResultYet,
    /// A result arrived but holds no routes.
    NoValidPredictions,
    Routes(Vec<RouteSummary>),
}

fn first_value(series: &Option<Vec<f64>>) -> Option<f64> {
    series
        .as_ref()
        .and_then(|values| values.first().copied())
        .filter(|v| v.is_finite())
}

pub fn summarize(result: Option<&PredictionResult>) -> SummaryView {
    let result = match result {
        Some(result) => result,
        None => return SummaryView::NoResultYet,
    };

    if result.routes.is_empty() {
        return SummaryView::NoValidPredictions;
    }

    SummaryView::Routes(
        result
            .routes
            .iter()
            .map(|route| RouteSummary {
                index: route.route_index,
                avg: first_value(&route.avg_forecast_pm2_5),
                max: first_value(&route.max_forecast_pm2_5),
                waypoints: route.waypoints,
            })
            .collect(),
    )
}

pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => "N/A".to_string(),
    }
}

/// Route with the lowest average forecast, if any route has one.
pub fn cleanest_route(rows: &[RouteSummary]) -> Option<&RouteSummary> {
    rows.iter()
        .filter(|r| r.avg.is_some())
        .min_by(|a, b| {
            a.avg
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.avg.unwrap_or(f64::INFINITY))
        })
}

pub fn write_csv<W: Write>(rows: &[RouteSummary], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(["route_index", "avg_pm2_5", "max_pm2_5", "waypoints"])
        .map_err(|e| AAError::FileError(format!("Failed to write CSV header: {}", e)))?;

    for row in rows {
        wtr.write_record([
            row.index.to_string(),
            format_value(row.avg),
            format_value(row.max),
            row.waypoints.to_string(),
        ])
        .map_err(|e| AAError::FileError(format!("Failed to write CSV row: {}", e)))?;
    }

    wtr.flush()
        .map_err(|e| AAError::FileError(format!("Failed to flush CSV: {}", e)))?;
    Ok(())
}
