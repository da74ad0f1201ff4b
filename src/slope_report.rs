/// Slope report - per-sample and per-ride CSV output of processed rides
use crate::error::RideError;
use crate::ride_file::{RideFile, SeriesType};
use csv::Writer;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct PointRecord {
    secs: f64,
    km: f64,
    alt: f64,
    slope: f64,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlopeSummary {
    pub filename: String,
    pub ride_name: String,
    pub points: usize,
    pub distance_km: f64,
    pub has_slope: bool,
    pub min_slope_percent: f64,
    pub max_slope_percent: f64,
    pub mean_slope_percent: f64,
    pub processing_status: String,
}

impl SlopeSummary {
    pub fn from_ride(filename: &str, ride: &RideFile) -> Self {
        let pts = ride.data_points();
        // first and last samples are not recomputed
        let inner = if pts.len() > 2 { &pts[1..pts.len() - 1] } else { &[][..] };

        let (min, max, sum) = inner.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), p| (min.min(p.slope), max.max(p.slope), sum + p.slope),
        );
        let (min, max, mean) = if inner.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (min, max, sum / inner.len() as f64)
        };

        SlopeSummary {
            filename: filename.to_string(),
            ride_name: ride.name.clone().unwrap_or_default(),
            points: ride.len(),
            distance_km: ride.total_distance_km(),
            has_slope: ride.is_data_present(SeriesType::Slope),
            min_slope_percent: min,
            max_slope_percent: max,
            mean_slope_percent: mean,
            processing_status: "OK".to_string(),
        }
    }

    pub fn failed(filename: &str, error: &RideError) -> Self {
        SlopeSummary {
            filename: filename.to_string(),
            ride_name: "ERROR".to_string(),
            points: 0,
            distance_km: 0.0,
            has_slope: false,
            min_slope_percent: 0.0,
            max_slope_percent: 0.0,
            mean_slope_percent: 0.0,
            processing_status: format!("ERROR: {}", error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.processing_status == "OK"
    }
}

pub fn write_points_csv(ride: &RideFile, csv_path: &Path) -> Result<(), RideError> {
    let mut wtr = Writer::from_path(csv_path)?;
    for p in ride.data_points() {
        wtr.serialize(PointRecord {
            secs: p.secs,
            km: p.km,
            alt: p.alt,
            slope: p.slope,
            lat: p.lat,
            lon: p.lon,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_summary_csv(summaries: &[SlopeSummary], csv_path: &Path) -> Result<(), RideError> {
    let mut wtr = Writer::from_path(csv_path)?;
    for summary in summaries {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;
    Ok(())
}
