/// Ride data the processors work on: an ordered list of samples plus
/// a record of which channels actually carry data.
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeriesType {
    Secs,
    Km,
    Alt,
    Slope,
    Lat,
    Lon,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RidePoint {
    pub secs: f64,
    /// Cumulative distance in kilometres
    pub km: f64,
    /// Altitude in metres
    pub alt: f64,
    /// Grade in percent
    pub slope: f64,
    pub lat: f64,
    pub lon: f64,
}

impl RidePoint {
    pub fn new(secs: f64, km: f64, alt: f64) -> Self {
        RidePoint {
            secs,
            km,
            alt,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RideFile {
    pub name: Option<String>,
    pub source: Option<PathBuf>,
    points: Vec<RidePoint>,
    present: BTreeSet<SeriesType>,
}

impl RideFile {
    pub fn from_points(points: Vec<RidePoint>) -> Self {
        let mut ride = RideFile {
            points,
            ..Default::default()
        };
        if !ride.points.is_empty() {
            ride.set_data_present(SeriesType::Secs, true);
            ride.set_data_present(SeriesType::Km, true);
            ride.set_data_present(SeriesType::Alt, true);
        }
        ride
    }

    pub fn data_points(&self) -> &[RidePoint] {
        &self.points
    }

    pub fn data_points_mut(&mut self) -> &mut [RidePoint] {
        &mut self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_data_present(&self, series: SeriesType) -> bool {
        self.present.contains(&series)
    }

    pub fn set_data_present(&mut self, series: SeriesType, present: bool) {
        if present {
            self.present.insert(series);
        } else {
            self.present.remove(&series);
        }
    }

    pub fn total_distance_km(&self) -> f64 {
        self.points.last().map(|p| p.km).unwrap_or(0.0)
    }
}
