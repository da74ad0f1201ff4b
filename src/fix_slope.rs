/// Fix Slope - recompute the slope channel from altitude and distance
///
/// Altitude is run through a one-pole exponential filter before the grade is taken,
/// so GPS/barometer jitter does not turn into slope noise. Grades steeper than
/// MAX_SLOPE_PERCENT are treated as spikes and replaced by the previous sample's slope.
use crate::data_processor::{DataProcessor, DataProcessorConfig, DataProcessorFactory};
use crate::ride_file::{RideFile, RidePoint, SeriesType};

pub const FIX_SLOPE_KEY: &str = "fix slope errors";

// Smoothing factor of the altitude filter, single precision 0.02 widened
const ALPHA: f64 = 0.02f32 as f64;
const MAX_SLOPE_PERCENT: f64 = 30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixSlopeStats {
    pub computed: usize,
    pub rejected_spikes: usize,
    pub zero_distance: usize,
}

/// There is no config, only an explanation for the preferences pane.
#[derive(Debug, Default)]
pub struct FixSlopeConfig;

impl DataProcessorConfig for FixSlopeConfig {
    fn explain(&self) -> String {
        "Fix or add slope data. If slope data is present it will be removed and overwritten."
            .to_string()
    }

    fn read_config(&mut self) {}

    fn save_config(&self) {}
}

#[derive(Debug, Default)]
pub struct FixSlope;

impl FixSlope {
    pub fn new() -> Self {
        FixSlope
    }
}

impl DataProcessor for FixSlope {
    fn post_process(&self, ride: &mut RideFile, _config: Option<&dyn DataProcessorConfig>) -> bool {
        if ride.is_empty() {
            log::debug!("Fix slope: empty ride, nothing to do");
            return false;
        }

        let stats = fix_slope_points(ride.data_points_mut());
        ride.set_data_present(SeriesType::Slope, true);

        log::debug!(
            "Fix slope on {}: {} computed, {} spikes rejected, {} zero-distance samples",
            ride.name.as_deref().unwrap_or("ride"),
            stats.computed,
            stats.rejected_spikes,
            stats.zero_distance
        );
        true
    }

    fn processor_config(&self) -> Box<dyn DataProcessorConfig> {
        Box::new(FixSlopeConfig)
    }

    fn name(&self) -> String {
        "Fix Slope errors".to_string()
    }
}

#[ctor::ctor]
fn register_fix_slope() {
    DataProcessorFactory::instance_mut()
        .register_processor(FIX_SLOPE_KEY, Box::new(FixSlope::new()));
}

pub fn filter_alt_data(alt: f64, altp: f64, a: f64) -> f64 {
    altp + a * (alt - altp)
}

/// Grades up to and including MAX_SLOPE_PERCENT either way are kept.
pub fn is_plausible_slope(slope: f64) -> bool {
    slope.is_finite() && slope.abs() <= MAX_SLOPE_PERCENT
}

/// Rewrites `slope` for every point except the first and last.
///
/// The slope at `i` is the change in smoothed altitude between `i-1` and `i` over the
/// distance from `i` to `i+1`. Zero distance or an implausible grade keeps the slope
/// of point `i-1`. A non-finite altitude also keeps it, and does not enter the filter.
pub fn fix_slope_points(points: &mut [RidePoint]) -> FixSlopeStats {
    let mut stats = FixSlopeStats::default();
    if points.len() < 3 {
        return stats;
    }

    let mut altp = points[0].alt;
    for i in 1..points.len() - 1 {
        let alt = filter_alt_data(points[i].alt, altp, ALPHA);
        if !alt.is_finite() {
            stats.rejected_spikes += 1;
            points[i].slope = points[i - 1].slope;
            continue;
        }

        let delta_alt = alt - altp;
        let delta_dist = (points[i + 1].km - points[i].km) * 1000.0;

        let slope = if delta_dist != 0.0 {
            let slope = delta_alt / delta_dist * 100.0;
            if is_plausible_slope(slope) {
                stats.computed += 1;
                slope
            } else {
                stats.rejected_spikes += 1;
                points[i - 1].slope
            }
        } else {
            stats.zero_distance += 1;
            points[i - 1].slope
        };

        points[i].slope = slope;
        altp = alt;
    }

    stats
}
