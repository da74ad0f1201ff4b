/// GPX import - turns a GPX track into a RideFile with cumulative distance and elapsed time
use crate::error::RideError;
use crate::ride_file::{RideFile, RidePoint, SeriesType};
use chrono::{DateTime, Utc};
use geo::{point, HaversineDistance};
use gpx::{read, Gpx, Time};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn read_gpx_ride(path: &Path) -> Result<RideFile, RideError> {
    let file = File::open(path)?;
    let mut ride = read_gpx_from(BufReader::new(file))?;
    ride.source = Some(path.to_path_buf());
    if ride.name.is_none() {
        ride.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string());
    }
    Ok(ride)
}

pub fn read_gpx_from<R: Read>(reader: R) -> Result<RideFile, RideError> {
    let gpx = read(reader)?;
    ride_from_gpx(&gpx)
}

pub fn ride_from_gpx(gpx: &Gpx) -> Result<RideFile, RideError> {
    if gpx.tracks.is_empty() {
        return Err(RideError::NoTracks);
    }

    let mut points: Vec<RidePoint> = Vec::new();
    let mut start_time: Option<DateTime<Utc>> = None;
    let mut has_time = false;
    let mut distance_m = 0.0;
    let mut previous: Option<(f64, f64)> = None;

    for track in &gpx.tracks {
        for segment in &track.segments {
            for waypoint in &segment.points {
                let Some(elevation) = waypoint.elevation else {
                    continue;
                };
                let lat = waypoint.point().y();
                let lon = waypoint.point().x();

                if let Some((prev_lat, prev_lon)) = previous {
                    let a = point!(x: prev_lon, y: prev_lat);
                    let b = point!(x: lon, y: lat);
                    distance_m += a.haversine_distance(&b);
                }
                previous = Some((lat, lon));

                let secs = match waypoint.time.as_ref().and_then(parse_time) {
                    Some(time) => {
                        has_time = true;
                        let start = *start_time.get_or_insert(time);
                        (time - start).num_milliseconds() as f64 / 1000.0
                    }
                    None => points.len() as f64,
                };

                points.push(RidePoint {
                    lat,
                    lon,
                    ..RidePoint::new(secs, distance_m / 1000.0, elevation)
                });
            }
        }
    }

    if points.is_empty() {
        return Err(RideError::NoElevation);
    }

    let mut ride = RideFile::from_points(points);
    ride.name = gpx.tracks.iter().find_map(|track| track.name.clone());

    if !has_time {
        log::debug!("GPX has no timestamps, using sample index as elapsed seconds");
    }
    ride.set_data_present(SeriesType::Lat, true);
    ride.set_data_present(SeriesType::Lon, true);

    Ok(ride)
}

fn parse_time(time: &Time) -> Option<DateTime<Utc>> {
    time.format().ok()?.parse::<DateTime<Utc>>().ok()
}

/// All `.gpx` files under `folder`, sorted by path.
pub fn collect_gpx_files(folder: &Path) -> Result<Vec<PathBuf>, RideError> {
    let mut gpx_files = Vec::new();
    for entry in WalkDir::new(folder) {
        let entry = entry?;
        if entry.file_type().is_file() && is_gpx(entry.path()) {
            gpx_files.push(entry.path().to_path_buf());
        }
    }
    gpx_files.sort();
    Ok(gpx_files)
}

pub fn is_gpx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gpx"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Morning Ride</name>
    <trkseg>
      <trkpt lat="46.0" lon="7.0"><ele>500.0</ele><time>2024-05-01T08:00:00Z</time></trkpt>
      <trkpt lat="46.001" lon="7.0"><ele>505.0</ele><time>2024-05-01T08:00:10Z</time></trkpt>
      <trkpt lat="46.002" lon="7.0"><time>2024-05-01T08:00:20Z</time></trkpt>
      <trkpt lat="46.003" lon="7.0"><ele>512.0</ele><time>2024-05-01T08:00:30Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_read_track() {
        let ride = read_gpx_from(TRACK.as_bytes()).unwrap();
        assert_eq!(ride.name.as_deref(), Some("Morning Ride"));
        // the point without elevation is skipped
        assert_eq!(ride.len(), 3);

        let pts = ride.data_points();
        assert_eq!(pts[0].km, 0.0);
        assert_eq!(pts[0].secs, 0.0);
        assert_eq!(pts[2].secs, 30.0);
        assert_eq!(pts[2].alt, 512.0);
        // 0.001 degrees of latitude is roughly 111 m
        assert_relative_eq!(pts[1].km, 0.1112, epsilon = 1e-3);
        assert_relative_eq!(pts[2].km, 0.3336, epsilon = 3e-3);
        assert!(ride.is_data_present(SeriesType::Alt));
        assert!(ride.is_data_present(SeriesType::Lat));
        assert!(ride.is_data_present(SeriesType::Lon));
        assert!(!ride.is_data_present(SeriesType::Slope));
    }

    #[test]
    fn test_no_elevation() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg><trkpt lat="46.0" lon="7.0"></trkpt></trkseg></trk>
</gpx>"#;
        assert!(matches!(read_gpx_from(gpx.as_bytes()), Err(RideError::NoElevation)));
    }

    #[test]
    fn test_no_tracks() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
</gpx>"#;
        assert!(matches!(read_gpx_from(gpx.as_bytes()), Err(RideError::NoTracks)));
    }

    #[test]
    fn test_collect_gpx_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.gpx"), TRACK).unwrap();
        std::fs::write(dir.path().join("nested").join("B.GPX"), TRACK).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = collect_gpx_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_gpx(f)));
    }

    #[test]
    fn test_read_gpx_ride_sets_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ride.gpx");
        std::fs::write(&path, TRACK).unwrap();

        let ride = read_gpx_ride(&path).unwrap();
        assert_eq!(ride.source.as_deref(), Some(path.as_path()));
        assert_eq!(ride.name.as_deref(), Some("Morning Ride"));
    }
}
