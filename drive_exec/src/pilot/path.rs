//! # Recorded path module
//!
//! While the operator drives, the [`PathRecorder`] stores the positions the vehicle passes
//! through. When the pilot drives, the [`CrossTrackError`] part measures how far the vehicle is
//! from that recorded path. The path itself is shared between the two parts and the save trigger
//! through a [`RecordedPath`] handle, and can be saved to and loaded from a JSON file.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};
use log::{debug, info};
use nalgebra::{Vector2, Vector3};
use thiserror::Error;

use crate::{
    mailbox::Mailbox,
    vehicle::{check_inputs, Part, PartError, Value},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared handle to the recorded path.
#[derive(Debug, Clone)]
pub struct RecordedPath {
    state: Mailbox<PathState>,
}

#[derive(Debug, Clone)]
struct PathState {
    points: Vec<[f64; 2]>,
    recording: bool,
}

/// Records the positions the vehicle passes through while recording is on.
///
/// Inputs: `pos/x, pos/y`. No outputs.
pub struct PathRecorder {
    path: RecordedPath,

    /// Minimum distance between two recorded points
    min_dist_m: f64,
}

/// Signed lateral distance between the vehicle and the recorded path, positive when the vehicle
/// is to the left of the path's direction of travel.
///
/// Inputs: `pos/x, pos/y`. Outputs: `cte/error`.
pub struct CrossTrackError {
    path: RecordedPath,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Could not access the path file {0:?}: {1}")]
    FileError(PathBuf, std::io::Error),

    #[error("Could not read or write path file {0:?}: {1}")]
    FormatError(PathBuf, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RecordedPath {
    /// Create a new empty path, with recording on.
    pub fn new() -> Self {
        Self {
            state: Mailbox::new(PathState {
                points: Vec::new(),
                recording: true,
            }),
        }
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        self.state.read(|s| s.points.clone())
    }

    pub fn len(&self) -> usize {
        self.state.read(|s| s.points.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_recording(&self) -> bool {
        self.state.read(|s| s.recording)
    }

    pub fn set_recording(&self, recording: bool) {
        self.state.update(|s| s.recording = recording);
    }

    /// Remove all points and turn recording back on.
    pub fn reset(&self) {
        self.state.update(|s| {
            s.points.clear();
            s.recording = true;
        });
    }

    /// Append the point if recording is on and it is more than `min_dist_m` away from the last
    /// recorded point. Returns whether the point was recorded.
    pub fn record(&self, x: f64, y: f64, min_dist_m: f64) -> bool {
        self.state.update(|s| {
            if !s.recording {
                return false;
            }

            let far_enough = match s.points.last() {
                Some(last) => util::maths::norm(&last[..], &[x, y][..])
                    .map(|d| d > min_dist_m)
                    .unwrap_or(false),
                None => true,
            };

            if far_enough {
                s.points.push([x, y]);
            }

            far_enough
        })
    }

    /// Replace the path with the one stored in the given file and stop recording.
    ///
    /// Returns the number of points loaded.
    pub fn load<P: AsRef<Path>>(&self, file: P) -> Result<usize, PathError> {
        let file = file.as_ref();
        let reader = File::open(file)
            .map(BufReader::new)
            .map_err(|e| PathError::FileError(file.to_path_buf(), e))?;

        let points: Vec<[f64; 2]> = serde_json::from_reader(reader)
            .map_err(|e| PathError::FormatError(file.to_path_buf(), e))?;
        let num_points = points.len();

        self.state.update(|s| {
            s.points = points;
            s.recording = false;
        });

        info!("Loaded path with {} points from {:?}", num_points, file);

        Ok(num_points)
    }

    /// Write the path to the given file, returning the number of points saved.
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<usize, PathError> {
        let file = file.as_ref();
        let points = self.points();

        let writer = File::create(file)
            .map(BufWriter::new)
            .map_err(|e| PathError::FileError(file.to_path_buf(), e))?;

        serde_json::to_writer(writer, &points)
            .map_err(|e| PathError::FormatError(file.to_path_buf(), e))?;

        info!("Saved path with {} points to {:?}", points.len(), file);

        Ok(points.len())
    }

    /// Compute the cross track error of the given position, see [`CrossTrackError`].
    ///
    /// Returns 0 if the path has fewer than two points.
    pub fn cross_track_error(&self, x: f64, y: f64) -> f64 {
        let pos = Vector2::new(x, y);

        let (start, end) = match self.state.read(|s| nearest_two(&s.points, &pos)) {
            Some(seg) => seg,
            None => return 0.0,
        };

        let dir = end - start;
        if dir.norm() == 0.0 {
            debug!("Nearest path points are coincident, no cross track error");
            return 0.0;
        }
        let dir = dir.normalize();

        // The z component of dir x (pos - start) is the signed distance to the line, +ve left
        Vector3::new(dir[0], dir[1], 0.0).cross(&Vector3::new(
            pos[0] - start[0],
            pos[1] - start[1],
            0.0,
        ))[2]
    }
}

impl Default for RecordedPath {
    fn default() -> Self {
        Self::new()
    }
}

impl PathRecorder {
    pub fn new(path: RecordedPath, min_dist_m: f64) -> Self {
        Self { path, min_dist_m }
    }
}

impl Part for PathRecorder {
    fn name(&self) -> &str {
        "path_recorder"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 2)?;

        // Nothing to record until a position is known
        if inputs[0].is_none() || inputs[1].is_none() {
            return Ok(vec![]);
        }

        let x = inputs[0].as_f64()?;
        let y = inputs[1].as_f64()?;

        if self.path.record(x, y, self.min_dist_m) {
            debug!("Recorded path point {} at ({:.3}, {:.3})", self.path.len(), x, y);
        }

        Ok(vec![])
    }
}

impl CrossTrackError {
    pub fn new(path: RecordedPath) -> Self {
        Self { path }
    }
}

impl Part for CrossTrackError {
    fn name(&self) -> &str {
        "cross_track_error"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 2)?;
        let x = inputs[0].float_or(0.0)?;
        let y = inputs[1].float_or(0.0)?;

        Ok(vec![Value::Float(self.path.cross_track_error(x, y))])
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the two points nearest `pos`, returned in path order.
fn nearest_two(points: &[[f64; 2]], pos: &Vector2<f64>) -> Option<(Vector2<f64>, Vector2<f64>)> {
    if points.len() < 2 {
        return None;
    }

    let mut dists: Vec<(f64, usize)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| ((Vector2::new(p[0], p[1]) - pos).norm_squared(), i))
        .collect();

    // Ties keep path order
    dists.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let (i, j) = if dists[0].1 < dists[1].1 {
        (dists[0].1, dists[1].1)
    } else {
        (dists[1].1, dists[0].1)
    };

    Some((
        Vector2::new(points[i][0], points[i][1]),
        Vector2::new(points[j][0], points[j][1]),
    ))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn straight_path(reverse: bool) -> RecordedPath {
        let path = RecordedPath::new();
        let mut xs = vec![0.0, 1.0, 2.0, 3.0];
        if reverse {
            xs.reverse();
        }
        for x in xs {
            assert!(path.record(x, 0.0, 0.5));
        }
        path
    }

    #[test]
    fn test_recording_min_dist() {
        let path = RecordedPath::new();
        let mut rec = PathRecorder::new(path.clone(), 0.3);

        // No position yet
        rec.run(&[Value::None, Value::None]).unwrap();
        assert!(path.is_empty());

        for (x, y) in &[(0.0, 0.0), (0.1, 0.1), (0.3, 0.0), (0.31, 0.0), (0.31, 0.35)] {
            rec.run(&[Value::Float(*x), Value::Float(*y)]).unwrap();
        }
        assert_eq!(path.points(), vec![[0.0, 0.0], [0.31, 0.0], [0.31, 0.35]]);

        // Nothing recorded once recording is off
        path.set_recording(false);
        rec.run(&[Value::Float(5.0), Value::Float(5.0)]).unwrap();
        assert_eq!(path.len(), 3);

        path.reset();
        assert!(path.is_empty());
        assert!(path.is_recording());
    }

    #[test]
    fn test_cross_track_sign() {
        let path = straight_path(false);

        assert_abs_diff_eq!(path.cross_track_error(0.5, 0.2), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(path.cross_track_error(2.4, -0.3), -0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(path.cross_track_error(1.5, 0.0), 0.0, epsilon = 1e-12);

        // Driving the path the other way round flips the sides
        let path = straight_path(true);
        assert_abs_diff_eq!(path.cross_track_error(0.5, 0.2), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_track_short_path() {
        let path = RecordedPath::new();
        let mut cte = CrossTrackError::new(path.clone());
        assert_eq!(cte.run(&[Value::Float(1.0), Value::Float(1.0)]).unwrap(), vec![Value::Float(0.0)]);

        path.record(0.0, 0.0, 0.1);
        assert_eq!(cte.run(&[Value::Float(1.0), Value::Float(1.0)]).unwrap(), vec![Value::Float(0.0)]);

        path.record(0.0, 1.0, 0.1);
        let out = cte.run(&[Value::Float(-0.25), Value::Float(0.5)]).unwrap();
        assert_abs_diff_eq!(out[0].as_f64().unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_save_load() {
        let file = std::env::temp_dir().join(format!("drive_path_{}.json", std::process::id()));

        let path = straight_path(false);
        assert_eq!(path.save(&file).unwrap(), 4);

        let loaded = RecordedPath::new();
        assert!(loaded.is_recording());
        assert_eq!(loaded.load(&file).unwrap(), 4);
        assert!(!loaded.is_recording());
        assert_eq!(loaded.points(), path.points());

        // Stored as plain [x, y] pairs
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(raw[1], serde_json::json!([1.0, 0.0]));

        std::fs::remove_file(&file).unwrap();

        assert!(matches!(loaded.load(&file), Err(PathError::FileError(_, _))));
    }
}
