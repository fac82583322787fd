//! Pose estimate shared between a tracker and its consumers.
//!
//! One [`PoseState`] belongs to one tracker. The tracker writes it from its
//! frame callback; any number of threads may read it concurrently. All fields
//! live behind a single lock so a reader never sees a position from one
//! frame paired with a rotation from another.

use std::time::Instant;

use nalgebra::{Matrix3, Point2, Vector3};
use parking_lot::Mutex;

use crate::camera::{rotation_from_rvec, rvec_from_rotation};
use crate::fps::FpsCounter;

/// Position, axis-angle rotation and the matching rotation matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub rotation: Vector3<f64>,
    pub rotation_matrix: Matrix3<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            rotation_matrix: Matrix3::identity(),
        }
    }
}

impl Pose {
    pub fn from_rvec_tvec(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self {
            position: tvec,
            rotation: rvec,
            rotation_matrix: rotation_from_rvec(&rvec),
        }
    }

    pub fn from_rotation_matrix(rotation_matrix: Matrix3<f64>, tvec: Vector3<f64>) -> Self {
        Self::from_rvec_tvec(rvec_from_rotation(&rotation_matrix), tvec)
    }
}

/// Copy of everything a [`PoseState`] holds, taken under one lock.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseSnapshot {
    pub pose: Pose,
    pub image_points: Vec<Point2<f64>>,
    pub projected_points: Vec<Point2<f64>>,
    pub last_update: Option<Instant>,
    pub frame_rate: f64,
}

#[derive(Debug, Default)]
struct Inner {
    pose: Pose,
    image_points: Vec<Point2<f64>>,
    projected_points: Vec<Point2<f64>>,
    fps: FpsCounter,
}

#[derive(Debug, Default)]
pub struct PoseState {
    inner: Mutex<Inner>,
}

impl PoseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vector3<f64> {
        self.inner.lock().pose.position
    }

    pub fn rotation(&self) -> Vector3<f64> {
        self.inner.lock().pose.rotation
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.inner.lock().pose.rotation_matrix
    }

    /// Position and orientation from the same update.
    pub fn pose(&self) -> Pose {
        self.inner.lock().pose
    }

    /// Successful updates per second over the rolling window.
    pub fn frame_rate(&self) -> f64 {
        self.inner.lock().fps.fps()
    }

    /// Image points of the last successful solve.
    pub fn image_points(&self) -> Vec<Point2<f64>> {
        self.inner.lock().image_points.clone()
    }

    /// Object points re-projected with the last solved pose.
    pub fn projected_points(&self) -> Vec<Point2<f64>> {
        self.inner.lock().projected_points.clone()
    }

    /// Time of the last successful update, `None` before the first.
    pub fn last_update(&self) -> Option<Instant> {
        self.inner.lock().fps.last()
    }

    pub fn snapshot(&self) -> PoseSnapshot {
        let inner = self.inner.lock();
        PoseSnapshot {
            pose: inner.pose,
            image_points: inner.image_points.clone(),
            projected_points: inner.projected_points.clone(),
            last_update: inner.fps.last(),
            frame_rate: inner.fps.fps(),
        }
    }

    /// Replace the full pose and count the update.
    pub fn publish_pose(&self, pose: Pose) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.pose = pose;
        inner.fps.tick_at(now);
    }

    /// Replace the position only; orientation keeps its prior value.
    pub fn publish_position(&self, position: Vector3<f64>) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.pose.position = position;
        inner.fps.tick_at(now);
    }

    /// Replace pose and diagnostic points together.
    pub fn publish_solution(
        &self,
        pose: Pose,
        image_points: Vec<Point2<f64>>,
        projected_points: Vec<Point2<f64>>,
    ) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.pose = pose;
        inner.image_points = image_points;
        inner.projected_points = projected_points;
        inner.fps.tick_at(now);
    }
}
