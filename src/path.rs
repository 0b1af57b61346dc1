use crate::error::SteeringError;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Waypoints arrive from untrusted host JSON, so the sequence is bounded.
pub const MAX_WAYPOINTS: usize = 4096;

/// An ordered sequence of waypoints with a cursor pointing at the current
/// target. Built once at scene setup; during simulation only the cursor
/// moves, driven by the follow-path behavior's proximity checks.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Path {
    waypoints: Vec<DVec3>,
    looped: bool,
    index: usize,
}

impl Path {
    pub fn new(looped: bool) -> Self {
        Self {
            waypoints: Vec::new(),
            looped,
            index: 0,
        }
    }

    /// Appends a waypoint. Insertion order is significant and duplicates
    /// are allowed (a figure-eight revisits its crossing point).
    pub fn add(&mut self, waypoint: DVec3) -> Result<(), SteeringError> {
        if self.waypoints.len() >= MAX_WAYPOINTS {
            return Err(SteeringError::PathCapacity);
        }
        self.waypoints.push(waypoint);
        Ok(())
    }

    /// The waypoint the cursor currently targets.
    pub fn current(&self) -> Result<DVec3, SteeringError> {
        self.waypoints
            .get(self.index)
            .copied()
            .ok_or(SteeringError::EmptyPath)
    }

    /// Moves the cursor to the next waypoint. At the last waypoint this
    /// wraps to 0 on a looped path and is a no-op otherwise, so the cursor
    /// stays a valid index as long as the sequence is non-empty.
    pub fn advance(&mut self) {
        if self.waypoints.is_empty() {
            return;
        }
        if self.index + 1 < self.waypoints.len() {
            self.index += 1;
        } else if self.looped {
            self.index = 0;
        }
    }

    /// True once a non-looped path has its cursor on the final waypoint.
    /// A looped path never finishes.
    pub fn finished(&self) -> bool {
        !self.looped && !self.waypoints.is_empty() && self.index + 1 == self.waypoints.len()
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn waypoints(&self) -> &[DVec3] {
        &self.waypoints
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}
