use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::math::EPSILON;
use crate::obstacle::ObstacleRegistry;
use crate::path::Path;
use crate::vehicle::VehicleState;

// ============================================================================
// Behavior Set
// ============================================================================

/// One steering strategy attached to a vehicle. A tagged enum (rather than
/// trait objects) keeps dispatch explicit, keeps evaluation order equal to
/// insertion order, and lets the whole set travel through snapshots.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Behavior {
    FollowPath(FollowPathBehavior),
    ObstacleAvoidance(ObstacleAvoidanceBehavior),
}

impl Behavior {
    /// Multiplier applied to this behavior's force before accumulation.
    pub fn weight(&self) -> f64 {
        match self {
            Behavior::FollowPath(b) => b.weight,
            Behavior::ObstacleAvoidance(b) => b.weight,
        }
    }

    pub fn calculate(&mut self, state: &VehicleState, obstacles: &ObstacleRegistry) -> DVec3 {
        match self {
            Behavior::FollowPath(b) => b.calculate(state),
            Behavior::ObstacleAvoidance(b) => b.calculate(state, obstacles),
        }
    }
}

// ============================================================================
// Follow Path
// ============================================================================

/// Steers toward the path's current waypoint, advancing the cursor once the
/// vehicle comes within the arrival radius.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FollowPathBehavior {
    pub path: Path,
    /// Distance under which the current waypoint counts as reached.
    pub arrival_radius: f64,
    /// Tuning factor for the arrive slow-down on the final waypoint.
    /// Higher values brake earlier.
    pub deceleration: f64,
    pub weight: f64,
}

impl FollowPathBehavior {
    pub fn new(path: Path, arrival_radius: f64) -> Self {
        Self {
            path,
            arrival_radius,
            deceleration: 3.0,
            weight: 1.0,
        }
    }

    /// Seek toward the current waypoint. On the final waypoint of a
    /// non-looped path this degrades to an arrive force so the vehicle
    /// settles instead of orbiting the endpoint.
    ///
    /// The cursor advances at most once per evaluation, before the force is
    /// computed. Re-evaluating in the same state therefore targets the same
    /// waypoint: after an advance the vehicle is outside the arrival radius
    /// of the new target, so the check cannot fire twice.
    ///
    /// An empty path produces a zero force, never an error. Emptiness is
    /// rejected at setup; this is the safe per-tick fallback.
    pub fn calculate(&mut self, state: &VehicleState) -> DVec3 {
        let Ok(current) = self.path.current() else {
            return DVec3::ZERO;
        };

        if state.position.distance_squared(current) < self.arrival_radius * self.arrival_radius {
            self.path.advance();
        }

        let Ok(target) = self.path.current() else {
            return DVec3::ZERO;
        };

        if self.path.finished() {
            arrive(state, target, self.deceleration)
        } else {
            seek(state, target)
        }
    }
}

/// Classic seek: desired velocity at full speed toward the target, force is
/// the difference to the current velocity.
pub(crate) fn seek(state: &VehicleState, target: DVec3) -> DVec3 {
    let to_target = target - state.position;
    if to_target.length_squared() <= EPSILON * EPSILON {
        // Sitting on the target: no meaningful direction.
        return DVec3::ZERO;
    }
    let desired = to_target.normalize() * state.max_speed;
    desired - state.velocity
}

/// Arrive: like seek, but the desired speed falls off linearly with the
/// remaining distance so the vehicle brakes into the target.
pub(crate) fn arrive(state: &VehicleState, target: DVec3, deceleration: f64) -> DVec3 {
    let to_target = target - state.position;
    let distance = to_target.length();
    if distance <= EPSILON {
        // On top of the target: bleed off whatever velocity remains.
        return -state.velocity;
    }
    let speed = (distance / deceleration.max(EPSILON)).min(state.max_speed);
    let desired = to_target * (speed / distance);
    desired - state.velocity
}

// ============================================================================
// Obstacle Avoidance
// ============================================================================

/// Steers around static obstacles using a detection box projected ahead of
/// the vehicle. The box grows with speed; a faster vehicle must react
/// earlier.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ObstacleAvoidanceBehavior {
    /// Detection box length at standstill. At max speed the box is twice
    /// this long.
    pub min_detection_length: f64,
    /// Scales the braking component of the avoidance force.
    pub braking_weight: f64,
    pub weight: f64,
}

impl ObstacleAvoidanceBehavior {
    pub fn new(min_detection_length: f64) -> Self {
        Self {
            min_detection_length,
            braking_weight: 0.2,
            weight: 1.0,
        }
    }

    /// Projects every obstacle into the vehicle's local frame (+Z is the
    /// heading) and keeps only the single most imminent threat: the one
    /// with the smallest forward offset. Summing over all threats would let
    /// obstacles on opposite sides cancel each other out; picking one
    /// cannot.
    ///
    /// Returns a zero vector when nothing threatens.
    pub fn calculate(&self, state: &VehicleState, obstacles: &ObstacleRegistry) -> DVec3 {
        let speed = state.velocity.length();
        let detection_length =
            self.min_detection_length + (speed / state.max_speed.max(EPSILON)) * self.min_detection_length;

        let inverse_rotation = state.rotation.inverse();

        // (forward offset, lateral offset, obstacle radius) of the closest threat.
        let mut closest: Option<(f64, f64, f64)> = None;

        for obstacle in obstacles.iter() {
            let local = inverse_rotation * (obstacle.position - state.position);
            let expanded_radius = obstacle.bounding_radius + state.bounding_radius;

            // Behind the vehicle or beyond the detection box.
            if local.z <= 0.0 || local.z >= detection_length + expanded_radius {
                continue;
            }
            // No lateral overlap with the expanded box.
            if local.x.abs() >= expanded_radius {
                continue;
            }

            match closest {
                Some((z, _, _)) if local.z >= z => {}
                _ => closest = Some((local.z, local.x, obstacle.bounding_radius)),
            }
        }

        let Some((local_z, local_x, radius)) = closest else {
            return DVec3::ZERO;
        };

        // The closer the obstacle, the stronger the correction.
        let multiplier = 1.0 + (detection_length - local_z) / detection_length.max(EPSILON);

        // Lateral push away from the obstacle's side of the box, braking
        // proportional to how deep it sits in the box. (radius - local_x)
        // is strictly positive for any overlapping obstacle, so a threat
        // dead ahead still resolves to a definite turn direction.
        let lateral = (radius - local_x) * multiplier;
        let braking = (radius - local_z) * self.braking_weight;

        state.rotation * DVec3::new(lateral, 0.0, braking)
    }
}
