use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::math::EPSILON;
use crate::obstacle::ObstacleRegistry;
use crate::steering::manager::SteeringManager;

/// Read-only kinematic snapshot handed to steering behaviors. Behaviors
/// only need these fields, and copying them out keeps behavior evaluation
/// disjoint from the manager that owns the behaviors.
#[derive(Clone, Copy, Debug)]
pub struct VehicleState {
    pub position: DVec3,
    pub velocity: DVec3,
    pub rotation: DQuat,
    pub max_speed: f64,
    pub max_force: f64,
    pub bounding_radius: f64,
}

/// A moving entity driven by accumulated steering forces. Position,
/// velocity and orientation evolve every tick; there are no discrete
/// states and no terminal state. The external driver controls lifetime.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Vehicle {
    pub id: u32,
    pub position: DVec3,
    pub velocity: DVec3,
    pub rotation: DQuat,
    /// Render-layer scale; the simulation itself never reads it.
    pub scale: DVec3,
    pub max_speed: f64,
    pub max_force: f64,
    pub mass: f64,
    pub bounding_radius: f64,
    pub steering: SteeringManager,
    pub smoother: Option<Smoother>,
}

impl Vehicle {
    pub fn new(
        id: u32,
        position: DVec3,
        max_speed: f64,
        max_force: f64,
        bounding_radius: f64,
    ) -> Self {
        Self {
            id,
            position,
            velocity: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
            max_speed,
            max_force,
            mass: 1.0,
            bounding_radius,
            steering: SteeringManager::new(),
            smoother: None,
        }
    }

    pub fn state(&self) -> VehicleState {
        VehicleState {
            position: self.position,
            velocity: self.velocity,
            rotation: self.rotation,
            max_speed: self.max_speed,
            max_force: self.max_force,
            bounding_radius: self.bounding_radius,
        }
    }

    /// One integration step:
    /// 1. Accumulate the steering force.
    /// 2. F = ma, so acceleration = force / mass.
    /// 3. Integrate velocity, clamp its magnitude to max speed.
    /// 4. Integrate position.
    /// 5. Turn to face the (optionally smoothed) velocity direction; a
    ///    near-zero direction retains the prior orientation.
    pub fn update(&mut self, delta: f64, obstacles: &ObstacleRegistry) {
        let state = self.state();
        let force = self.steering.compute_force(&state, obstacles);

        let acceleration = force / self.mass.max(EPSILON);
        self.velocity += acceleration * delta;

        if self.velocity.length_squared() > self.max_speed * self.max_speed {
            self.velocity = self.velocity.normalize() * self.max_speed;
        }

        self.position += self.velocity * delta;

        // Discrete force changes make the raw heading jitter; the smoother
        // averages it over a fixed window before it drives the orientation.
        let heading = match &mut self.smoother {
            Some(smoother) => smoother.calculate(self.velocity),
            None => self.velocity,
        };

        if heading.length_squared() > EPSILON * EPSILON {
            self.rotation = look_rotation(heading.normalize());
        }
    }
}

/// Orientation with +Z facing `forward` and +Y kept as close to world up
/// as possible. A full basis avoids the ambiguity of a shortest-arc
/// rotation, which picks an arbitrary roll for a reversed heading.
/// `forward` must be normalized and non-degenerate.
fn look_rotation(forward: DVec3) -> DQuat {
    let mut up = DVec3::Y;
    // Near-vertical heading: world up is unusable as a reference.
    if forward.dot(up).abs() > 0.97 {
        up = DVec3::Z;
    }
    let right = up.cross(forward).normalize();
    let up = forward.cross(right);
    DQuat::from_mat3(&DMat3::from_cols(right, up, forward))
}

/// Fixed-window moving average over velocity samples. One sample is fed
/// per tick, so the window size is effectively a smoothing duration in
/// frames, chosen at construction.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Smoother {
    window: usize,
    samples: Vec<DVec3>,
    head: usize,
}

impl Smoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: Vec::with_capacity(window),
            head: 0,
        }
    }

    /// Records one sample and returns the average over the window. Until
    /// the window fills, the average runs over the samples seen so far.
    pub fn calculate(&mut self, sample: DVec3) -> DVec3 {
        if self.samples.len() < self.window {
            self.samples.push(sample);
        } else {
            self.samples[self.head] = sample;
            self.head = (self.head + 1) % self.window;
        }

        let sum = self.samples.iter().fold(DVec3::ZERO, |acc, &s| acc + s);
        sum / self.samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use crate::steering::behavior::{Behavior, FollowPathBehavior};

    fn vehicle_with_target(target: DVec3) -> Vehicle {
        let mut vehicle = Vehicle::new(0, DVec3::ZERO, 3.0, 10.0, 1.0);
        let mut path = Path::new(true);
        path.add(target).unwrap();
        path.add(target + DVec3::X * 10.0).unwrap();
        vehicle
            .steering
            .add(Behavior::FollowPath(FollowPathBehavior::new(path, 1.0)));
        vehicle
    }

    #[test]
    fn speed_never_exceeds_max_speed() {
        let mut vehicle = vehicle_with_target(DVec3::new(0.0, 0.0, 100.0));
        let obstacles = ObstacleRegistry::new();

        // Large deltas push hard against the clamp.
        for _ in 0..200 {
            vehicle.update(0.25, &obstacles);
            assert!(vehicle.velocity.length() <= vehicle.max_speed + 1.0e-9);
        }
    }

    #[test]
    fn zero_delta_leaves_state_unchanged() {
        let mut vehicle = vehicle_with_target(DVec3::new(0.0, 0.0, 100.0));
        let obstacles = ObstacleRegistry::new();

        let position = vehicle.position;
        let velocity = vehicle.velocity;
        vehicle.update(0.0, &obstacles);
        assert_eq!(vehicle.position, position);
        assert_eq!(vehicle.velocity, velocity);
    }

    #[test]
    fn orientation_is_retained_while_stationary() {
        let mut vehicle = Vehicle::new(0, DVec3::ZERO, 3.0, 10.0, 1.0);
        let obstacles = ObstacleRegistry::new();

        let rotation = vehicle.rotation;
        vehicle.update(1.0 / 60.0, &obstacles);
        assert_eq!(vehicle.rotation, rotation);
    }

    #[test]
    fn moving_vehicle_faces_its_velocity() {
        let mut vehicle = vehicle_with_target(DVec3::new(0.0, 0.0, 100.0));
        let obstacles = ObstacleRegistry::new();

        for _ in 0..30 {
            vehicle.update(1.0 / 60.0, &obstacles);
        }

        let forward = vehicle.rotation * DVec3::Z;
        let cos = forward.dot(vehicle.velocity.normalize());
        assert!(cos > 0.999, "vehicle is not facing its velocity: {cos}");
    }

    #[test]
    fn reversed_heading_keeps_the_vehicle_upright() {
        let rotation = look_rotation(DVec3::new(0.0, 0.0, -1.0));
        let up = rotation * DVec3::Y;
        assert!(up.dot(DVec3::Y) > 0.999, "vehicle rolled: {up:?}");
        let forward = rotation * DVec3::Z;
        assert!(forward.dot(DVec3::new(0.0, 0.0, -1.0)) > 0.999);
    }

    #[test]
    fn smoother_averages_over_its_window() {
        let mut smoother = Smoother::new(2);
        assert_eq!(smoother.calculate(DVec3::new(2.0, 0.0, 0.0)), DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(smoother.calculate(DVec3::new(0.0, 0.0, 0.0)), DVec3::new(1.0, 0.0, 0.0));
        // Window is full: the oldest sample falls out.
        assert_eq!(smoother.calculate(DVec3::new(4.0, 0.0, 0.0)), DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(smoother.calculate(DVec3::new(4.0, 0.0, 0.0)), DVec3::new(4.0, 0.0, 0.0));
    }
}
