use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::obstacle::ObstacleRegistry;
use crate::steering::behavior::Behavior;
use crate::vehicle::VehicleState;

/// Combines the forces of one vehicle's behaviors into a single steering
/// vector. Owned by exactly one vehicle; evaluation order is insertion
/// order, which doubles as the priority order under truncation.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SteeringManager {
    behaviors: Vec<Behavior>,
}

impl SteeringManager {
    pub fn new() -> Self {
        Self {
            behaviors: Vec::new(),
        }
    }

    pub fn add(&mut self, behavior: Behavior) {
        self.behaviors.push(behavior);
    }

    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    /// Weighted truncated running sum: each behavior's force (scaled by its
    /// weight) is added until the running sum's magnitude reaches the
    /// vehicle's max force, at which point only the remaining magnitude is
    /// taken and accumulation stops. Earlier behaviors therefore cannot be
    /// diluted by later ones.
    ///
    /// Never fails; with no behaviors attached the result is a zero vector.
    pub fn compute_force(&mut self, state: &VehicleState, obstacles: &ObstacleRegistry) -> DVec3 {
        let mut total = DVec3::ZERO;

        for behavior in &mut self.behaviors {
            let force = behavior.calculate(state, obstacles) * behavior.weight();
            if !accumulate(&mut total, force, state.max_force) {
                break;
            }
        }

        total
    }
}

// Adds `force` onto `total` without letting the sum's magnitude exceed
// `max_force`. Returns false once the budget is exhausted.
fn accumulate(total: &mut DVec3, force: DVec3, max_force: f64) -> bool {
    let remaining = max_force - total.length();
    if remaining <= 0.0 {
        return false;
    }

    if force.length() <= remaining {
        *total += force;
    } else {
        *total += force.normalize_or_zero() * remaining;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use crate::steering::behavior::FollowPathBehavior;
    use glam::DQuat;

    fn state() -> VehicleState {
        VehicleState {
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            max_speed: 3.0,
            max_force: 10.0,
            bounding_radius: 1.0,
        }
    }

    fn follow_path_toward(target: DVec3) -> Behavior {
        let mut path = Path::new(true);
        path.add(target).unwrap();
        path.add(target + DVec3::X).unwrap();
        Behavior::FollowPath(FollowPathBehavior::new(path, 1.0))
    }

    #[test]
    fn no_behaviors_yields_zero_force() {
        let mut manager = SteeringManager::new();
        let force = manager.compute_force(&state(), &ObstacleRegistry::new());
        assert_eq!(force, DVec3::ZERO);
    }

    #[test]
    fn compute_force_is_idempotent_for_fixed_state() {
        let mut manager = SteeringManager::new();
        manager.add(follow_path_toward(DVec3::new(0.0, 0.0, 50.0)));

        let s = state();
        let obstacles = ObstacleRegistry::new();
        let first = manager.compute_force(&s, &obstacles);
        let second = manager.compute_force(&s, &obstacles);
        assert!((first - second).length() < 1.0e-12);
    }

    #[test]
    fn total_force_never_exceeds_max_force() {
        let mut manager = SteeringManager::new();
        // Several behaviors all pulling the same way.
        for _ in 0..5 {
            manager.add(follow_path_toward(DVec3::new(0.0, 0.0, 100.0)));
        }

        let mut s = state();
        s.max_force = 2.5;
        let force = manager.compute_force(&s, &ObstacleRegistry::new());
        assert!(force.length() <= 2.5 + 1.0e-9);
    }

    #[test]
    fn earlier_behaviors_take_priority_under_truncation() {
        let mut manager = SteeringManager::new();
        manager.add(follow_path_toward(DVec3::new(0.0, 0.0, 100.0)));
        manager.add(follow_path_toward(DVec3::new(100.0, 0.0, 0.0)));

        // Budget fits the first behavior's force (magnitude max_speed = 3)
        // with nothing left over, so the second cannot bend the result.
        let mut s = state();
        s.max_force = 3.0;
        let force = manager.compute_force(&s, &ObstacleRegistry::new());
        let cos = force.normalize().dot(DVec3::Z);
        assert!(cos > 0.999, "later behavior leaked into the sum: {cos}");
    }

    #[test]
    fn accumulate_adds_partial_force_at_the_cap() {
        let mut total = DVec3::new(0.0, 0.0, 4.0);
        let more = accumulate(&mut total, DVec3::new(0.0, 0.0, 10.0), 5.0);
        assert!(more);
        assert!((total.length() - 5.0).abs() < 1.0e-9);

        // Budget now spent.
        let more = accumulate(&mut total, DVec3::new(1.0, 0.0, 0.0), 5.0);
        assert!(!more);
    }
}
