use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A static obstacle approximated by its bounding sphere.
/// Immutable after creation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct Obstacle {
    pub id: u32,
    pub position: DVec3,
    pub bounding_radius: f64,
}

/// Flat collection of static obstacles, filled at scene setup and
/// read-only during simulation. Obstacles never move, so avoidance
/// behaviors of any number of vehicles can query it each tick without
/// coordination.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ObstacleRegistry {
    obstacles: Vec<Obstacle>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self {
            obstacles: Vec::new(),
        }
    }

    pub fn add(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}
