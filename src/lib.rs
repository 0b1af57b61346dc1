pub mod error;
pub mod math;
pub mod obstacle;
pub mod path;
pub mod steering;
pub mod vehicle;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::error::SteeringError;
use crate::math::SimVector;
use crate::obstacle::{Obstacle, ObstacleRegistry};
use crate::path::Path;
use crate::steering::behavior::{Behavior, FollowPathBehavior, ObstacleAvoidanceBehavior};
use crate::vehicle::{Smoother, Vehicle};

/// Longest tick the core will integrate. Frame hitches can hand us
/// multi-second deltas; integrating those in one step destabilizes the
/// steering forces, so anything longer is cut to this.
pub const MAX_DELTA: f64 = 0.25;

// --- SNAPSHOT STRUCT ---
// The entire "save state" of the simulation. Serialize/Deserialize lets us
// pass it to JS as a JSON-like object and restore it later.
#[derive(Serialize, Deserialize)]
pub struct SimSnapshot {
    pub tick_count: u64,
    pub vehicles: Vec<Vehicle>,
    pub obstacles: ObstacleRegistry,
}

// --- MAIN SIMULATION STRUCT ---
#[wasm_bindgen]
pub struct Simulation {
    tick_count: u64,

    // Parallel raw buffer for fast transform export to JS.
    // Layout: [id, px, py, pz, qx, qy, qz, qw, sx, sy, sz, ...repeat...]
    export_buffer: Vec<f64>,

    // Systems
    vehicles: Vec<Vehicle>,
    obstacles: ObstacleRegistry,
}

/// Floats per vehicle in the export buffer: id, position, quaternion, scale.
pub const EXPORT_STRIDE: usize = 11;

#[wasm_bindgen]
impl Simulation {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Simulation {
        // Panic hook for better error logging in the browser console.
        console_error_panic_hook::set_once();

        Simulation {
            tick_count: 0,
            export_buffer: Vec::new(),
            vehicles: Vec::new(),
            obstacles: ObstacleRegistry::new(),
        }
    }

    // --- SCENE SETUP ---

    pub fn add_vehicle(
        &mut self,
        id: u32,
        x: f64,
        y: f64,
        z: f64,
        max_speed: f64,
        max_force: f64,
        bounding_radius: f64,
    ) {
        self.vehicles.push(Vehicle::new(
            id,
            DVec3::new(x, y, z),
            max_speed,
            max_force,
            bounding_radius,
        ));
    }

    pub fn add_obstacle(&mut self, id: u32, x: f64, y: f64, z: f64, bounding_radius: f64) {
        self.obstacles.add(Obstacle {
            id,
            position: DVec3::new(x, y, z),
            bounding_radius,
        });
    }

    pub fn set_vehicle_scale(&mut self, id: u32, x: f64, y: f64, z: f64) -> Result<(), JsValue> {
        let vehicle = self.vehicle_mut(id)?;
        vehicle.scale = DVec3::new(x, y, z);
        Ok(())
    }

    /// Attaches a fixed-window orientation smoother (window in frames).
    pub fn set_vehicle_smoother(&mut self, id: u32, window: usize) -> Result<(), JsValue> {
        let vehicle = self.vehicle_mut(id)?;
        vehicle.smoother = Some(Smoother::new(window));
        Ok(())
    }

    /// Wires a follow-path behavior onto a vehicle and snaps the vehicle to
    /// the route's first waypoint, the way the demo scene starts.
    ///
    /// `waypoints_json` is a JSON array of `{x, y, z}` objects. An empty
    /// route is a setup error: it would only ever produce zero forces.
    pub fn attach_follow_path(
        &mut self,
        id: u32,
        waypoints_json: String,
        looped: bool,
        arrival_radius: f64,
    ) -> Result<(), JsValue> {
        let waypoints: Vec<SimVector> =
            serde_json::from_str(&waypoints_json).map_err(|e| JsValue::from_str(&e.to_string()))?;

        let mut path = Path::new(looped);
        for waypoint in waypoints {
            path.add(waypoint.to_glam()).map_err(err_to_js)?;
        }
        let start = path.current().map_err(err_to_js)?;

        let vehicle = self.vehicle_mut(id)?;
        vehicle.position = start;
        vehicle
            .steering
            .add(Behavior::FollowPath(FollowPathBehavior::new(
                path,
                arrival_radius,
            )));
        Ok(())
    }

    pub fn attach_obstacle_avoidance(
        &mut self,
        id: u32,
        min_detection_length: f64,
    ) -> Result<(), JsValue> {
        let vehicle = self.vehicle_mut(id)?;
        vehicle
            .steering
            .add(Behavior::ObstacleAvoidance(ObstacleAvoidanceBehavior::new(
                min_detection_length,
            )));
        Ok(())
    }

    // --- THE MAIN LOOP ---

    /// Advances every vehicle by `delta` seconds. Called once per rendered
    /// frame by the host's animation loop; the host reads the export buffer
    /// afterwards to sync visual transforms.
    pub fn tick(&mut self, delta: f64) {
        self.tick_count += 1;

        // Wall-clock deltas are untrusted: NaN integrates as zero, and a
        // frame hitch is cut to MAX_DELTA rather than integrated whole.
        let delta = if delta.is_finite() {
            delta.clamp(0.0, MAX_DELTA)
        } else {
            0.0
        };

        let obstacles = &self.obstacles;
        for vehicle in &mut self.vehicles {
            vehicle.update(delta, obstacles);
        }

        self.rebuild_export_buffer();
    }

    // --- RENDER-LAYER READBACK ---

    /// Returns a vehicle's route waypoints (flattened [x, y, z, ...]) so
    /// the host can draw the path. Empty if the vehicle has no route.
    pub fn get_path_waypoints(&self, id: u32) -> Vec<f64> {
        let Some(vehicle) = self.vehicles.iter().find(|v| v.id == id) else {
            return Vec::new();
        };

        for behavior in vehicle.steering.behaviors() {
            if let Behavior::FollowPath(follow) = behavior {
                let mut flat = Vec::with_capacity(follow.path.waypoints().len() * 3);
                for w in follow.path.waypoints() {
                    flat.extend_from_slice(&[w.x, w.y, w.z]);
                }
                return flat;
            }
        }
        Vec::new()
    }

    // --- SNAPSHOTS ---

    /// Serializes the entire simulation state into a JS object.
    pub fn get_snapshot(&self) -> JsValue {
        let snap = SimSnapshot {
            tick_count: self.tick_count,
            vehicles: self.vehicles.clone(),
            obstacles: self.obstacles.clone(),
        };
        serde_wasm_bindgen::to_value(&snap).unwrap_or(JsValue::NULL)
    }

    /// Restores the simulation state from a JS object.
    pub fn load_snapshot(&mut self, val: JsValue) -> Result<(), JsValue> {
        let snap: SimSnapshot =
            serde_wasm_bindgen::from_value(val).map_err(|e| JsValue::from_str(&e.to_string()))?;

        self.tick_count = snap.tick_count;
        self.vehicles = snap.vehicles;
        self.obstacles = snap.obstacles;

        // Rebuild the export buffer immediately. Otherwise the renderer
        // reads an empty buffer for one frame and every visual flickers.
        self.rebuild_export_buffer();
        Ok(())
    }

    // --- ZERO-COPY MEMORY INTEROP ---

    /// Pointer to the start of the Float64Array in wasm memory.
    pub fn get_state_ptr(&self) -> *const f64 {
        self.export_buffer.as_ptr()
    }

    /// Length (element count) of the buffer.
    pub fn get_state_len(&self) -> usize {
        self.export_buffer.len()
    }

    // --- INTERNAL HELPERS ---

    fn rebuild_export_buffer(&mut self) {
        self.export_buffer.clear();
        self.export_buffer
            .reserve(self.vehicles.len() * EXPORT_STRIDE);

        for vehicle in &self.vehicles {
            self.export_buffer.push(vehicle.id as f64);
            self.export_buffer.push(vehicle.position.x);
            self.export_buffer.push(vehicle.position.y);
            self.export_buffer.push(vehicle.position.z);
            self.export_buffer.push(vehicle.rotation.x);
            self.export_buffer.push(vehicle.rotation.y);
            self.export_buffer.push(vehicle.rotation.z);
            self.export_buffer.push(vehicle.rotation.w);
            self.export_buffer.push(vehicle.scale.x);
            self.export_buffer.push(vehicle.scale.y);
            self.export_buffer.push(vehicle.scale.z);
        }
    }

    fn vehicle_mut(&mut self, id: u32) -> Result<&mut Vehicle, JsValue> {
        self.vehicles
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| err_to_js(SteeringError::UnknownVehicle(id)))
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

fn err_to_js(err: SteeringError) -> JsValue {
    JsValue::from_str(&err.to_string())
}
