use std::time::Duration;

use engine::Vec2;
use tracing::{debug, info};

use super::config::{CityBounds, SimConfig};

pub(crate) const MAX_ENERGY: f32 = 100.0;
const ENERGY_REGEN_INTERVAL_MS: f32 = 2_000.0;
const LOCAL_JOB_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GeoPoint {
    pub(crate) lat: f64,
    pub(crate) lng: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MovementNotification {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) lat: Option<f64>,
    pub(crate) lng: Option<f64>,
    pub(crate) city: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JobCompletion {
    pub(crate) job_name: String,
    pub(crate) duration_ms: u64,
}

/// Everything the simulation needs from the outside world. Calls are made
/// synchronously from inside a tick.
pub(crate) trait SimHost {
    fn energy(&self) -> f32;
    fn geo_for(&self, city: &str, position: Vec2) -> Option<GeoPoint>;
    fn on_avatar_moved(&mut self, notification: &MovementNotification);
    fn on_energy_consumed(&mut self, units: f32);
    /// Returns how long the job takes when the host accepts it.
    fn on_job_marker_clicked(&mut self, job_name: &str) -> Option<Duration>;
    fn on_job_completed(&mut self, completion: &JobCompletion);
    fn on_property_selected(&mut self, property_id: &str);
    fn on_npc_selected(&mut self, _npc_id: u32, _npc_name: &str) {}
    /// Called once per tick before any other system runs.
    fn advance(&mut self, _dt_ms: f32, _sprinting: bool) {}
}

/// Self-contained host used by the desktop binary.
#[derive(Debug, Clone)]
pub(crate) struct LocalHost {
    city: String,
    bounds: CityBounds,
    map_width: f32,
    map_height: f32,
    energy: f32,
    regen_elapsed_ms: f32,
    completed_jobs: u32,
}

impl LocalHost {
    pub(crate) fn new(config: &SimConfig) -> Self {
        Self {
            city: config.city.clone(),
            bounds: config.city_bounds,
            map_width: config.map_width,
            map_height: config.map_height,
            energy: MAX_ENERGY,
            regen_elapsed_ms: 0.0,
            completed_jobs: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn completed_jobs(&self) -> u32 {
        self.completed_jobs
    }
}

impl SimHost for LocalHost {
    fn energy(&self) -> f32 {
        self.energy
    }

    fn geo_for(&self, city: &str, position: Vec2) -> Option<GeoPoint> {
        if !city.eq_ignore_ascii_case(&self.city) || !position.is_finite() {
            return None;
        }
        let fx = (position.x / self.map_width).clamp(0.0, 1.0) as f64;
        let fy = (position.y / self.map_height).clamp(0.0, 1.0) as f64;
        Some(GeoPoint {
            lat: self.bounds.north - fy * (self.bounds.north - self.bounds.south),
            lng: self.bounds.west + fx * (self.bounds.east - self.bounds.west),
        })
    }

    fn on_avatar_moved(&mut self, notification: &MovementNotification) {
        debug!(
            x = notification.x,
            y = notification.y,
            lat = ?notification.lat,
            lng = ?notification.lng,
            city = %notification.city,
            "avatar_moved"
        );
    }

    fn on_energy_consumed(&mut self, units: f32) {
        self.energy = (self.energy - units.max(0.0)).max(0.0);
        debug!(units, energy = self.energy, "energy_consumed");
    }

    fn on_job_marker_clicked(&mut self, job_name: &str) -> Option<Duration> {
        info!(job = job_name, "job_started");
        Some(LOCAL_JOB_DURATION)
    }

    fn on_job_completed(&mut self, completion: &JobCompletion) {
        self.completed_jobs = self.completed_jobs.saturating_add(1);
        info!(
            job = %completion.job_name,
            duration_ms = completion.duration_ms,
            completed_jobs = self.completed_jobs,
            "job_completed"
        );
    }

    fn on_property_selected(&mut self, property_id: &str) {
        info!(property = property_id, "property_selected");
    }

    fn on_npc_selected(&mut self, npc_id: u32, npc_name: &str) {
        info!(npc_id, npc = npc_name, "npc_selected");
    }

    fn advance(&mut self, dt_ms: f32, sprinting: bool) {
        if sprinting || !(dt_ms > 0.0) {
            return;
        }
        if self.energy >= MAX_ENERGY {
            self.regen_elapsed_ms = 0.0;
            return;
        }
        self.regen_elapsed_ms += dt_ms;
        while self.regen_elapsed_ms >= ENERGY_REGEN_INTERVAL_MS {
            self.regen_elapsed_ms -= ENERGY_REGEN_INTERVAL_MS;
            self.energy = (self.energy + 1.0).min(MAX_ENERGY);
        }
    }
}
