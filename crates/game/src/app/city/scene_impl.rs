use std::time::Duration;

use engine::{
    DrawList, InputAction, InputSnapshot, IsoProjection, Rgba, Scene, SceneCommand, Vec2,
    Viewport,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::camera::CameraController;
use super::config::SimConfig;
use super::draw::{draw_city, CityFrame, FrameView};
use super::frame_scale;
use super::host::{JobCompletion, MovementNotification, SimHost};
use super::movement::{Avatar, CharacterMovement, SPRINT_MULTIPLIER};
use super::npc::{NpcManager, NPC_PICK_RADIUS};
use super::particles::ParticleSystem;

pub(crate) const SPRINT_ENERGY_REQUEST_INTERVAL_MS: f64 = 400.0;
pub(crate) const SPRINT_ENERGY_COST: f32 = 1.0;
pub(crate) const JOB_MARKER_PICK_RADIUS: f32 = 12.0;
pub(crate) const PROPERTY_PICK_RADIUS: f32 = 15.0;
const CITY_SYSTEM_ORDER_TEXT: &str = "Input>Movement>Camera>Npcs>Particles";
const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 1280,
    height: 720,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CitySystemId {
    Input,
    Movement,
    Camera,
    Npcs,
    Particles,
}

pub(crate) const CITY_SYSTEM_ORDER: [CitySystemId; 5] = [
    CitySystemId::Input,
    CitySystemId::Movement,
    CitySystemId::Camera,
    CitySystemId::Npcs,
    CitySystemId::Particles,
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ActiveJob {
    pub(crate) name: String,
    pub(crate) position: Vec2,
    pub(crate) started_at_ms: f64,
    pub(crate) duration_ms: f64,
}

pub(crate) struct CityScene {
    config: SimConfig,
    projection: IsoProjection,
    host: Box<dyn SimHost>,
    avatar: Avatar,
    movement: CharacterMovement,
    camera: CameraController,
    npcs: NpcManager,
    particles: ParticleSystem,
    sim_time_ms: f64,
    last_energy_request_ms: Option<f64>,
    sprinting: bool,
    active_job: Option<ActiveJob>,
    selected_property: Option<String>,
    selected_npc: Option<u32>,
    follow_key_was_down: bool,
    viewport: Viewport,
    hovered_world: Option<Vec2>,
    last_tick_order: Vec<CitySystemId>,
}

impl CityScene {
    pub(crate) fn new(config: SimConfig, host: Box<dyn SimHost>) -> Self {
        let config = config.sanitized();
        let (npc_rng, particle_rng) = match config.rng_seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };
        let projection = IsoProjection {
            tile_width: config.tile_width,
            grid_width: config.iso_grid_width,
            grid_height: config.iso_grid_height,
            map_width: config.map_width,
            map_height: config.map_height,
        };
        let start = config.start_position.to_vec2();

        Self {
            projection,
            host,
            avatar: Avatar::new(start, config.avatar_colors()),
            movement: CharacterMovement::new(config.map_width, config.map_height, config.grid_size),
            camera: CameraController::new(start, config.map_width, config.map_height),
            npcs: NpcManager::new(&config, npc_rng),
            particles: ParticleSystem::new(particle_rng),
            sim_time_ms: 0.0,
            last_energy_request_ms: None,
            sprinting: false,
            active_job: None,
            selected_property: None,
            selected_npc: None,
            follow_key_was_down: false,
            viewport: DEFAULT_VIEWPORT,
            hovered_world: None,
            last_tick_order: Vec::with_capacity(CITY_SYSTEM_ORDER.len()),
            config,
        }
    }

    fn frame_view(&self, viewport: Viewport) -> FrameView {
        FrameView::new(
            self.projection,
            self.camera.position(),
            self.camera.zoom(),
            viewport,
        )
    }

    fn run_system(&mut self, system: CitySystemId, input: &InputSnapshot, dt_seconds: f32) {
        let scale = frame_scale(dt_seconds);
        match system {
            CitySystemId::Input => self.apply_input(input),
            CitySystemId::Movement => self.advance_avatar(input, scale),
            CitySystemId::Camera => self.camera.update(self.avatar.position, scale),
            CitySystemId::Npcs => self.npcs.update(dt_seconds, self.sim_time_ms, scale),
            CitySystemId::Particles => self.advance_particles(dt_seconds, scale),
        }
    }

    fn apply_input(&mut self, input: &InputSnapshot) {
        let (width, height) = input.window_size();
        if width > 0 && height > 0 {
            self.viewport = Viewport { width, height };
        }

        self.camera.step_zoom(input.zoom_delta_steps());
        self.camera.apply_wheel(input.wheel_delta());

        let follow_down = input.is_down(InputAction::FollowCamera);
        if follow_down && !self.follow_key_was_down {
            self.camera.set_follow(true);
            debug!("camera_follow_enabled");
        }
        self.follow_key_was_down = follow_down;

        if input.dragging() {
            // Content tracks the pointer, so the camera moves the other way.
            let zoom = self.camera.zoom().max(f32::EPSILON);
            let iso_delta = input.drag_delta_px() * (-1.0 / zoom);
            let world_delta = self.projection.isometric_to_game(iso_delta);
            self.camera.pan_by(world_delta);
        }

        if let Some(click_px) = input.click_position_px() {
            let world = self.frame_view(self.viewport).screen_to_world(click_px);
            self.handle_click(world);
        }

        let view = self.frame_view(self.viewport);
        self.hovered_world = input
            .cursor_position_px()
            .map(|cursor_px| view.screen_to_world(cursor_px))
            .filter(|world| world.is_finite());
    }

    /// Resolves a click in world space. Job markers win over properties,
    /// properties over NPCs; anything else is a move command.
    fn handle_click(&mut self, world: Vec2) {
        if !world.is_finite() {
            return;
        }
        if let Some(site) = nearest_within(
            self.config.job_sites.iter().map(|site| (site, site.position.to_vec2())),
            world,
            JOB_MARKER_PICK_RADIUS,
        ) {
            debug!(job = %site.name, venue = %site.venue, "job_marker_clicked");
            let (name, position) = (site.name.clone(), site.position.to_vec2());
            self.start_job(name, position);
            return;
        }

        if let Some(site) = nearest_within(
            self.config
                .property_sites
                .iter()
                .map(|site| (site, site.position.to_vec2())),
            world,
            PROPERTY_PICK_RADIUS,
        ) {
            debug!(property = %site.id, name = %site.name, kind = ?site.kind, "property_clicked");
            let (id, position) = (site.id.clone(), site.position.to_vec2());
            self.host.on_property_selected(&id);
            self.camera.look_at(position);
            self.selected_property = Some(id);
            return;
        }

        if let Some(npc) = self.npcs.npc_at(world, NPC_PICK_RADIUS) {
            debug!(npc_id = npc.id, job = ?npc.job_name, "npc_clicked");
            self.host.on_npc_selected(npc.id, npc.name);
            self.selected_npc = Some(npc.id);
            return;
        }

        self.movement.move_to(self.avatar.position, world);
    }

    fn start_job(&mut self, name: String, position: Vec2) {
        if let Some(job) = &self.active_job {
            debug!(active = %job.name, requested = %name, "job_click_ignored_while_working");
            return;
        }
        let Some(duration) = self.host.on_job_marker_clicked(&name) else {
            info!(job = %name, "job_declined_by_host");
            return;
        };
        self.movement.move_to(self.avatar.position, position);
        self.active_job = Some(ActiveJob {
            name,
            position,
            started_at_ms: self.sim_time_ms,
            duration_ms: duration_to_ms(duration),
        });
    }

    fn advance_avatar(&mut self, input: &InputSnapshot, scale: f32) {
        let axis = input.movement_axis();
        let wants_to_move = !axis.is_zero() || self.avatar.moving;
        let sprinting =
            input.is_down(InputAction::Sprint) && wants_to_move && self.host.energy() > 0.0;
        if sprinting && self.energy_request_due() {
            self.host.on_energy_consumed(SPRINT_ENERGY_COST);
            self.last_energy_request_ms = Some(self.sim_time_ms);
        }
        let multiplier = if sprinting { SPRINT_MULTIPLIER } else { 1.0 };

        let step = self.movement.update(&mut self.avatar, axis, multiplier, scale);
        self.sprinting = sprinting && self.avatar.moving;
        if step.position_changed {
            self.notify_avatar_moved();
        }
        if step.arrived {
            debug!(
                x = self.avatar.position.x,
                y = self.avatar.position.y,
                "avatar_arrived"
            );
        }

        self.finish_job_if_due();
    }

    fn energy_request_due(&self) -> bool {
        match self.last_energy_request_ms {
            Some(last) => self.sim_time_ms - last >= SPRINT_ENERGY_REQUEST_INTERVAL_MS,
            None => true,
        }
    }

    fn notify_avatar_moved(&mut self) {
        let position = self.avatar.position;
        let geo = self.host.geo_for(&self.config.city, position);
        let notification = MovementNotification {
            x: position.x,
            y: position.y,
            lat: geo.map(|point| point.lat),
            lng: geo.map(|point| point.lng),
            city: self.config.city.clone(),
        };
        self.host.on_avatar_moved(&notification);
    }

    fn finish_job_if_due(&mut self) {
        let due = self
            .active_job
            .as_ref()
            .is_some_and(|job| self.sim_time_ms - job.started_at_ms >= job.duration_ms);
        if !due {
            return;
        }
        if let Some(job) = self.active_job.take() {
            self.host.on_job_completed(&JobCompletion {
                job_name: job.name,
                duration_ms: job.duration_ms.round() as u64,
            });
        }
    }

    fn advance_particles(&mut self, dt_seconds: f32, scale: f32) {
        let now = self.sim_time_ms;
        self.particles.update(dt_seconds);
        self.particles.emit_ambient(
            Vec2::new(self.config.map_width, self.config.map_height),
            scale,
            now,
        );
        self.particles
            .emit_footsteps(self.avatar.position, self.avatar.moving, scale, now);
        if self.sprinting {
            self.particles
                .emit_sprint_trail(self.avatar.position, self.avatar.velocity, now);
        }
        if let Some(job) = &self.active_job {
            self.particles.emit_work_sparks(job.position, scale, now);
        }
    }

    #[cfg(test)]
    pub(crate) fn last_tick_order(&self) -> &[CitySystemId] {
        &self.last_tick_order
    }

    #[cfg(test)]
    pub(crate) fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    #[cfg(test)]
    pub(crate) fn camera(&self) -> &CameraController {
        &self.camera
    }

    #[cfg(test)]
    pub(crate) fn npcs(&self) -> &NpcManager {
        &self.npcs
    }

    #[cfg(test)]
    pub(crate) fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    #[cfg(test)]
    pub(crate) fn movement(&self) -> &CharacterMovement {
        &self.movement
    }

    #[cfg(test)]
    pub(crate) fn active_job(&self) -> Option<&ActiveJob> {
        self.active_job.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn selected_property(&self) -> Option<&str> {
        self.selected_property.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn selected_npc(&self) -> Option<u32> {
        self.selected_npc
    }

    #[cfg(test)]
    pub(crate) fn hovered_world(&self) -> Option<Vec2> {
        self.hovered_world
    }

    #[cfg(test)]
    pub(crate) fn is_sprinting(&self) -> bool {
        self.sprinting
    }

    #[cfg(test)]
    pub(crate) fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.frame_view(self.viewport).world_to_screen(world)
    }
}

impl Scene for CityScene {
    fn load(&mut self) {
        info!(
            city = %self.config.city,
            npc_count = self.npcs.agents().len(),
            job_sites = self.config.job_sites.len(),
            property_sites = self.config.property_sites.len(),
            sys = CITY_SYSTEM_ORDER_TEXT,
            "scene_loaded"
        );
    }

    fn update(&mut self, dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        let dt_seconds = if dt_seconds.is_finite() && dt_seconds > 0.0 {
            dt_seconds
        } else {
            0.0
        };
        let dt_ms = dt_seconds * 1_000.0;

        self.host.advance(dt_ms, self.sprinting);
        self.sim_time_ms += f64::from(dt_ms);

        self.last_tick_order.clear();
        for system in CITY_SYSTEM_ORDER {
            self.last_tick_order.push(system);
            self.run_system(system, input, dt_seconds);
        }
        SceneCommand::None
    }

    fn render(&self, viewport: Viewport, draw_list: &mut DrawList) {
        let frame = CityFrame {
            view: self.frame_view(viewport),
            job_sites: &self.config.job_sites,
            property_sites: &self.config.property_sites,
            active_job: self.active_job.as_ref().map(|job| job.name.as_str()),
            selected_property: self.selected_property.as_deref(),
            selected_npc: self.selected_npc,
            events: self.npcs.active_events(),
            now_ms: self.sim_time_ms,
            npcs: self.npcs.agents(),
            avatar: &self.avatar,
            path: self.movement.path(),
            particles: self.particles.particles(),
        };
        draw_city(&frame, draw_list);
    }

    fn unload(&mut self) {
        info!(
            sim_time_ms = self.sim_time_ms,
            events_seen = self.npcs.event_history().count(),
            "scene_unloaded"
        );
    }

    fn clear_color(&self) -> Rgba {
        Rgba::opaque(0x1b, 0x26, 0x33)
    }

    fn debug_title(&self) -> Option<String> {
        let job = match &self.active_job {
            Some(job) => format!(
                " | working: {} {:.0}%",
                job.name,
                ((self.sim_time_ms - job.started_at_ms) / job.duration_ms.max(1.0) * 100.0)
                    .clamp(0.0, 100.0)
            ),
            None => String::new(),
        };
        let cursor = match self.hovered_world {
            Some(world) => format!(" | cursor ({:.0}, {:.0})", world.x, world.y),
            None => String::new(),
        };
        Some(format!(
            "Iso City | {} | pos ({:.0}, {:.0}) | energy {:.0} | zoom {:.2} | cam {}{}{}",
            self.config.city,
            self.avatar.position.x,
            self.avatar.position.y,
            self.host.energy(),
            self.camera.zoom(),
            if self.camera.is_following() {
                "follow"
            } else {
                "free"
            },
            cursor,
            job
        ))
    }
}

fn nearest_within<'a, T>(
    candidates: impl Iterator<Item = (&'a T, Vec2)>,
    point: Vec2,
    radius: f32,
) -> Option<&'a T>
where
    T: 'a,
{
    candidates
        .map(|(item, position)| (item, position.distance(point)))
        .filter(|(_, distance)| *distance < radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(item, _)| item)
}

fn duration_to_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}
