use engine::Vec2;
use tracing::debug;

use super::config::AvatarColors;
use super::nav::{NavigationPath, PathfindingEngine};
use super::smoothing_alpha;

pub(crate) const ACCELERATION: f32 = 0.8;
pub(crate) const FRICTION: f32 = 0.8;
pub(crate) const MAX_SPEED: f32 = 10.0;
pub(crate) const PATH_SPEED: f32 = 6.0;
pub(crate) const ROTATION_RATE: f32 = 0.2;
pub(crate) const VELOCITY_SNAP_THRESHOLD: f32 = 0.1;
pub(crate) const ARRIVAL_RADIUS: f32 = 10.0;
pub(crate) const SPRINT_MULTIPLIER: f32 = 2.2;

/// Player-controlled character. Velocity is in world units per reference
/// frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Avatar {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) angle_degrees: f32,
    pub(crate) moving: bool,
    pub(crate) colors: AvatarColors,
}

impl Avatar {
    pub(crate) fn new(position: Vec2, colors: AvatarColors) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            angle_degrees: 0.0,
            moving: false,
            colors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct MovementStep {
    pub(crate) position_changed: bool,
    pub(crate) arrived: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct CharacterMovement {
    pathfinder: PathfindingEngine,
    path: Option<NavigationPath>,
    map_width: f32,
    map_height: f32,
}

impl CharacterMovement {
    pub(crate) fn new(map_width: f32, map_height: f32, grid_size: f32) -> Self {
        let pathfinder = PathfindingEngine::new(map_width, map_height, grid_size);
        let (columns, rows) = pathfinder.grid_dimensions();
        debug!(columns, rows, cell_size = grid_size, "nav_grid_ready");
        Self {
            pathfinder,
            path: None,
            map_width,
            map_height,
        }
    }

    /// Plans a route from `from` to the clamped target. An unreachable target
    /// leaves the current path untouched and returns `false`.
    pub(crate) fn move_to(&mut self, from: Vec2, target: Vec2) -> bool {
        if !target.is_finite() {
            return false;
        }
        let target = self.clamp_to_world(target);
        let waypoints = self.pathfinder.find_path(from, target);
        if waypoints.is_empty() {
            debug!(
                target_x = target.x,
                target_y = target.y,
                "move_to_no_route"
            );
            return false;
        }
        debug!(
            target_x = target.x,
            target_y = target.y,
            waypoints = waypoints.len(),
            "move_to_path_planned"
        );
        self.path = Some(NavigationPath::new(waypoints));
        true
    }

    pub(crate) fn path(&self) -> Option<&NavigationPath> {
        self.path.as_ref()
    }

    /// Advances the avatar by `frame_scale` reference frames. Held input wins
    /// over an active path and cancels it.
    pub(crate) fn update(
        &mut self,
        avatar: &mut Avatar,
        input_axis: Vec2,
        sprint_multiplier: f32,
        frame_scale: f32,
    ) -> MovementStep {
        if !(frame_scale > 0.0) {
            return MovementStep::default();
        }
        let before = avatar.position;
        let speed_multiplier = if sprint_multiplier.is_finite() && sprint_multiplier > 0.0 {
            sprint_multiplier
        } else {
            1.0
        };
        let mut arrived = false;

        if !input_axis.is_zero() {
            self.path = None;
            let accelerated = avatar.velocity + input_axis * (ACCELERATION * frame_scale);
            avatar.velocity = clamp_length(accelerated, MAX_SPEED * speed_multiplier);
            turn_toward(avatar, input_axis, frame_scale);
        } else if let Some(path) = self.path.as_mut() {
            while let Some(waypoint) = path.current_waypoint() {
                if avatar.position.distance(waypoint) < ARRIVAL_RADIUS {
                    path.advance_waypoint();
                } else {
                    break;
                }
            }
            if path.is_complete() {
                avatar.velocity = Vec2::ZERO;
                arrived = true;
            } else if let Some(waypoint) = path.current_waypoint() {
                let delta = waypoint - avatar.position;
                let distance = delta.length();
                let step = (PATH_SPEED * speed_multiplier).min(distance / frame_scale);
                let direction = delta * distance.recip();
                avatar.velocity = direction * step;
                turn_toward(avatar, direction, frame_scale);
            }
        } else {
            avatar.velocity = avatar.velocity * FRICTION.powf(frame_scale);
            if avatar.velocity.x.abs() < VELOCITY_SNAP_THRESHOLD
                && avatar.velocity.y.abs() < VELOCITY_SNAP_THRESHOLD
            {
                avatar.velocity = Vec2::ZERO;
            }
        }

        if arrived {
            self.path = None;
        }

        avatar.position = self.clamp_to_world(avatar.position + avatar.velocity * frame_scale);
        avatar.moving = !avatar.velocity.is_zero() || self.path.is_some();

        MovementStep {
            position_changed: avatar.position != before,
            arrived,
        }
    }

    pub(crate) fn clamp_to_world(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(0.0, self.map_width),
            point.y.clamp(0.0, self.map_height),
        )
    }
}

fn clamp_length(value: Vec2, max_length: f32) -> Vec2 {
    let length = value.length();
    if length > max_length && length > 0.0 {
        value * (max_length / length)
    } else {
        value
    }
}

/// Rotates toward `direction` along the shorter arc.
fn turn_toward(avatar: &mut Avatar, direction: Vec2, frame_scale: f32) {
    if direction.is_zero() || !direction.is_finite() {
        return;
    }
    let target = direction.y.atan2(direction.x).to_degrees();
    let diff = (target - avatar.angle_degrees + 180.0).rem_euclid(360.0) - 180.0;
    let turned = avatar.angle_degrees + diff * smoothing_alpha(ROTATION_RATE, frame_scale);
    avatar.angle_degrees = wrap_degrees(turned);
}

fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
