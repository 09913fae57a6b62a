use engine::Vec2;

use super::smoothing_alpha;

pub(crate) const MIN_ZOOM: f32 = 0.5;
pub(crate) const MAX_ZOOM: f32 = 3.0;
pub(crate) const ZOOM_STEP: f32 = 0.1;
const ZOOM_SMOOTHING: f32 = 0.15;
const WHEEL_ZOOM_FACTOR_PER_LINE: f32 = 1.1;
const NEAR_SMOOTHING: f32 = 0.1;
const FAR_SMOOTHING: f32 = 0.2;
const FAR_DISTANCE: f32 = 80.0;
const SNAP_EPSILON: f32 = 0.01;

/// Camera in world space. Rendering converts `position` into isometric
/// space before centering the viewport on it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CameraController {
    position: Vec2,
    target: Vec2,
    zoom: f32,
    target_zoom: f32,
    follow: bool,
    map_width: f32,
    map_height: f32,
}

impl CameraController {
    pub(crate) fn new(start: Vec2, map_width: f32, map_height: f32) -> Self {
        let mut camera = Self {
            position: Vec2::ZERO,
            target: Vec2::ZERO,
            zoom: 1.0,
            target_zoom: 1.0,
            follow: true,
            map_width,
            map_height,
        };
        camera.position = camera.clamp_to_world(start);
        camera.target = camera.position;
        camera
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> Vec2 {
        self.target
    }

    pub(crate) fn zoom(&self) -> f32 {
        self.zoom
    }

    #[cfg(test)]
    pub(crate) fn target_zoom(&self) -> f32 {
        self.target_zoom
    }

    pub(crate) fn is_following(&self) -> bool {
        self.follow
    }

    pub(crate) fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
    }

    /// Stops following and eases toward `point`.
    pub(crate) fn look_at(&mut self, point: Vec2) {
        if !point.is_finite() {
            return;
        }
        self.follow = false;
        self.target = self.clamp_to_world(point);
    }

    /// Moves the view immediately by a world-space delta. Used for drag
    /// panning, which must track the pointer without easing.
    pub(crate) fn pan_by(&mut self, delta: Vec2) {
        if !delta.is_finite() || delta.is_zero() {
            return;
        }
        self.follow = false;
        self.position = self.clamp_to_world(self.position + delta);
        self.target = self.position;
    }

    pub(crate) fn step_zoom(&mut self, steps: i32) {
        if steps != 0 {
            self.set_zoom(self.target_zoom + ZOOM_STEP * steps as f32);
        }
    }

    /// Wheel zoom is multiplicative so each notch feels the same at any scale.
    pub(crate) fn apply_wheel(&mut self, lines: f32) {
        if lines.is_finite() && lines != 0.0 {
            self.set_zoom(self.target_zoom * WHEEL_ZOOM_FACTOR_PER_LINE.powf(lines));
        }
    }

    pub(crate) fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.target_zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub(crate) fn update(&mut self, avatar_position: Vec2, frame_scale: f32) {
        if self.follow && avatar_position.is_finite() {
            self.target = self.clamp_to_world(avatar_position);
        }

        let offset = self.target - self.position;
        let per_frame = if offset.length() > FAR_DISTANCE {
            FAR_SMOOTHING
        } else {
            NEAR_SMOOTHING
        };
        let alpha = smoothing_alpha(per_frame, frame_scale);
        self.position = self.clamp_to_world(self.position + offset * alpha);
        if self.position.distance(self.target) < SNAP_EPSILON {
            self.position = self.target;
        }

        let zoom_alpha = smoothing_alpha(ZOOM_SMOOTHING, frame_scale);
        self.zoom += (self.target_zoom - self.zoom) * zoom_alpha;
        if (self.zoom - self.target_zoom).abs() < 1e-4 {
            self.zoom = self.target_zoom;
        }
        self.zoom = self.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn clamp_to_world(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(0.0, self.map_width),
            point.y.clamp(0.0, self.map_height),
        )
    }
}
