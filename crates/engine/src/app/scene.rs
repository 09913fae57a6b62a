use std::ops::{Add, Mul, Sub};

use super::input::{ActionStates, InputAction};
use super::rendering::{DrawList, Rgba, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Input state captured once per frame. Held keys are level-triggered;
/// clicks, zoom steps and drag deltas are consumed by the frame that reads
/// them.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    click_position_px: Option<Vec2>,
    drag_delta_px: Vec2,
    dragging: bool,
    zoom_delta_steps: i32,
    wheel_delta: f32,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        click_position_px: Option<Vec2>,
        drag_delta_px: Vec2,
        dragging: bool,
        zoom_delta_steps: i32,
        wheel_delta: f32,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            click_position_px,
            drag_delta_px,
            dragging,
            zoom_delta_steps,
            wheel_delta,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_click_position_px(mut self, click_position_px: Option<Vec2>) -> Self {
        self.click_position_px = click_position_px;
        self
    }

    pub fn with_drag_delta_px(mut self, drag_delta_px: Vec2) -> Self {
        self.drag_delta_px = drag_delta_px;
        self.dragging = !drag_delta_px.is_zero();
        self
    }

    pub fn with_zoom_delta_steps(mut self, zoom_delta_steps: i32) -> Self {
        self.zoom_delta_steps = zoom_delta_steps;
        self
    }

    pub fn with_wheel_delta(mut self, wheel_delta: f32) -> Self {
        self.wheel_delta = wheel_delta;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    /// Position of a completed left click (press and release without a drag).
    pub fn click_position_px(&self) -> Option<Vec2> {
        self.click_position_px
    }

    pub fn drag_delta_px(&self) -> Vec2 {
        self.drag_delta_px
    }

    pub fn dragging(&self) -> bool {
        self.dragging
    }

    pub fn zoom_delta_steps(&self) -> i32 {
        self.zoom_delta_steps
    }

    pub fn wheel_delta(&self) -> f32 {
        self.wheel_delta
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Unit-length direction from the held movement keys, or zero.
    /// `y` grows downward in world space, so `MoveUp` is negative.
    pub fn movement_axis(&self) -> Vec2 {
        let mut x = 0.0f32;
        let mut y = 0.0f32;

        if self.is_down(InputAction::MoveRight) {
            x += 1.0;
        }
        if self.is_down(InputAction::MoveLeft) {
            x -= 1.0;
        }
        if self.is_down(InputAction::MoveDown) {
            y += 1.0;
        }
        if self.is_down(InputAction::MoveUp) {
            y -= 1.0;
        }

        let len_sq = x * x + y * y;
        if len_sq > 0.0 {
            let inv_len = len_sq.sqrt().recip();
            x *= inv_len;
            y *= inv_len;
        }
        Vec2 { x, y }
    }
}

pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn render(&self, viewport: Viewport, draw_list: &mut DrawList);
    fn unload(&mut self);
    fn clear_color(&self) -> Rgba {
        Rgba::opaque(20, 22, 28)
    }
    fn debug_title(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_axis_is_normalized_for_diagonals() {
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveRight, true)
            .with_action_down(InputAction::MoveUp, true);
        let axis = input.movement_axis();

        assert!((axis.length() - 1.0).abs() < 0.0001);
        assert!(axis.x > 0.0);
        assert!(axis.y < 0.0);
    }

    #[test]
    fn opposing_keys_cancel_out() {
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_down(InputAction::MoveRight, true);

        assert!(input.movement_axis().is_zero());
    }

    #[test]
    fn drag_delta_marks_snapshot_as_dragging() {
        let idle = InputSnapshot::empty();
        let dragging = InputSnapshot::empty().with_drag_delta_px(Vec2::new(4.0, 0.0));

        assert!(!idle.dragging());
        assert!(dragging.dragging());
    }

    #[test]
    fn vec2_distance_matches_pythagoras() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 6.0);
        assert!((a.distance(b) - 5.0).abs() < 0.0001);
        assert_eq!(a + b - b, a);
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
    }
}
