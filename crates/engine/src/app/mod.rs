mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    game_to_isometric, grid_to_isometric, iso_to_screen_px, isometric_to_game, isometric_to_grid,
    isometric_to_grid_exact, screen_to_iso_px, DrawCommand, DrawList, IsoProjection, Renderer,
    Rgba, Viewport,
};
pub use scene::{InputSnapshot, Scene, SceneCommand, Vec2};
