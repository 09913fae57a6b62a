mod draw_list;
mod renderer;
mod transform;

pub use draw_list::{DrawCommand, DrawList, Rgba};
pub use renderer::Renderer;
pub use transform::{
    game_to_isometric, grid_to_isometric, iso_to_screen_px, isometric_to_game, isometric_to_grid,
    isometric_to_grid_exact, screen_to_iso_px, IsoProjection, Viewport,
};
