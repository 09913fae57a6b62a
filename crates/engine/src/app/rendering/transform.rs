use crate::app::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Fixed parameters linking world pixels, grid cells and isometric space.
/// World space spans `[0, map_width] x [0, map_height]` and is rescaled onto
/// a `grid_width x grid_height` diamond of tiles `tile_width` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoProjection {
    pub tile_width: f32,
    pub grid_width: u32,
    pub grid_height: u32,
    pub map_width: f32,
    pub map_height: f32,
}

impl IsoProjection {
    pub fn grid_to_isometric(&self, grid_x: f32, grid_y: f32) -> Vec2 {
        grid_to_isometric(grid_x, grid_y, self.tile_width)
    }

    pub fn isometric_to_grid(&self, iso: Vec2) -> (i32, i32) {
        isometric_to_grid(iso, self.tile_width)
    }

    pub fn game_to_isometric(&self, world: Vec2) -> Vec2 {
        game_to_isometric(world, self)
    }

    pub fn isometric_to_game(&self, iso: Vec2) -> Vec2 {
        isometric_to_game(iso, self)
    }

    fn world_per_grid_x(&self) -> f32 {
        if self.grid_width == 0 || !(self.map_width > 0.0) {
            return 0.0;
        }
        self.map_width / self.grid_width as f32
    }

    fn world_per_grid_y(&self) -> f32 {
        if self.grid_height == 0 || !(self.map_height > 0.0) {
            return 0.0;
        }
        self.map_height / self.grid_height as f32
    }
}

pub fn grid_to_isometric(grid_x: f32, grid_y: f32, tile_width: f32) -> Vec2 {
    Vec2 {
        x: (grid_x - grid_y) * tile_width * 0.5,
        y: (grid_x + grid_y) * tile_width * 0.25,
    }
}

/// Unrounded inverse of [`grid_to_isometric`].
pub fn isometric_to_grid_exact(iso: Vec2, tile_width: f32) -> Vec2 {
    if !(tile_width > 0.0) {
        return Vec2::ZERO;
    }
    let diff = iso.x / (tile_width * 0.5);
    let sum = iso.y / (tile_width * 0.25);
    Vec2 {
        x: (sum + diff) * 0.5,
        y: (sum - diff) * 0.5,
    }
}

pub fn isometric_to_grid(iso: Vec2, tile_width: f32) -> (i32, i32) {
    let grid = isometric_to_grid_exact(iso, tile_width);
    (grid.x.round() as i32, grid.y.round() as i32)
}

pub fn game_to_isometric(world: Vec2, projection: &IsoProjection) -> Vec2 {
    let per_x = projection.world_per_grid_x();
    let per_y = projection.world_per_grid_y();
    let grid_x = if per_x > 0.0 { world.x / per_x } else { 0.0 };
    let grid_y = if per_y > 0.0 { world.y / per_y } else { 0.0 };
    grid_to_isometric(grid_x, grid_y, projection.tile_width)
}

pub fn isometric_to_game(iso: Vec2, projection: &IsoProjection) -> Vec2 {
    let grid = isometric_to_grid_exact(iso, projection.tile_width);
    Vec2 {
        x: grid.x * projection.world_per_grid_x(),
        y: grid.y * projection.world_per_grid_y(),
    }
}

pub fn iso_to_screen_px(iso: Vec2, camera_iso: Vec2, zoom: f32, viewport: Viewport) -> Vec2 {
    let zoom = normalized_zoom(zoom);
    Vec2 {
        x: (iso.x - camera_iso.x) * zoom + viewport.width as f32 * 0.5,
        y: (iso.y - camera_iso.y) * zoom + viewport.height as f32 * 0.5,
    }
}

pub fn screen_to_iso_px(screen: Vec2, camera_iso: Vec2, zoom: f32, viewport: Viewport) -> Vec2 {
    let zoom = normalized_zoom(zoom);
    Vec2 {
        x: (screen.x - viewport.width as f32 * 0.5) / zoom + camera_iso.x,
        y: (screen.y - viewport.height as f32 * 0.5) / zoom + camera_iso.y,
    }
}

fn normalized_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE_WIDTH: f32 = 64.0;

    fn projection() -> IsoProjection {
        IsoProjection {
            tile_width: TILE_WIDTH,
            grid_width: 20,
            grid_height: 15,
            map_width: 300.0,
            map_height: 350.0,
        }
    }

    fn approx_eq_vec2(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 0.001 && (a.y - b.y).abs() < 0.001
    }

    #[test]
    fn grid_to_isometric_matches_diamond_layout() {
        assert_eq!(grid_to_isometric(0.0, 0.0, TILE_WIDTH), Vec2::new(0.0, 0.0));
        assert_eq!(grid_to_isometric(1.0, 0.0, TILE_WIDTH), Vec2::new(32.0, 16.0));
        assert_eq!(grid_to_isometric(0.0, 1.0, TILE_WIDTH), Vec2::new(-32.0, 16.0));
        assert_eq!(grid_to_isometric(3.0, 3.0, TILE_WIDTH), Vec2::new(0.0, 96.0));
    }

    #[test]
    fn round_trip_holds_for_every_cell_in_bounds() {
        for tile_width in [60.0f32, 64.0] {
            for gy in 0..30 {
                for gx in 0..40 {
                    let iso = grid_to_isometric(gx as f32, gy as f32, tile_width);
                    assert_eq!(
                        isometric_to_grid(iso, tile_width),
                        (gx, gy),
                        "tile_width {tile_width}"
                    );
                }
            }
        }
    }

    #[test]
    fn isometric_to_grid_rounds_to_nearest_cell() {
        let iso = grid_to_isometric(4.3, 6.6, TILE_WIDTH);
        assert_eq!(isometric_to_grid(iso, TILE_WIDTH), (4, 7));
    }

    #[test]
    fn game_to_isometric_rescales_world_into_grid_range() {
        let projection = projection();
        let far_corner = game_to_isometric(Vec2::new(300.0, 350.0), &projection);
        assert!(approx_eq_vec2(
            far_corner,
            grid_to_isometric(20.0, 15.0, TILE_WIDTH)
        ));
        let world = Vec2::new(123.0, 45.0);
        let back = isometric_to_game(game_to_isometric(world, &projection), &projection);
        assert!(approx_eq_vec2(back, world));
    }

    #[test]
    fn degenerate_projection_does_not_produce_nan() {
        let projection = IsoProjection {
            tile_width: 0.0,
            grid_width: 0,
            grid_height: 0,
            map_width: 0.0,
            map_height: 0.0,
        };
        let iso = game_to_isometric(Vec2::new(10.0, 10.0), &projection);
        let world = isometric_to_game(Vec2::new(10.0, 10.0), &projection);
        assert!(iso.is_finite());
        assert!(world.is_finite());
    }

    #[test]
    fn camera_iso_maps_to_viewport_center() {
        let viewport = Viewport {
            width: 800,
            height: 600,
        };
        let camera = Vec2::new(40.0, -12.0);
        let screen = iso_to_screen_px(camera, camera, 2.0, viewport);
        assert_eq!(screen, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn screen_to_iso_inverts_iso_to_screen_with_zoom() {
        let viewport = Viewport {
            width: 1280,
            height: 720,
        };
        let camera = Vec2::new(10.0, 5.0);
        let iso = Vec2::new(-75.0, 130.0);
        let screen = iso_to_screen_px(iso, camera, 1.5, viewport);
        let back = screen_to_iso_px(screen, camera, 1.5, viewport);
        assert!(approx_eq_vec2(back, iso));
    }

    #[test]
    fn invalid_zoom_falls_back_to_identity_scale() {
        let viewport = Viewport {
            width: 100,
            height: 100,
        };
        let screen = iso_to_screen_px(Vec2::new(10.0, 0.0), Vec2::ZERO, f32::NAN, viewport);
        assert_eq!(screen, Vec2::new(60.0, 50.0));
    }
}
