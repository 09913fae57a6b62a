use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::Vec2;

use super::{DrawCommand, DrawList, Rgba, Viewport};

const VIEW_CULL_PADDING_PX: f32 = 2.0;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render(&mut self, clear_color: Rgba, draw_list: &DrawList) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        let frame = self.pixels.frame_mut();
        rasterize(
            frame,
            self.viewport.width,
            self.viewport.height,
            clear_color,
            draw_list,
        );
        self.pixels.render()
    }
}

/// Clears `frame` and paints every command in list order.
pub(crate) fn rasterize(
    frame: &mut [u8],
    width: u32,
    height: u32,
    clear_color: Rgba,
    draw_list: &DrawList,
) {
    let clear = clear_color.with_alpha(255).to_array();
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&clear);
    }
    if width == 0 || height == 0 {
        return;
    }

    for command in draw_list.commands() {
        if !command_intersects_viewport(command, width, height) {
            continue;
        }
        match *command {
            DrawCommand::FillDiamond {
                center,
                half_width,
                half_height,
                color,
            } => fill_diamond(frame, width, height, center, half_width, half_height, color),
            DrawCommand::OutlineDiamond {
                center,
                half_width,
                half_height,
                color,
            } => outline_diamond(frame, width, height, center, half_width, half_height, color),
            DrawCommand::FillCircle {
                center,
                radius,
                color,
            } => fill_circle(frame, width, height, center, radius, color),
            DrawCommand::OutlineCircle {
                center,
                radius,
                color,
            } => outline_circle(frame, width, height, center, radius, color),
            DrawCommand::FillRect { min, max, color } => {
                fill_rect(frame, width, height, min, max, color)
            }
        }
    }
}

fn command_bounds(command: &DrawCommand) -> (Vec2, Vec2) {
    match *command {
        DrawCommand::FillDiamond {
            center,
            half_width,
            half_height,
            ..
        }
        | DrawCommand::OutlineDiamond {
            center,
            half_width,
            half_height,
            ..
        } => (
            Vec2::new(center.x - half_width, center.y - half_height),
            Vec2::new(center.x + half_width, center.y + half_height),
        ),
        DrawCommand::FillCircle { center, radius, .. }
        | DrawCommand::OutlineCircle { center, radius, .. } => (
            Vec2::new(center.x - radius, center.y - radius),
            Vec2::new(center.x + radius, center.y + radius),
        ),
        DrawCommand::FillRect { min, max, .. } => (min, max),
    }
}

fn command_intersects_viewport(command: &DrawCommand, width: u32, height: u32) -> bool {
    let (min, max) = command_bounds(command);
    if !min.is_finite() || !max.is_finite() {
        return false;
    }
    !(max.x < -VIEW_CULL_PADDING_PX
        || max.y < -VIEW_CULL_PADDING_PX
        || min.x > width as f32 + VIEW_CULL_PADDING_PX
        || min.y > height as f32 + VIEW_CULL_PADDING_PX)
}

fn blend_pixel_rgba_clipped(frame: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: Rgba) {
    if color.a == 0 || x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width as usize).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }

    let dst = &mut frame[byte_offset..end];
    if color.a == 255 {
        dst.copy_from_slice(&color.to_array());
        return;
    }
    let alpha = color.a as u32;
    let inv_alpha = 255 - alpha;
    let src = color.to_array();
    for channel in 0..3 {
        dst[channel] =
            ((src[channel] as u32 * alpha + dst[channel] as u32 * inv_alpha) / 255) as u8;
    }
    dst[3] = 255;
}

fn fill_rect(frame: &mut [u8], width: u32, height: u32, min: Vec2, max: Vec2, color: Rgba) {
    let left = min.x.min(max.x).round().max(0.0) as i32;
    let right = min.x.max(max.x).round().min(width as f32) as i32;
    let top = min.y.min(max.y).round().max(0.0) as i32;
    let bottom = min.y.max(max.y).round().min(height as f32) as i32;
    for y in top..bottom {
        for x in left..right {
            blend_pixel_rgba_clipped(frame, width, height, x, y, color);
        }
    }
}

fn fill_diamond(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center: Vec2,
    half_width: f32,
    half_height: f32,
    color: Rgba,
) {
    if !(half_width > 0.0) || !(half_height > 0.0) {
        return;
    }
    let top = (center.y - half_height).floor().max(0.0) as i32;
    let bottom = (center.y + half_height).ceil().min(height as f32) as i32;
    for y in top..bottom {
        let dy = ((y as f32 + 0.5) - center.y).abs();
        if dy > half_height {
            continue;
        }
        let span = half_width * (1.0 - dy / half_height);
        let left = (center.x - span).round() as i32;
        let right = (center.x + span).round() as i32;
        for x in left.max(0)..right.min(width as i32) {
            blend_pixel_rgba_clipped(frame, width, height, x, y, color);
        }
    }
}

fn outline_diamond(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center: Vec2,
    half_width: f32,
    half_height: f32,
    color: Rgba,
) {
    let top = Vec2::new(center.x, center.y - half_height);
    let right = Vec2::new(center.x + half_width, center.y);
    let bottom = Vec2::new(center.x, center.y + half_height);
    let left = Vec2::new(center.x - half_width, center.y);
    for (from, to) in [(top, right), (right, bottom), (bottom, left), (left, top)] {
        draw_line(frame, width, height, from, to, color);
    }
}

fn fill_circle(frame: &mut [u8], width: u32, height: u32, center: Vec2, radius: f32, color: Rgba) {
    if !(radius > 0.0) {
        return;
    }
    let radius_sq = radius * radius;
    let top = (center.y - radius).floor().max(0.0) as i32;
    let bottom = (center.y + radius).ceil().min(height as f32) as i32;
    let left = (center.x - radius).floor().max(0.0) as i32;
    let right = (center.x + radius).ceil().min(width as f32) as i32;
    for y in top..bottom {
        let dy = y as f32 + 0.5 - center.y;
        for x in left..right {
            let dx = x as f32 + 0.5 - center.x;
            if dx * dx + dy * dy <= radius_sq {
                blend_pixel_rgba_clipped(frame, width, height, x, y, color);
            }
        }
    }
}

// Midpoint circle; each octant point is mirrored eight ways.
fn outline_circle(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center: Vec2,
    radius: f32,
    color: Rgba,
) {
    if !(radius > 0.0) {
        return;
    }
    let cx = center.x.round() as i32;
    let cy = center.y.round() as i32;
    let mut x = radius.round() as i32;
    let mut y = 0i32;
    let mut error = 1 - x;
    while x >= y {
        for (px, py) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            blend_pixel_rgba_clipped(frame, width, height, cx + px, cy + py, color);
        }
        y += 1;
        if error < 0 {
            error += 2 * y + 1;
        } else {
            x -= 1;
            error += 2 * (y - x) + 1;
        }
    }
}

fn draw_line(frame: &mut [u8], width: u32, height: u32, from: Vec2, to: Vec2, color: Rgba) {
    let mut x0 = from.x.round() as i32;
    let mut y0 = from.y.round() as i32;
    let x1 = to.x.round() as i32;
    let y1 = to.y.round() as i32;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let step_x = if x0 < x1 { 1 } else { -1 };
    let step_y = if y0 < y1 { 1 } else { -1 };
    let mut error = dx + dy;
    loop {
        blend_pixel_rgba_clipped(frame, width, height, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x0 += step_x;
        }
        if doubled <= dx {
            error += dx;
            y0 += step_y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: u32 = 32;
    const HEIGHT: u32 = 32;
    const CLEAR: Rgba = Rgba::opaque(0, 0, 0);

    fn frame() -> Vec<u8> {
        vec![0u8; (WIDTH * HEIGHT * 4) as usize]
    }

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * WIDTH + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn renderer_type_is_non_generic() {
        let _renderer: Option<Renderer> = None;
    }

    #[test]
    fn rasterize_clears_to_opaque_clear_color() {
        let mut frame = frame();
        rasterize(
            &mut frame,
            WIDTH,
            HEIGHT,
            Rgba::new(10, 20, 30, 0),
            &DrawList::new(),
        );
        assert_eq!(pixel(&frame, 0, 0), [10, 20, 30, 255]);
        assert_eq!(pixel(&frame, WIDTH - 1, HEIGHT - 1), [10, 20, 30, 255]);
    }

    #[test]
    fn fill_diamond_covers_center_but_not_corners() {
        let mut list = DrawList::new();
        list.fill_diamond(Vec2::new(16.0, 16.0), 12.0, 6.0, Rgba::opaque(200, 0, 0));
        let mut frame = frame();
        rasterize(&mut frame, WIDTH, HEIGHT, CLEAR, &list);

        assert_eq!(pixel(&frame, 16, 16), [200, 0, 0, 255]);
        assert_eq!(pixel(&frame, 5, 11), [0, 0, 0, 255]);
        assert_eq!(pixel(&frame, 27, 21), [0, 0, 0, 255]);
    }

    #[test]
    fn later_commands_paint_over_earlier_ones() {
        let mut list = DrawList::new();
        list.fill_rect(Vec2::ZERO, Vec2::new(8.0, 8.0), Rgba::opaque(0, 255, 0));
        list.fill_circle(Vec2::new(4.0, 4.0), 2.0, Rgba::opaque(0, 0, 255));
        let mut frame = frame();
        rasterize(&mut frame, WIDTH, HEIGHT, CLEAR, &list);

        assert_eq!(pixel(&frame, 4, 4), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn translucent_color_blends_with_background() {
        let mut list = DrawList::new();
        list.fill_rect(
            Vec2::ZERO,
            Vec2::new(2.0, 2.0),
            Rgba::new(255, 255, 255, 128),
        );
        let mut frame = frame();
        rasterize(&mut frame, WIDTH, HEIGHT, CLEAR, &list);

        let [r, g, b, a] = pixel(&frame, 0, 0);
        assert_eq!(a, 255);
        assert!(r > 120 && r < 136);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn offscreen_and_non_finite_commands_are_skipped_without_panic() {
        let mut list = DrawList::new();
        list.fill_circle(Vec2::new(-500.0, -500.0), 10.0, Rgba::opaque(255, 0, 0));
        list.fill_diamond(Vec2::new(f32::NAN, 4.0), 8.0, 4.0, Rgba::opaque(255, 0, 0));
        list.outline_circle(Vec2::new(1.0e9, 3.0), 4.0, Rgba::opaque(255, 0, 0));
        let mut frame = frame();
        rasterize(&mut frame, WIDTH, HEIGHT, CLEAR, &list);

        assert!(frame.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn outlines_touch_their_extreme_points() {
        let mut list = DrawList::new();
        list.outline_diamond(Vec2::new(16.0, 16.0), 10.0, 5.0, Rgba::opaque(1, 2, 3));
        list.outline_circle(Vec2::new(8.0, 8.0), 3.0, Rgba::opaque(4, 5, 6));
        let mut frame = frame();
        rasterize(&mut frame, WIDTH, HEIGHT, CLEAR, &list);

        assert_eq!(pixel(&frame, 26, 16), [1, 2, 3, 255]);
        assert_eq!(pixel(&frame, 16, 11), [1, 2, 3, 255]);
        assert_eq!(pixel(&frame, 16, 16), [0, 0, 0, 255]);
        assert_eq!(pixel(&frame, 11, 8), [4, 5, 6, 255]);
        assert_eq!(pixel(&frame, 8, 8), [0, 0, 0, 255]);
    }

    #[test]
    fn rasterize_is_safe_for_zero_sized_viewport() {
        let mut list = DrawList::new();
        list.fill_rect(Vec2::ZERO, Vec2::new(4.0, 4.0), Rgba::opaque(9, 9, 9));
        let mut frame = Vec::new();
        rasterize(&mut frame, 0, 0, CLEAR, &list);
        assert!(frame.is_empty());
    }
}
