use crate::app::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Scales alpha by `factor` in `[0, 1]`; used for fading effects.
    pub fn faded(self, factor: f32) -> Self {
        let factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.with_alpha((self.a as f32 * factor).round() as u8)
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Screen-space primitives. Coordinates are in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    FillDiamond {
        center: Vec2,
        half_width: f32,
        half_height: f32,
        color: Rgba,
    },
    OutlineDiamond {
        center: Vec2,
        half_width: f32,
        half_height: f32,
        color: Rgba,
    },
    FillCircle {
        center: Vec2,
        radius: f32,
        color: Rgba,
    },
    OutlineCircle {
        center: Vec2,
        radius: f32,
        color: Rgba,
    },
    FillRect {
        min: Vec2,
        max: Vec2,
        color: Rgba,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn fill_diamond(&mut self, center: Vec2, half_width: f32, half_height: f32, color: Rgba) {
        self.push(DrawCommand::FillDiamond {
            center,
            half_width,
            half_height,
            color,
        });
    }

    pub fn outline_diamond(
        &mut self,
        center: Vec2,
        half_width: f32,
        half_height: f32,
        color: Rgba,
    ) {
        self.push(DrawCommand::OutlineDiamond {
            center,
            half_width,
            half_height,
            color,
        });
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.push(DrawCommand::FillCircle {
            center,
            radius,
            color,
        });
    }

    pub fn outline_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.push(DrawCommand::OutlineCircle {
            center,
            radius,
            color,
        });
    }

    pub fn fill_rect(&mut self, min: Vec2, max: Vec2, color: Rgba) {
        self.push(DrawCommand::FillRect { min, max, color });
    }
}
