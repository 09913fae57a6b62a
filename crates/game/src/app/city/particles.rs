use engine::{Rgba, Vec2};
use rand::rngs::StdRng;
use rand::Rng;

pub(crate) const MAX_PARTICLES: usize = 200;
pub(crate) const FOOTSTEP_FRAME_INTERVAL: f32 = 6.0;
const AMBIENT_CHANCE_PER_FRAME: f64 = 0.05;
const AMBIENT_LIFE_MS: (f32, f32) = (4_000.0, 8_000.0);
const FOOTSTEP_LIFE_MS: f32 = 500.0;
const SPRINT_TRAIL_LIFE_MS: f32 = 350.0;
const WORK_SPARK_LIFE_MS: f32 = 600.0;
const WORK_SPARK_CHANCE_PER_FRAME: f64 = 0.5;

const AMBIENT_COLOR: Rgba = Rgba::new(255, 255, 255, 60);
const FOOTSTEP_COLOR: Rgba = Rgba::new(0x9e, 0x9e, 0x9e, 160);
const SPRINT_TRAIL_COLOR: Rgba = Rgba::new(0xff, 0xc1, 0x07, 200);
const WORK_SPARK_COLOR: Rgba = Rgba::new(0xff, 0xeb, 0x3b, 230);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParticleKind {
    Ambient,
    Footstep,
    SprintTrail,
    WorkSpark,
}

impl ParticleKind {
    pub(crate) fn radius(self) -> f32 {
        match self {
            Self::Ambient => 1.5,
            Self::Footstep => 2.0,
            Self::SprintTrail => 2.5,
            Self::WorkSpark => 1.5,
        }
    }
}

/// Velocity is in world units per second.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Particle {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) color: Rgba,
    pub(crate) life_ms: f32,
    pub(crate) max_life_ms: f32,
    pub(crate) spawn_time_ms: f64,
    pub(crate) kind: ParticleKind,
}

impl Particle {
    /// Remaining life in `[0, 1]`; drives fading.
    pub(crate) fn life_fraction(&self) -> f32 {
        if self.max_life_ms > 0.0 {
            (self.life_ms / self.max_life_ms).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Fixed-capacity pool. Spawns past capacity are dropped.
pub(crate) struct ParticleSystem {
    particles: Vec<Particle>,
    footstep_frames: f32,
    rng: StdRng,
}

impl ParticleSystem {
    pub(crate) fn new(rng: StdRng) -> Self {
        Self {
            particles: Vec::with_capacity(MAX_PARTICLES),
            footstep_frames: 0.0,
            rng,
        }
    }

    pub(crate) fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.particles.len()
    }

    pub(crate) fn spawn(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        color: Rgba,
        life_ms: f32,
        kind: ParticleKind,
        now_ms: f64,
    ) -> bool {
        if self.particles.len() >= MAX_PARTICLES
            || !(life_ms > 0.0)
            || !position.is_finite()
            || !velocity.is_finite()
        {
            return false;
        }
        self.particles.push(Particle {
            position,
            velocity,
            color,
            life_ms,
            max_life_ms: life_ms,
            spawn_time_ms: now_ms,
            kind,
        });
        true
    }

    pub(crate) fn update(&mut self, dt_seconds: f32) {
        if !(dt_seconds > 0.0) {
            return;
        }
        let dt_ms = dt_seconds * 1_000.0;
        for particle in &mut self.particles {
            particle.position = particle.position + particle.velocity * dt_seconds;
            particle.life_ms -= dt_ms;
        }
        self.particles.retain(|particle| particle.life_ms > 0.0);
    }

    pub(crate) fn emit_ambient(&mut self, map_size: Vec2, frame_scale: f32, now_ms: f64) {
        if !self.roll(AMBIENT_CHANCE_PER_FRAME, frame_scale) {
            return;
        }
        let position = Vec2::new(
            self.rng.gen_range(0.0..=map_size.x.max(0.0)),
            self.rng.gen_range(0.0..=map_size.y.max(0.0)),
        );
        let velocity = Vec2::new(
            self.rng.gen_range(-3.0..=3.0),
            self.rng.gen_range(-6.0..=-1.0),
        );
        let life_ms = self.rng.gen_range(AMBIENT_LIFE_MS.0..=AMBIENT_LIFE_MS.1);
        self.spawn(
            position,
            velocity,
            AMBIENT_COLOR,
            life_ms,
            ParticleKind::Ambient,
            now_ms,
        );
    }

    /// Drops a dust puff every few reference frames while `moving`.
    pub(crate) fn emit_footsteps(
        &mut self,
        feet: Vec2,
        moving: bool,
        frame_scale: f32,
        now_ms: f64,
    ) {
        if !moving {
            self.footstep_frames = 0.0;
            return;
        }
        self.footstep_frames += frame_scale.max(0.0);
        while self.footstep_frames >= FOOTSTEP_FRAME_INTERVAL {
            self.footstep_frames -= FOOTSTEP_FRAME_INTERVAL;
            let velocity = Vec2::new(
                self.rng.gen_range(-8.0..=8.0),
                self.rng.gen_range(-8.0..=0.0),
            );
            self.spawn(
                feet,
                velocity,
                FOOTSTEP_COLOR,
                FOOTSTEP_LIFE_MS,
                ParticleKind::Footstep,
                now_ms,
            );
        }
    }

    pub(crate) fn emit_sprint_trail(&mut self, feet: Vec2, avatar_velocity: Vec2, now_ms: f64) {
        let jitter = Vec2::new(
            self.rng.gen_range(-2.0..=2.0),
            self.rng.gen_range(-2.0..=2.0),
        );
        // Avatar velocity is per reference frame; the trail drifts backwards.
        let velocity = avatar_velocity * -3.0 + jitter;
        self.spawn(
            feet,
            velocity,
            SPRINT_TRAIL_COLOR,
            SPRINT_TRAIL_LIFE_MS,
            ParticleKind::SprintTrail,
            now_ms,
        );
    }

    pub(crate) fn emit_work_sparks(&mut self, origin: Vec2, frame_scale: f32, now_ms: f64) {
        if !self.roll(WORK_SPARK_CHANCE_PER_FRAME, frame_scale) {
            return;
        }
        let velocity = Vec2::new(
            self.rng.gen_range(-25.0..=25.0),
            self.rng.gen_range(-40.0..=-15.0),
        );
        self.spawn(
            origin,
            velocity,
            WORK_SPARK_COLOR,
            WORK_SPARK_LIFE_MS,
            ParticleKind::WorkSpark,
            now_ms,
        );
    }

    fn roll(&mut self, chance_per_frame: f64, frame_scale: f32) -> bool {
        if !(frame_scale > 0.0) {
            return false;
        }
        let chance = 1.0 - (1.0 - chance_per_frame).powf(f64::from(frame_scale));
        self.rng.gen_bool(chance.clamp(0.0, 1.0))
    }
}
