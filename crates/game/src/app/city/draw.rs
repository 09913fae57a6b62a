use engine::{
    grid_to_isometric, iso_to_screen_px, screen_to_iso_px, DrawList, IsoProjection, Rgba, Vec2,
    Viewport,
};

use super::config::{JobSite, PropertyKind, PropertySite};
use super::movement::Avatar;
use super::nav::NavigationPath;
use super::npc::{NpcAgent, NpcKind, SimEvent, SimEventKind};
use super::particles::{Particle, ParticleKind};

const TILE_COLOR_LIGHT: Rgba = Rgba::opaque(0x55, 0x8b, 0x2f);
const TILE_COLOR_DARK: Rgba = Rgba::opaque(0x4a, 0x7a, 0x29);
const ROAD_COLOR: Rgba = Rgba::opaque(0x6d, 0x6a, 0x64);
const ROAD_SPACING: u32 = 5;
const TILE_OUTLINE: Rgba = Rgba::new(0x33, 0x5a, 0x1e, 120);
const JOB_MARKER_COLOR: Rgba = Rgba::opaque(0xff, 0xc1, 0x07);
const JOB_MARKER_ACTIVE_COLOR: Rgba = Rgba::opaque(0xff, 0x57, 0x22);
const OWNED_OUTLINE: Rgba = Rgba::opaque(0xff, 0xd7, 0x00);
const SELECTED_OUTLINE: Rgba = Rgba::opaque(0xff, 0xff, 0xff);
const PATH_DOT_COLOR: Rgba = Rgba::new(0xff, 0xff, 0xff, 140);
const SHADOW_COLOR: Rgba = Rgba::new(0, 0, 0, 70);
const FIGURE_BODY_RADIUS: f32 = 5.0;
const FIGURE_HEAD_RADIUS: f32 = 3.5;
const PROPERTY_FOOTPRINT: f32 = 10.0;
const AMBIENT_TWINKLE_PERIOD_MS: f32 = 300.0;

/// Camera-dependent mapping between world, isometric and screen space for
/// one frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameView {
    pub(crate) projection: IsoProjection,
    pub(crate) camera_iso: Vec2,
    pub(crate) zoom: f32,
    pub(crate) viewport: Viewport,
}

impl FrameView {
    pub(crate) fn new(
        projection: IsoProjection,
        camera_world: Vec2,
        zoom: f32,
        viewport: Viewport,
    ) -> Self {
        Self {
            projection,
            camera_iso: projection.game_to_isometric(camera_world),
            zoom,
            viewport,
        }
    }

    pub(crate) fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let iso = self.projection.game_to_isometric(world);
        iso_to_screen_px(iso, self.camera_iso, self.zoom, self.viewport)
    }

    pub(crate) fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let iso = screen_to_iso_px(screen, self.camera_iso, self.zoom, self.viewport);
        self.projection.isometric_to_game(iso)
    }

    fn grid_to_screen(&self, grid_x: f32, grid_y: f32) -> Vec2 {
        let iso = grid_to_isometric(grid_x, grid_y, self.projection.tile_width);
        iso_to_screen_px(iso, self.camera_iso, self.zoom, self.viewport)
    }

    fn scaled(&self, length: f32) -> f32 {
        length * self.zoom
    }
}

/// Borrowed view of everything drawn in one frame.
pub(crate) struct CityFrame<'a> {
    pub(crate) view: FrameView,
    pub(crate) job_sites: &'a [JobSite],
    pub(crate) property_sites: &'a [PropertySite],
    pub(crate) active_job: Option<&'a str>,
    pub(crate) selected_property: Option<&'a str>,
    pub(crate) selected_npc: Option<u32>,
    pub(crate) events: &'a [SimEvent],
    pub(crate) now_ms: f64,
    pub(crate) npcs: &'a [NpcAgent],
    pub(crate) avatar: &'a Avatar,
    pub(crate) path: Option<&'a NavigationPath>,
    pub(crate) particles: &'a [Particle],
}

pub(crate) fn draw_city(frame: &CityFrame<'_>, draw_list: &mut DrawList) {
    draw_ground(&frame.view, draw_list);
    draw_properties(frame, draw_list);
    draw_job_markers(frame, draw_list);
    draw_events(frame, draw_list);
    draw_path(frame, draw_list);
    draw_figures(frame, draw_list);
    draw_particles(frame, draw_list);
}

fn draw_ground(view: &FrameView, draw_list: &mut DrawList) {
    let half_width = view.scaled(view.projection.tile_width * 0.5);
    let half_height = view.scaled(view.projection.tile_width * 0.25);
    for grid_y in 0..view.projection.grid_height {
        for grid_x in 0..view.projection.grid_width {
            let center = view.grid_to_screen(grid_x as f32 + 0.5, grid_y as f32 + 0.5);
            let color = ground_tile_color(grid_x, grid_y);
            draw_list.fill_diamond(center, half_width, half_height, color);
            draw_list.outline_diamond(center, half_width, half_height, TILE_OUTLINE);
        }
    }
}

/// Every fifth row and column is road; the rest is a grass checkerboard.
fn ground_tile_color(grid_x: u32, grid_y: u32) -> Rgba {
    if grid_x % ROAD_SPACING == 0 || grid_y % ROAD_SPACING == 0 {
        ROAD_COLOR
    } else if (grid_x + grid_y) % 2 == 0 {
        TILE_COLOR_LIGHT
    } else {
        TILE_COLOR_DARK
    }
}

pub(crate) fn property_color(kind: PropertyKind) -> Rgba {
    match kind {
        PropertyKind::House => Rgba::opaque(0xff, 0x98, 0x00),
        PropertyKind::Business => Rgba::opaque(0x21, 0x96, 0xf3),
        PropertyKind::Farm => Rgba::opaque(0x4c, 0xaf, 0x50),
        PropertyKind::Shop => Rgba::opaque(0xe9, 0x1e, 0x63),
        PropertyKind::Factory => Rgba::opaque(0x9c, 0x27, 0xb0),
    }
}

/// Building height grows with the logarithm of the property value.
pub(crate) fn property_height(value: f64, owned: bool) -> f32 {
    let base = 30.0 + value.max(1.0).ln() as f32 * 5.0;
    if owned {
        base * 1.2
    } else {
        base
    }
}

fn draw_properties(frame: &CityFrame<'_>, draw_list: &mut DrawList) {
    let view = &frame.view;
    let mut sites: Vec<&PropertySite> = frame.property_sites.iter().collect();
    sites.sort_by(|a, b| a.position.y.total_cmp(&b.position.y));

    for site in sites {
        let base = view.world_to_screen(site.position.to_vec2());
        let half_width = view.scaled(PROPERTY_FOOTPRINT);
        let half_height = half_width * 0.5;
        let height = view.scaled(property_height(site.value, site.owned) * 0.5);
        let color = property_color(site.kind);
        let side = Rgba::opaque(
            (color.r as f32 * 0.7) as u8,
            (color.g as f32 * 0.7) as u8,
            (color.b as f32 * 0.7) as u8,
        );

        draw_list.fill_diamond(base, half_width, half_height, SHADOW_COLOR);
        draw_list.fill_rect(
            Vec2::new(base.x - half_width, base.y - height),
            Vec2::new(base.x + half_width, base.y),
            side,
        );
        let roof = Vec2::new(base.x, base.y - height);
        draw_list.fill_diamond(roof, half_width, half_height, color);
        if site.owned {
            draw_list.outline_diamond(roof, half_width, half_height, OWNED_OUTLINE);
        }
        if frame.selected_property == Some(site.id.as_str()) {
            draw_list.outline_diamond(base, half_width * 1.6, half_height * 1.6, SELECTED_OUTLINE);
        }
    }
}

fn draw_job_markers(frame: &CityFrame<'_>, draw_list: &mut DrawList) {
    let view = &frame.view;
    let radius = view.scaled(4.0);
    for site in frame.job_sites {
        let center = view.world_to_screen(site.position.to_vec2());
        let active = frame.active_job == Some(site.name.as_str());
        let color = if active {
            JOB_MARKER_ACTIVE_COLOR
        } else {
            JOB_MARKER_COLOR
        };
        let pin = Vec2::new(center.x, center.y - view.scaled(14.0));
        draw_list.fill_rect(
            Vec2::new(center.x - 0.5, pin.y),
            Vec2::new(center.x + 0.5, center.y),
            color,
        );
        draw_list.fill_circle(pin, radius, color);
        draw_list.outline_circle(pin, radius + 1.0, Rgba::opaque(0x3e, 0x27, 0x23));
    }
}

fn event_color(kind: SimEventKind) -> Rgba {
    match kind {
        SimEventKind::MarketBoom => Rgba::opaque(0x4c, 0xaf, 0x50),
        SimEventKind::MarketCrash => Rgba::opaque(0xf4, 0x43, 0x36),
        SimEventKind::Opportunity => Rgba::opaque(0x21, 0x96, 0xf3),
        SimEventKind::Challenge => Rgba::opaque(0xff, 0x98, 0x00),
    }
}

/// Events render as rings that widen and fade over their lifetime.
fn draw_events(frame: &CityFrame<'_>, draw_list: &mut DrawList) {
    let view = &frame.view;
    for event in frame.events {
        let progress = event.progress(frame.now_ms);
        let center = view.world_to_screen(event.position);
        let radius = view.scaled(8.0 + 40.0 * progress * event.kind.intensity() * 2.0);
        let color = event_color(event.kind).faded(1.0 - progress);
        draw_list.outline_circle(center, radius, color);
        draw_list.fill_circle(center, view.scaled(3.0), color);
    }
}

fn draw_path(frame: &CityFrame<'_>, draw_list: &mut DrawList) {
    let Some(path) = frame.path else {
        return;
    };
    let view = &frame.view;
    for waypoint in path.remaining() {
        draw_list.fill_circle(view.world_to_screen(*waypoint), view.scaled(1.5), PATH_DOT_COLOR);
    }
    if let Some(goal) = path.final_waypoint() {
        let center = view.world_to_screen(goal);
        draw_list.outline_diamond(center, view.scaled(8.0), view.scaled(4.0), SELECTED_OUTLINE);
    }
}

struct Figure {
    feet: Vec2,
    skin: Rgba,
    hair: Rgba,
    outfit: Rgba,
    highlight: Option<Rgba>,
    badge: Option<Rgba>,
    facing: Option<Vec2>,
}

fn draw_figures(frame: &CityFrame<'_>, draw_list: &mut DrawList) {
    let view = &frame.view;
    let mut figures: Vec<Figure> = frame
        .npcs
        .iter()
        .map(|npc| Figure {
            feet: view.world_to_screen(npc.position),
            skin: npc.appearance.skin,
            hair: npc.appearance.hair,
            outfit: npc.appearance.outfit,
            highlight: (frame.selected_npc == Some(npc.id)).then_some(SELECTED_OUTLINE),
            badge: (npc.kind == NpcKind::Vendor).then_some(JOB_MARKER_COLOR),
            facing: Some(npc_facing(npc)),
        })
        .collect();

    let avatar = frame.avatar;
    let radians = avatar.angle_degrees.to_radians();
    figures.push(Figure {
        feet: view.world_to_screen(avatar.position),
        skin: avatar.colors.skin,
        hair: avatar.colors.hair,
        outfit: avatar.colors.outfit,
        highlight: Some(OWNED_OUTLINE),
        badge: None,
        facing: Some(Vec2::new(radians.cos(), radians.sin())),
    });

    // Painter's order: lower on screen is closer to the viewer.
    figures.sort_by(|a, b| a.feet.y.total_cmp(&b.feet.y));
    for figure in &figures {
        draw_figure(view, figure, draw_list);
    }
}

fn npc_facing(npc: &NpcAgent) -> Vec2 {
    let speed = npc.velocity.length();
    if speed > 0.0 {
        npc.velocity * speed.recip()
    } else if npc.facing_left {
        Vec2::new(-1.0, 0.0)
    } else {
        Vec2::new(1.0, 0.0)
    }
}

fn draw_figure(view: &FrameView, figure: &Figure, draw_list: &mut DrawList) {
    let body_radius = view.scaled(FIGURE_BODY_RADIUS);
    let head_radius = view.scaled(FIGURE_HEAD_RADIUS);
    let feet = figure.feet;
    let body = Vec2::new(feet.x, feet.y - body_radius);
    let head = Vec2::new(feet.x, body.y - body_radius - head_radius * 0.6);

    draw_list.fill_diamond(feet, body_radius, body_radius * 0.5, SHADOW_COLOR);
    draw_list.fill_circle(body, body_radius, figure.outfit);
    draw_list.fill_circle(head, head_radius, figure.skin);
    draw_list.fill_rect(
        Vec2::new(head.x - head_radius, head.y - head_radius),
        Vec2::new(head.x + head_radius, head.y - head_radius * 0.3),
        figure.hair,
    );
    if let Some(facing) = figure.facing {
        let nose = Vec2::new(
            head.x + facing.x * head_radius * 0.8,
            head.y + facing.y * head_radius * 0.4,
        );
        draw_list.fill_circle(nose, view.scaled(1.0), figure.hair);
    }
    if let Some(color) = figure.badge {
        draw_list.fill_rect(
            Vec2::new(body.x - body_radius * 0.5, body.y),
            Vec2::new(body.x + body_radius * 0.5, body.y + body_radius * 0.6),
            color,
        );
    }
    if let Some(color) = figure.highlight {
        draw_list.outline_circle(body, body_radius + 1.5, color);
    }
}

fn draw_particles(frame: &CityFrame<'_>, draw_list: &mut DrawList) {
    let view = &frame.view;
    for particle in frame.particles {
        let center = view.world_to_screen(particle.position);
        let mut fade = particle.life_fraction();
        if particle.kind == ParticleKind::Ambient {
            let age_ms = (frame.now_ms - particle.spawn_time_ms) as f32;
            fade *= 0.6 + 0.4 * (age_ms / AMBIENT_TWINKLE_PERIOD_MS).sin();
        }
        let color = particle.color.faded(fade);
        draw_list.fill_circle(center, view.scaled(particle.kind.radius()), color);
    }
}

#[cfg(test)]
mod tests {
    use engine::DrawCommand;

    use super::*;
    use crate::app::city::config::{AvatarColors, SimConfig};

    fn view(zoom: f32) -> FrameView {
        let config = SimConfig::default();
        let projection = IsoProjection {
            tile_width: config.tile_width,
            grid_width: config.iso_grid_width,
            grid_height: config.iso_grid_height,
            map_width: config.map_width,
            map_height: config.map_height,
        };
        FrameView::new(
            projection,
            Vec2::new(150.0, 175.0),
            zoom,
            Viewport {
                width: 1280,
                height: 720,
            },
        )
    }

    #[test]
    fn camera_position_lands_on_viewport_center() {
        let view = view(1.7);
        let screen = view.world_to_screen(Vec2::new(150.0, 175.0));
        assert!((screen.x - 640.0).abs() < 1e-3);
        assert!((screen.y - 360.0).abs() < 1e-3);
    }

    #[test]
    fn screen_to_world_inverts_world_to_screen() {
        let view = view(2.3);
        let world = Vec2::new(37.0, 291.0);
        let back = view.screen_to_world(view.world_to_screen(world));
        assert!((back.x - world.x).abs() < 1e-2);
        assert!((back.y - world.y).abs() < 1e-2);
    }

    #[test]
    fn road_tiles_run_along_every_fifth_row_and_column() {
        assert_eq!(ground_tile_color(0, 3), ROAD_COLOR);
        assert_eq!(ground_tile_color(7, 10), ROAD_COLOR);
        assert_eq!(ground_tile_color(5, 5), ROAD_COLOR);
        assert_eq!(ground_tile_color(1, 1), TILE_COLOR_LIGHT);
        assert_eq!(ground_tile_color(2, 3), TILE_COLOR_DARK);
    }

    #[test]
    fn ambient_motes_twinkle_with_age() {
        let avatar = Avatar::new(Vec2::new(150.0, 175.0), AvatarColors::default());
        let mote_color = Rgba::new(1, 2, 3, 200);
        let quarter_period_ms =
            f64::from(AMBIENT_TWINKLE_PERIOD_MS) * std::f64::consts::FRAC_PI_2;
        let mote = |spawn_time_ms: f64| Particle {
            position: Vec2::new(100.0, 100.0),
            velocity: Vec2::ZERO,
            color: mote_color,
            life_ms: 1_000.0,
            max_life_ms: 1_000.0,
            spawn_time_ms,
            kind: ParticleKind::Ambient,
        };
        let now_ms = 5_000.0;
        let particles = [mote(now_ms), mote(now_ms - quarter_period_ms)];
        let frame = CityFrame {
            view: view(1.0),
            job_sites: &[],
            property_sites: &[],
            active_job: None,
            selected_property: None,
            selected_npc: None,
            events: &[],
            now_ms,
            npcs: &[],
            avatar: &avatar,
            path: None,
            particles: &particles,
        };
        let mut list = DrawList::new();
        draw_city(&frame, &mut list);

        let alphas: Vec<u8> = list
            .commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::FillCircle { color, .. }
                    if (color.r, color.g, color.b) == (1, 2, 3) =>
                {
                    Some(color.a)
                }
                _ => None,
            })
            .collect();
        assert_eq!(alphas, vec![120, 200]);
    }

    #[test]
    fn property_palette_and_height_follow_kind_and_value() {
        assert_eq!(property_color(PropertyKind::Shop), Rgba::opaque(0xe9, 0x1e, 0x63));
        let plain = property_height(100_000.0, false);
        assert!((plain - (30.0 + 100_000f64.ln() as f32 * 5.0)).abs() < 1e-3);
        assert!((property_height(100_000.0, true) - plain * 1.2).abs() < 1e-3);
        assert!(property_height(0.0, false).is_finite());
    }

    #[test]
    fn city_frame_draws_ground_first_and_avatar_after_ground() {
        let config = SimConfig::default();
        let avatar = Avatar::new(Vec2::new(150.0, 175.0), AvatarColors::default());
        let frame = CityFrame {
            view: view(1.0),
            job_sites: &config.job_sites,
            property_sites: &config.property_sites,
            active_job: None,
            selected_property: None,
            selected_npc: None,
            events: &[],
            now_ms: 0.0,
            npcs: &[],
            avatar: &avatar,
            path: None,
            particles: &[],
        };
        let mut list = DrawList::new();
        draw_city(&frame, &mut list);

        let tiles = (config.iso_grid_width * config.iso_grid_height) as usize;
        assert!(list.len() > tiles * 2);
        assert!(matches!(list.commands()[0], DrawCommand::FillDiamond { .. }));
        let outfit_drawn = list.commands()[tiles * 2..].iter().any(|command| {
            matches!(command, DrawCommand::FillCircle { color, .. } if *color == avatar.colors.outfit)
        });
        assert!(outfit_drawn);
    }
}
