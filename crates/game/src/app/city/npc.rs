use std::collections::VecDeque;

use engine::{Rgba, Vec2};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use super::config::SimConfig;

pub(crate) const NPC_ARRIVAL_RADIUS: f32 = 3.0;
pub(crate) const NPC_PICK_RADIUS: f32 = 20.0;
pub(crate) const MIN_IDLE_MS: f32 = 833.0;
pub(crate) const MAX_IDLE_MS: f32 = 2_500.0;
pub(crate) const MIN_WALK_SPEED: f32 = 60.0;
pub(crate) const MAX_WALK_SPEED: f32 = 90.0;
const WANDER_OFFSET: f32 = 50.0;
const WALK_CHANCE: f64 = 0.5;
pub(crate) const EVENT_CHANCE_PER_FRAME: f64 = 0.0015;
pub(crate) const EVENT_DURATION_MS: f64 = 3_000.0;
pub(crate) const EVENT_HISTORY_LEN: usize = 20;

const NPC_NAMES: [&str; 16] = [
    "Maria", "Juan", "Rosa", "Jose", "Ana", "Miguel", "Carmen", "Luis", "Elena", "Carlos",
    "Sofia", "Diego", "Isabella", "Manuel", "Lucia", "Rafael",
];

const SKIN_TONES: [Rgba; 4] = [
    Rgba::opaque(0xfd, 0xbf, 0x5f),
    Rgba::opaque(0xe8, 0xb8, 0x91),
    Rgba::opaque(0xd4, 0xa5, 0x74),
    Rgba::opaque(0xc8, 0x94, 0x58),
];

const HAIR_COLORS: [Rgba; 4] = [
    Rgba::opaque(0x1a, 0x1a, 0x1a),
    Rgba::opaque(0x2c, 0x18, 0x10),
    Rgba::opaque(0x4a, 0x2c, 0x1a),
    Rgba::opaque(0x6b, 0x34, 0x10),
];

const OUTFIT_COLORS: [Rgba; 5] = [
    Rgba::opaque(0x3f, 0x51, 0xb5),
    Rgba::opaque(0xe9, 0x1e, 0x63),
    Rgba::opaque(0x00, 0xbc, 0xd4),
    Rgba::opaque(0xff, 0x98, 0x00),
    Rgba::opaque(0x4c, 0xaf, 0x50),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NpcKind {
    Vendor,
    Traveler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NpcBehavior {
    Idle,
    Walking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NpcAppearance {
    pub(crate) skin: Rgba,
    pub(crate) hair: Rgba,
    pub(crate) outfit: Rgba,
}

/// Autonomous city resident. Speeds are in world units per second.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NpcAgent {
    pub(crate) id: u32,
    pub(crate) name: &'static str,
    pub(crate) job_name: Option<String>,
    pub(crate) kind: NpcKind,
    pub(crate) position: Vec2,
    pub(crate) target: Vec2,
    pub(crate) behavior: NpcBehavior,
    pub(crate) speed: f32,
    pub(crate) idle_timer_ms: f32,
    pub(crate) idle_duration_ms: f32,
    pub(crate) velocity: Vec2,
    pub(crate) facing_left: bool,
    pub(crate) appearance: NpcAppearance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SimEventKind {
    MarketBoom,
    MarketCrash,
    Opportunity,
    Challenge,
}

impl SimEventKind {
    pub(crate) const ALL: [SimEventKind; 4] = [
        SimEventKind::MarketBoom,
        SimEventKind::MarketCrash,
        SimEventKind::Opportunity,
        SimEventKind::Challenge,
    ];

    pub(crate) fn intensity(self) -> f32 {
        match self {
            Self::MarketBoom => 0.3,
            Self::MarketCrash => 0.2,
            Self::Opportunity => 0.4,
            Self::Challenge => 0.5,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::MarketBoom => "market_boom",
            Self::MarketCrash => "market_crash",
            Self::Opportunity => "opportunity",
            Self::Challenge => "challenge",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimEvent {
    pub(crate) id: u64,
    pub(crate) kind: SimEventKind,
    pub(crate) position: Vec2,
    pub(crate) created_at_ms: f64,
    pub(crate) duration_ms: f64,
}

impl SimEvent {
    pub(crate) fn is_expired(&self, now_ms: f64) -> bool {
        now_ms - self.created_at_ms >= self.duration_ms
    }

    /// Fraction of the lifetime already elapsed, in `[0, 1]`.
    pub(crate) fn progress(&self, now_ms: f64) -> f32 {
        if !(self.duration_ms > 0.0) {
            return 1.0;
        }
        ((now_ms - self.created_at_ms) / self.duration_ms).clamp(0.0, 1.0) as f32
    }
}

pub(crate) struct NpcManager {
    agents: Vec<NpcAgent>,
    events: Vec<SimEvent>,
    history: VecDeque<SimEvent>,
    next_event_id: u64,
    map_width: f32,
    map_height: f32,
    rng: StdRng,
}

impl NpcManager {
    /// Places one vendor per job site and `wanderer_count` travelers.
    pub(crate) fn new(config: &SimConfig, rng: StdRng) -> Self {
        let mut manager = Self {
            agents: Vec::with_capacity(config.job_sites.len() + config.wanderer_count),
            events: Vec::new(),
            history: VecDeque::with_capacity(EVENT_HISTORY_LEN),
            next_event_id: 1,
            map_width: config.map_width,
            map_height: config.map_height,
            rng,
        };

        for site in &config.job_sites {
            let job_name = if site.name.trim().is_empty() {
                warn!(
                    x = site.position.x,
                    y = site.position.y,
                    "job_site_without_name_using_default"
                );
                "Vendor".to_string()
            } else {
                site.name.clone()
            };
            let position = manager.clamp_to_world(site.position.to_vec2());
            let agent = manager.new_agent(NpcKind::Vendor, Some(job_name), position);
            manager.agents.push(agent);
        }

        for _ in 0..config.wanderer_count {
            let position = Vec2::new(
                manager.rng.gen_range(0.0..=manager.map_width),
                manager.rng.gen_range(0.0..=manager.map_height),
            );
            let mut agent = manager.new_agent(NpcKind::Traveler, None, position);
            agent.target = manager.wander_target(position);
            agent.behavior = NpcBehavior::Walking;
            manager.agents.push(agent);
        }

        info!(
            vendors = config.job_sites.len(),
            travelers = config.wanderer_count,
            "npcs_initialized"
        );
        manager
    }

    pub(crate) fn agents(&self) -> &[NpcAgent] {
        &self.agents
    }

    #[cfg(test)]
    pub(crate) fn agents_mut(&mut self) -> &mut [NpcAgent] {
        &mut self.agents
    }

    pub(crate) fn active_events(&self) -> &[SimEvent] {
        &self.events
    }

    pub(crate) fn event_history(&self) -> impl Iterator<Item = &SimEvent> + '_ {
        self.history.iter()
    }

    pub(crate) fn update(&mut self, dt_seconds: f32, now_ms: f64, frame_scale: f32) {
        if !(dt_seconds > 0.0) {
            return;
        }
        let dt_ms = dt_seconds * 1_000.0;
        for index in 0..self.agents.len() {
            self.update_agent(index, dt_ms, dt_seconds);
        }

        let chance = 1.0 - (1.0 - EVENT_CHANCE_PER_FRAME).powf(f64::from(frame_scale.max(0.0)));
        if self.rng.gen_bool(chance.clamp(0.0, 1.0)) {
            self.spawn_event(now_ms);
        }
        self.prune_events(now_ms);
    }

    /// Starts a random event somewhere in the world.
    pub(crate) fn spawn_event(&mut self, now_ms: f64) -> &SimEvent {
        let kind = SimEventKind::ALL[self.rng.gen_range(0..SimEventKind::ALL.len())];
        let position = Vec2::new(
            self.rng.gen_range(0.0..=self.map_width),
            self.rng.gen_range(0.0..=self.map_height),
        );
        let event = SimEvent {
            id: self.next_event_id,
            kind,
            position,
            created_at_ms: now_ms,
            duration_ms: EVENT_DURATION_MS,
        };
        self.next_event_id = self.next_event_id.saturating_add(1);
        info!(
            id = event.id,
            kind = kind.label(),
            intensity = kind.intensity(),
            x = position.x,
            y = position.y,
            "sim_event_started"
        );

        if self.history.len() == EVENT_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(event.clone());
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Nearest agent strictly closer than `radius`.
    pub(crate) fn npc_at(&self, position: Vec2, radius: f32) -> Option<&NpcAgent> {
        self.agents
            .iter()
            .map(|agent| (agent, agent.position.distance(position)))
            .filter(|(_, distance)| *distance < radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(agent, _)| agent)
    }

    fn prune_events(&mut self, now_ms: f64) {
        let before = self.events.len();
        self.events.retain(|event| !event.is_expired(now_ms));
        let expired = before - self.events.len();
        if expired > 0 {
            debug!(expired, active = self.events.len(), "sim_events_expired");
        }
    }

    fn update_agent(&mut self, index: usize, dt_ms: f32, dt_seconds: f32) {
        let behavior = self.agents[index].behavior;
        match behavior {
            NpcBehavior::Idle => {
                let agent = &mut self.agents[index];
                agent.idle_timer_ms += dt_ms;
                if agent.idle_timer_ms <= agent.idle_duration_ms {
                    return;
                }
                let position = agent.position;
                let next_duration = self.rng.gen_range(MIN_IDLE_MS..=MAX_IDLE_MS);
                let walk = self.rng.gen_bool(WALK_CHANCE);
                let target = if walk {
                    Some(self.wander_target(position))
                } else {
                    None
                };

                let agent = &mut self.agents[index];
                agent.idle_timer_ms = 0.0;
                agent.idle_duration_ms = next_duration;
                if let Some(target) = target {
                    agent.target = target;
                    agent.behavior = NpcBehavior::Walking;
                }
            }
            NpcBehavior::Walking => {
                let (map_width, map_height) = (self.map_width, self.map_height);
                let agent = &mut self.agents[index];
                let delta = agent.target - agent.position;
                let distance = delta.length();
                if distance < NPC_ARRIVAL_RADIUS {
                    agent.behavior = NpcBehavior::Idle;
                    agent.velocity = Vec2::ZERO;
                    agent.idle_timer_ms = 0.0;
                    return;
                }
                let direction = delta * distance.recip();
                agent.velocity = direction * agent.speed;
                let step = (agent.speed * dt_seconds).min(distance);
                let next = agent.position + direction * step;
                agent.position = Vec2::new(
                    next.x.clamp(0.0, map_width),
                    next.y.clamp(0.0, map_height),
                );
                if delta.x != 0.0 {
                    agent.facing_left = delta.x < 0.0;
                }
            }
        }
    }

    fn new_agent(&mut self, kind: NpcKind, job_name: Option<String>, position: Vec2) -> NpcAgent {
        let id = self.agents.len() as u32 + 1;
        NpcAgent {
            id,
            name: NPC_NAMES[self.rng.gen_range(0..NPC_NAMES.len())],
            job_name,
            kind,
            position,
            target: position,
            behavior: NpcBehavior::Idle,
            speed: self.rng.gen_range(MIN_WALK_SPEED..=MAX_WALK_SPEED),
            idle_timer_ms: 0.0,
            idle_duration_ms: self.rng.gen_range(MIN_IDLE_MS..=MAX_IDLE_MS),
            velocity: Vec2::ZERO,
            facing_left: false,
            appearance: NpcAppearance {
                skin: SKIN_TONES[self.rng.gen_range(0..SKIN_TONES.len())],
                hair: HAIR_COLORS[self.rng.gen_range(0..HAIR_COLORS.len())],
                outfit: OUTFIT_COLORS[self.rng.gen_range(0..OUTFIT_COLORS.len())],
            },
        }
    }

    fn wander_target(&mut self, from: Vec2) -> Vec2 {
        let offset = Vec2::new(
            self.rng.gen_range(-WANDER_OFFSET..=WANDER_OFFSET),
            self.rng.gen_range(-WANDER_OFFSET..=WANDER_OFFSET),
        );
        self.clamp_to_world(from + offset)
    }

    fn clamp_to_world(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(0.0, self.map_width),
            point.y.clamp(0.0, self.map_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    const TICK_SECONDS: f32 = 1.0 / 60.0;

    fn manager(seed: u64) -> NpcManager {
        NpcManager::new(&SimConfig::default(), StdRng::seed_from_u64(seed))
    }

    fn run(manager: &mut NpcManager, ticks: u32) {
        for tick in 0..ticks {
            let now_ms = f64::from(tick + 1) * f64::from(TICK_SECONDS) * 1_000.0;
            manager.update(TICK_SECONDS, now_ms, 1.0);
        }
    }

    #[test]
    fn population_has_one_vendor_per_job_and_configured_travelers() {
        let config = SimConfig::default();
        let manager = manager(1);
        let vendors: Vec<_> = manager
            .agents()
            .iter()
            .filter(|agent| agent.kind == NpcKind::Vendor)
            .collect();
        assert_eq!(vendors.len(), config.job_sites.len());
        for (vendor, site) in vendors.iter().zip(&config.job_sites) {
            assert_eq!(vendor.job_name.as_deref(), Some(site.name.as_str()));
            assert_eq!(vendor.position, site.position.to_vec2());
            assert_eq!(vendor.behavior, NpcBehavior::Idle);
        }

        let travelers: Vec<_> = manager
            .agents()
            .iter()
            .filter(|agent| agent.kind == NpcKind::Traveler)
            .collect();
        assert_eq!(travelers.len(), config.wanderer_count);
        assert!(travelers
            .iter()
            .all(|agent| agent.behavior == NpcBehavior::Walking));
    }

    #[test]
    fn generated_attributes_stay_in_documented_ranges() {
        let manager = manager(2);
        for agent in manager.agents() {
            assert!((MIN_WALK_SPEED..=MAX_WALK_SPEED).contains(&agent.speed));
            assert!((MIN_IDLE_MS..=MAX_IDLE_MS).contains(&agent.idle_duration_ms));
            assert!(NPC_NAMES.contains(&agent.name));
            assert!(agent.target.distance(agent.position) <= WANDER_OFFSET * 2f32.sqrt() + 1e-3);
        }
    }

    #[test]
    fn same_seed_produces_identical_simulation() {
        let mut a = manager(42);
        let mut b = manager(42);
        run(&mut a, 600);
        run(&mut b, 600);
        assert_eq!(a.agents(), b.agents());
        assert_eq!(a.active_events(), b.active_events());
    }

    #[test]
    fn agents_cycle_between_idle_and_walking_within_bounds() {
        let mut manager = manager(7);
        let count = manager.agents().len();
        let mut seen_idle = vec![false; count];
        let mut seen_walking = vec![false; count];

        for tick in 0..(60 * 60) {
            let now_ms = f64::from(tick) * 1_000.0 / 60.0;
            manager.update(TICK_SECONDS, now_ms, 1.0);
            for (index, agent) in manager.agents().iter().enumerate() {
                assert!((0.0..=300.0).contains(&agent.position.x));
                assert!((0.0..=350.0).contains(&agent.position.y));
                match agent.behavior {
                    NpcBehavior::Idle => {
                        seen_idle[index] = true;
                        assert_eq!(agent.velocity, Vec2::ZERO);
                    }
                    NpcBehavior::Walking => seen_walking[index] = true,
                }
            }
        }

        assert!(seen_idle.iter().all(|seen| *seen));
        assert!(seen_walking.iter().all(|seen| *seen));
    }

    #[test]
    fn walking_agent_within_arrival_radius_goes_idle() {
        let mut manager = manager(3);
        {
            let agent = &mut manager.agents_mut()[0];
            agent.behavior = NpcBehavior::Walking;
            agent.target = agent.position + Vec2::new(2.0, 0.0);
            agent.velocity = Vec2::new(60.0, 0.0);
            agent.idle_timer_ms = 400.0;
        }

        manager.update_agent(0, 16.0, 0.016);

        let agent = &manager.agents()[0];
        assert_eq!(agent.behavior, NpcBehavior::Idle);
        assert_eq!(agent.velocity, Vec2::ZERO);
        assert_eq!(agent.idle_timer_ms, 0.0);
    }

    #[test]
    fn walking_agent_steers_without_overshooting() {
        let mut manager = manager(4);
        let start = {
            let agent = &mut manager.agents_mut()[0];
            agent.behavior = NpcBehavior::Walking;
            agent.target = agent.position - Vec2::new(5.0, 0.0);
            agent.position
        };

        manager.update_agent(0, 100.0, 0.1);

        let agent = &manager.agents()[0];
        assert_eq!(agent.position, start - Vec2::new(5.0, 0.0));
        assert!(agent.facing_left);
        assert!((agent.velocity.length() - agent.speed).abs() < 1e-3);
    }

    #[test]
    fn idle_expiry_resets_timer_and_draws_new_duration() {
        let mut manager = manager(5);
        {
            let agent = &mut manager.agents_mut()[0];
            agent.idle_timer_ms = agent.idle_duration_ms;
        }

        manager.update_agent(0, 1.0, 0.001);

        let agent = &manager.agents()[0];
        assert_eq!(agent.idle_timer_ms, 0.0);
        assert!((MIN_IDLE_MS..=MAX_IDLE_MS).contains(&agent.idle_duration_ms));
        if agent.behavior == NpcBehavior::Walking {
            assert!(agent.target.x >= agent.position.x - WANDER_OFFSET);
            assert!(agent.target.x <= agent.position.x + WANDER_OFFSET);
        }
    }

    #[test]
    fn idle_agent_holds_still_and_walks_only_once_its_timer_runs_out() {
        let mut manager = manager(1);
        let dt_ms = 16.0;
        let mut walks = 0;

        for _ in 0..20_000 {
            let before = manager.agents()[0].clone();
            manager.update_agent(0, dt_ms, dt_ms / 1_000.0);
            let after = &manager.agents()[0];
            if before.behavior != NpcBehavior::Idle {
                continue;
            }

            assert_eq!(after.position, before.position);
            let expired = before.idle_timer_ms + dt_ms > before.idle_duration_ms;
            if expired {
                assert_eq!(after.idle_timer_ms, 0.0);
            } else {
                assert_eq!(after.behavior, NpcBehavior::Idle);
                assert_eq!(after.idle_timer_ms, before.idle_timer_ms + dt_ms);
                assert_eq!(after.idle_duration_ms, before.idle_duration_ms);
            }
            if after.behavior == NpcBehavior::Walking {
                assert!(expired);
                walks += 1;
            }
        }

        assert!(walks > 0);
    }

    #[test]
    fn events_expire_after_their_lifetime_and_history_is_bounded() {
        let mut manager = manager(6);
        for index in 0..(EVENT_HISTORY_LEN + 5) {
            manager.spawn_event(index as f64);
        }
        assert_eq!(manager.event_history().count(), EVENT_HISTORY_LEN);
        assert_eq!(manager.event_history().next().map(|event| event.id), Some(6));

        manager.prune_events(EVENT_DURATION_MS - 1.0);
        assert!(!manager.active_events().is_empty());
        manager.prune_events(EVENT_DURATION_MS + 100.0);
        assert!(manager.active_events().is_empty());
        assert_eq!(manager.event_history().count(), EVENT_HISTORY_LEN);
    }

    #[test]
    fn event_progress_runs_from_zero_to_one() {
        let event = SimEvent {
            id: 1,
            kind: SimEventKind::Opportunity,
            position: Vec2::ZERO,
            created_at_ms: 1_000.0,
            duration_ms: EVENT_DURATION_MS,
        };
        assert_eq!(event.progress(1_000.0), 0.0);
        assert!((event.progress(2_500.0) - 0.5).abs() < 1e-6);
        assert_eq!(event.progress(10_000.0), 1.0);
        assert!(event.is_expired(4_000.0));
        assert!((SimEventKind::Challenge.intensity() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn npc_at_returns_nearest_agent_inside_radius() {
        let mut manager = manager(8);
        manager.agents_mut()[0].position = Vec2::new(10.0, 10.0);
        manager.agents_mut()[1].position = Vec2::new(14.0, 10.0);
        for agent in manager.agents_mut().iter_mut().skip(2) {
            agent.position = Vec2::new(250.0, 300.0);
        }

        let hit = manager.npc_at(Vec2::new(13.0, 10.0), NPC_PICK_RADIUS).expect("hit");
        assert_eq!(hit.id, manager.agents()[1].id);
        assert!(manager.npc_at(Vec2::new(100.0, 100.0), NPC_PICK_RADIUS).is_none());
        assert!(manager.npc_at(Vec2::new(30.0, 10.0), 16.0).is_none());
    }
}
