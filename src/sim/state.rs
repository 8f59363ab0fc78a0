//! Simulation state and core entity types
//!
//! Everything shared across entities (clock, hand anchors, swords, the combat
//! session, pending collision work) lives in one `Simulation` owned by the host.

use glam::{Quat, Vec3};

use super::collision::{CollisionFeed, CollisionInbox, StopFlightQueue, collision_channel};
use super::combat::{CombatDirector, EnemyAssets, PresetAssets};
use super::entity::{EntityTable, Handle};
use super::history::SampleHistory;
use crate::config::{EnemyConfig, SimConfig, SwordFlightConfig};
use crate::consts::*;
use crate::tracking::GestureSampler;

pub type SwordId = Handle<Sword>;
pub type EnemyId = Handle<Enemy>;

/// Smooth-turn sub-phase of a flying sword
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steering {
    /// Turning the launch facing toward the release velocity
    LaunchSettling { heading: Vec3 },
    /// Free flight
    Cruising,
    /// Turning back toward the controlling hand
    HomingReturn,
}

/// State that only exists while the sword is in the air
#[derive(Debug, Clone)]
pub struct Flight {
    pub velocity: Vec3,
    /// Accumulated frame time since launch
    pub elapsed: f64,
    pub steering: Steering,
    /// World-space fingertip samples for remote steering
    pub finger_history: SampleHistory,
    /// Blade tip position from the previous frame (swept-ray origin)
    pub last_tip: Option<Vec3>,
}

/// Held (tracking the hand) or flying
#[derive(Debug, Clone)]
pub enum SwordPhase {
    Held,
    Flying(Flight),
}

/// Left-hand pinch tracking
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PinchState {
    #[default]
    Released,
    Pressed {
        since: f64,
    },
}

impl PinchState {
    /// Seconds the current pinch has been held
    pub fn held_for(&self, now: f64) -> Option<f64> {
        match *self {
            PinchState::Released => None,
            PinchState::Pressed { since } => Some((now - since).max(0.0)),
        }
    }
}

/// Why a flight ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Physics engine reported a collision-begin
    EngineCollision,
    /// Blade-tip sweep hit something
    SweptRay,
    Timeout,
    HomingArrival,
    /// Combat session ended by the host
    SessionEnd,
}

/// A sword entity; persists across many flights
#[derive(Debug, Clone)]
pub struct Sword {
    pub config: SwordFlightConfig,
    pub phase: SwordPhase,
    pub position: Vec3,
    pub orientation: Quat,
    pub last_launch_at: Option<f64>,
    pub pinch: PinchState,
    /// Wrist-local fingertip samples collected while held
    pub pre_launch: SampleHistory,
    /// Dynamic physics components are attached on the host side
    pub physics_attached: bool,
}

impl Sword {
    pub fn new(config: SwordFlightConfig) -> Self {
        let pre_launch = SampleHistory::new(
            config.max_history_count,
            config.min_sample_interval,
            Some(config.velocity_window),
        );
        Self {
            config,
            phase: SwordPhase::Held,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            last_launch_at: None,
            pinch: PinchState::Released,
            pre_launch,
            physics_attached: false,
        }
    }

    #[inline]
    pub fn is_flying(&self) -> bool {
        matches!(self.phase, SwordPhase::Flying(_))
    }

    pub fn flight(&self) -> Option<&Flight> {
        match &self.phase {
            SwordPhase::Flying(flight) => Some(flight),
            SwordPhase::Held => None,
        }
    }

    pub fn flight_mut(&mut self) -> Option<&mut Flight> {
        match &mut self.phase {
            SwordPhase::Flying(flight) => Some(flight),
            SwordPhase::Held => None,
        }
    }

    /// Current velocity (zero while held)
    pub fn velocity(&self) -> Vec3 {
        self.flight().map(|f| f.velocity).unwrap_or(Vec3::ZERO)
    }

    /// Seconds since launch (zero while held)
    pub fn elapsed(&self) -> f64 {
        self.flight().map(|f| f.elapsed).unwrap_or(0.0)
    }

    /// Flying and past the post-launch collision grace window
    pub fn collisions_armed(&self) -> bool {
        self.flight()
            .is_some_and(|f| f.elapsed > self.config.collision_detection_delay)
    }

    /// Facing used to seed the launch settle turn
    pub fn forward(&self) -> Vec3 {
        (self.orientation * Vec3::Z).normalize_or_zero()
    }

    /// Switch to flight with the given release velocity
    pub fn launch(&mut self, id: SwordId, velocity: Vec3, now: f64, commands: &mut Vec<SimCommand>) {
        let heading = self.forward();
        let heading = if heading == Vec3::ZERO {
            velocity.normalize_or_zero()
        } else {
            heading
        };

        self.last_launch_at = Some(now);
        self.pre_launch.clear();
        self.phase = SwordPhase::Flying(Flight {
            velocity,
            elapsed: 0.0,
            steering: Steering::LaunchSettling { heading },
            finger_history: SampleHistory::new(
                self.config.max_finger_history_count,
                self.config.min_finger_sample_interval,
                None,
            ),
            last_tip: None,
        });

        commands.push(SimCommand::AttachPhysics {
            sword: id,
            attachment: PhysicsAttachment::for_sword(&self.config, velocity),
        });
        self.physics_attached = true;

        log::info!(
            "Sword {:?} launched at {:.1} cm/s toward {:?}",
            id,
            velocity.length() * 100.0,
            velocity.normalize_or_zero()
        );
    }

    /// End the current flight. Returns false if the sword was already held.
    pub fn stop_flight(
        &mut self,
        id: SwordId,
        reason: StopReason,
        commands: &mut Vec<SimCommand>,
    ) -> bool {
        if !self.is_flying() {
            return false;
        }
        self.phase = SwordPhase::Held;
        self.pinch = PinchState::Released;
        self.pre_launch.clear();
        if self.physics_attached {
            commands.push(SimCommand::DetachPhysics { sword: id });
            self.physics_attached = false;
        }
        log::info!("Sword {:?} stopped: {:?}", id, reason);
        true
    }

    /// Replace the tuning wholesale; an in-flight sword keeps flying with the new values
    pub fn set_config(&mut self, config: SwordFlightConfig) {
        self.pre_launch = SampleHistory::new(
            config.max_history_count,
            config.min_sample_interval,
            Some(config.velocity_window),
        );
        self.config = config;
    }
}

/// Enemy life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyLife {
    Active,
    /// Dead and fading out; removed when the fade timer fires
    Dying,
}

/// An enemy entity
#[derive(Debug, Clone)]
pub struct Enemy {
    pub max_health: f32,
    pub health: f32,
    pub move_speed: f32,
    pub target: Option<Vec3>,
    pub velocity: Vec3,
    pub position: Vec3,
    pub orientation: Quat,
    pub life: EnemyLife,
}

impl Enemy {
    pub fn new(config: &EnemyConfig, position: Vec3) -> Self {
        Self {
            max_health: config.max_health,
            health: config.max_health,
            move_speed: config.move_speed,
            target: None,
            velocity: Vec3::ZERO,
            position,
            orientation: Quat::IDENTITY,
            life: EnemyLife::Active,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Apply damage, clamping at zero. Returns true when this hit killed it.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        let was_alive = self.is_alive();
        self.health = (self.health - amount.max(0.0)).max(0.0);
        log::debug!(
            "Enemy took {:.1} damage, {:.1}/{:.1} left",
            amount,
            self.health,
            self.max_health
        );
        was_alive && !self.is_alive()
    }

    /// Unit direction to the target, or None when there is no target or it is
    /// already within arrival distance
    pub fn direction_to_target(&self) -> Option<Vec3> {
        let to_target = self.target? - self.position;
        if to_target.length() < ENEMY_ARRIVE_DISTANCE {
            return None;
        }
        Some(to_target.normalize())
    }
}

/// Something that can take part in a collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRef {
    Sword(SwordId),
    /// A child collider of a sword (guard, hilt, ...)
    SwordPart { sword: SwordId, part: u32 },
    Enemy(EnemyId),
    /// Host-side scene geometry
    Static(u32),
}

impl BodyRef {
    /// The sword this body belongs to, if any
    pub fn sword(&self) -> Option<SwordId> {
        match *self {
            BodyRef::Sword(id) | BodyRef::SwordPart { sword: id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn enemy(&self) -> Option<EnemyId> {
        match *self {
            BodyRef::Enemy(id) => Some(id),
            _ => None,
        }
    }
}

/// Physics components the host attaches to a launched sword
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsAttachment {
    /// Box collider extents
    pub collider_size: Vec3,
    pub mass: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
    pub linear_velocity: Vec3,
}

impl PhysicsAttachment {
    pub fn for_sword(config: &SwordFlightConfig, velocity: Vec3) -> Self {
        Self {
            collider_size: Vec3::new(
                SWORD_COLLIDER_WIDTH,
                SWORD_COLLIDER_WIDTH,
                config.sword_length,
            ),
            mass: config.sword_weight,
            static_friction: SWORD_STATIC_FRICTION,
            dynamic_friction: SWORD_DYNAMIC_FRICTION,
            restitution: SWORD_RESTITUTION,
            linear_velocity: velocity,
        }
    }
}

/// Output for the host scene (drained once per frame)
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    SetTransform {
        body: BodyRef,
        position: Vec3,
        orientation: Quat,
    },
    AttachPhysics {
        sword: SwordId,
        attachment: PhysicsAttachment,
    },
    DetachPhysics {
        sword: SwordId,
    },
    /// Engine-driven motion: the velocity the engine should integrate
    SetLinearVelocity {
        sword: SwordId,
        velocity: Vec3,
    },
    Damage {
        enemy: EnemyId,
        amount: f32,
        position: Vec3,
        source_direction: Vec3,
    },
    SpawnEnemy {
        enemy: EnemyId,
        position: Vec3,
        scale: f32,
    },
    DespawnEnemy {
        enemy: EnemyId,
    },
    ShowDamageNumber {
        id: u64,
        enemy: EnemyId,
        amount: f32,
    },
    ExpireDamageNumber {
        id: u64,
    },
}

/// Complete simulation context for one combat session
pub struct Simulation {
    pub config: SimConfig,
    /// Session clock (sum of frame dt)
    pub clock: f64,
    pub swords: EntityTable<Sword>,
    /// Sword driven by the right hand
    pub active_sword: Option<SwordId>,
    pub sampler: GestureSampler,
    pub combat: CombatDirector,
    pub stops: StopFlightQueue,
    collisions: CollisionInbox,
    feed: CollisionFeed,
    commands: Vec<SimCommand>,
}

impl Simulation {
    /// New session with built-in enemy presets
    pub fn new(config: SimConfig) -> Self {
        Self::with_assets(config, Box::new(PresetAssets))
    }

    /// New session resolving enemy templates through `assets`
    pub fn with_assets(config: SimConfig, assets: Box<dyn EnemyAssets>) -> Self {
        let (feed, collisions) = collision_channel();
        let combat = CombatDirector::new(config.combat.clone(), config.seed, assets);
        let mut sim = Self {
            config,
            clock: 0.0,
            swords: EntityTable::new(),
            active_sword: None,
            sampler: GestureSampler::default(),
            combat,
            stops: StopFlightQueue::default(),
            collisions,
            feed,
            commands: Vec::new(),
        };

        let sword = sim.spawn_sword(sim.config.sword_config());
        sim.active_sword = Some(sword);
        sim
    }

    /// Add a held sword
    pub fn spawn_sword(&mut self, config: SwordFlightConfig) -> SwordId {
        let id = self.swords.insert(Sword::new(config));
        log::info!("Spawned sword {:?}", id);
        id
    }

    /// Sender for physics-engine collision events (may be used from another thread)
    pub fn collision_feed(&self) -> CollisionFeed {
        self.feed.clone()
    }

    pub(crate) fn collision_inbox(&self) -> &CollisionInbox {
        &self.collisions
    }

    pub(crate) fn commands_mut(&mut self) -> &mut Vec<SimCommand> {
        &mut self.commands
    }

    /// Take every command produced since the last drain
    pub fn drain_commands(&mut self) -> Vec<SimCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Commands produced since the last drain
    pub fn pending_commands(&self) -> &[SimCommand] {
        &self.commands
    }

    /// End the combat session: ground every sword, drop enemies and anchors.
    /// The clock restarts at zero, so launch cooldowns restart too.
    pub fn end_session(&mut self) {
        for id in self.swords.handles() {
            if let Some(sword) = self.swords.get_mut(id) {
                sword.stop_flight(id, StopReason::SessionEnd, &mut self.commands);
                sword.pre_launch.clear();
                sword.last_launch_at = None;
            }
        }
        self.combat.reset(&mut self.commands);
        self.sampler.reset();
        self.stops.clear();
        while self.collisions.try_next().is_some() {}
        self.clock = 0.0;
        log::info!("Combat session ended");
    }
}
