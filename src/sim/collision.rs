//! Flight-ending collisions
//!
//! Two independent detectors feed one stop queue: collision-begin events from
//! the host physics engine, and a swept ray along the blade tip's path. A
//! stop for a sword that has already landed does nothing, so the two paths can
//! report the same impact without conflict.

use std::sync::mpsc::{self, Receiver, Sender};

use glam::Vec3;

use super::entity::EntityTable;
use super::state::{BodyRef, SimCommand, StopReason, Sword, SwordId};
use crate::consts::*;

/// One scene ray-cast hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyRef,
    /// Distance from the ray origin
    pub distance: f32,
    pub point: Vec3,
}

/// Scene query used by the blade-tip sweep
pub trait RaycastScene {
    /// Every hit along `direction` (unit) within `length`, nearest first
    fn raycast(&self, origin: Vec3, direction: Vec3, length: f32) -> Vec<RayHit>;
}

/// Scene with nothing to hit; disables the sweep
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScene;

impl RaycastScene for NoScene {
    fn raycast(&self, _origin: Vec3, _direction: Vec3, _length: f32) -> Vec<RayHit> {
        Vec::new()
    }
}

/// Collider shape for [`StaticScene`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    Aabb { min: Vec3, max: Vec3 },
}

impl Shape {
    /// Entry distance of a ray, 0 if the origin is inside
    pub fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        match *self {
            Shape::Sphere { center, radius } => ray_sphere(origin, direction, center, radius),
            Shape::Aabb { min, max } => ray_aabb(origin, direction, min, max),
        }
    }
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let c = oc.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = oc.dot(direction);
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    Some(-b - discriminant.sqrt())
}

fn ray_aabb(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = 0.0f32;
    let mut t_far = f32::INFINITY;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (t0, t1) = {
            let a = (min[axis] - o) * inv;
            let b = (max[axis] - o) * inv;
            if a <= b { (a, b) } else { (b, a) }
        };
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }
    Some(t_near)
}

/// A collider owned by some body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticCollider {
    pub body: BodyRef,
    pub shape: Shape,
}

/// Brute-force scene of spheres and boxes, for hosts without a physics engine
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    colliders: Vec<StaticCollider>,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, body: BodyRef, shape: Shape) {
        self.colliders.push(StaticCollider { body, shape });
    }

    /// Builder form of [`StaticScene::add`]
    pub fn with(mut self, body: BodyRef, shape: Shape) -> Self {
        self.add(body, shape);
        self
    }

    /// Drop every collider owned by `body`
    pub fn remove_body(&mut self, body: BodyRef) {
        self.colliders.retain(|c| c.body != body);
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl RaycastScene for StaticScene {
    fn raycast(&self, origin: Vec3, direction: Vec3, length: f32) -> Vec<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || length <= 0.0 {
            return Vec::new();
        }
        let mut hits: Vec<RayHit> = self
            .colliders
            .iter()
            .filter_map(|collider| {
                let distance = collider.shape.ray_distance(origin, direction)?;
                (distance <= length).then(|| RayHit {
                    body: collider.body,
                    distance,
                    point: origin + direction * distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

/// Sweep the blade tip along this frame's predicted path.
///
/// Returns the first hit that does not belong to the sword itself.
pub fn sweep_tip(
    id: SwordId,
    sword: &mut Sword,
    scene: &dyn RaycastScene,
    dt: f32,
) -> Option<RayHit> {
    let tip_offset = sword.config.tip_offset();
    let delay = sword.config.collision_detection_delay;
    let position = sword.position;
    let flight = sword.flight_mut()?;
    if flight.elapsed <= delay {
        return None;
    }
    let speed = flight.velocity.length();
    if speed <= MIN_SWEEP_SPEED {
        return None;
    }

    let tip = position + flight.velocity / speed * tip_offset;
    let previous = flight.last_tip.unwrap_or(tip);
    let expected = tip + flight.velocity * dt;
    let displacement = expected - previous;
    let distance = displacement.length();
    flight.last_tip = Some(tip);
    if distance <= MIN_SWEEP_DISPLACEMENT {
        return None;
    }

    let direction = displacement / distance;
    let hit = scene
        .raycast(previous, direction, distance + SWEEP_SAFETY_BUFFER)
        .into_iter()
        .find(|hit| hit.body.sword() != Some(id))?;
    log::debug!(
        "Sweep hit {:?} at {:.1} cm from {:?}",
        hit.body,
        hit.distance * 100.0,
        previous
    );
    Some(hit)
}

/// Collision-begin event reported by the host physics engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBegan {
    pub a: BodyRef,
    pub b: BodyRef,
    pub contact: Vec3,
}

/// An engine collision that ends a sword's flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineContact {
    pub sword: SwordId,
    pub other: BodyRef,
    pub contact: Vec3,
}

/// Contacts in `event` for armed, flying swords (none, one, or one per side)
pub fn classify(event: &CollisionBegan, swords: &EntityTable<Sword>) -> Vec<EngineContact> {
    [(event.a, event.b), (event.b, event.a)]
        .into_iter()
        .filter_map(|(mine, other)| {
            let id = mine.sword()?;
            if other.sword() == Some(id) {
                return None;
            }
            swords
                .get(id)
                .is_some_and(Sword::collisions_armed)
                .then_some(EngineContact {
                    sword: id,
                    other,
                    contact: event.contact,
                })
        })
        .collect()
}

/// Cloneable sender for engine collision events; may live on another thread
#[derive(Debug, Clone)]
pub struct CollisionFeed {
    sender: Sender<CollisionBegan>,
}

impl CollisionFeed {
    /// Returns false once the simulation has been dropped
    pub fn send(&self, event: CollisionBegan) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn collision_began(&self, a: BodyRef, b: BodyRef, contact: Vec3) -> bool {
        self.send(CollisionBegan { a, b, contact })
    }
}

/// Receiving end, drained by the simulation each tick
#[derive(Debug)]
pub struct CollisionInbox {
    receiver: Receiver<CollisionBegan>,
}

impl CollisionInbox {
    pub fn try_next(&self) -> Option<CollisionBegan> {
        self.receiver.try_recv().ok()
    }

    /// Everything queued so far
    pub fn drain(&self) -> Vec<CollisionBegan> {
        self.receiver.try_iter().collect()
    }
}

pub fn collision_channel() -> (CollisionFeed, CollisionInbox) {
    let (sender, receiver) = mpsc::channel();
    (CollisionFeed { sender }, CollisionInbox { receiver })
}

/// Pending flight stops, one per sword
#[derive(Debug, Clone, Default)]
pub struct StopFlightQueue {
    pending: Vec<(SwordId, StopReason)>,
}

impl StopFlightQueue {
    /// Queue a stop; a sword already queued keeps its first reason
    pub fn push(&mut self, sword: SwordId, reason: StopReason) {
        if !self.pending.iter().any(|(id, _)| *id == sword) {
            self.pending.push((sword, reason));
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Apply every queued stop. Returns how many swords actually landed.
    pub fn apply(&mut self, swords: &mut EntityTable<Sword>, commands: &mut Vec<SimCommand>) -> usize {
        self.pending
            .drain(..)
            .filter(|&(id, reason)| {
                swords
                    .get_mut(id)
                    .is_some_and(|sword| sword.stop_flight(id, reason, commands))
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwordFlightConfig;
    use crate::sim::state::EnemyId;

    fn armed_sword(swords: &mut EntityTable<Sword>, velocity: Vec3) -> SwordId {
        let id = swords.insert(Sword::new(SwordFlightConfig::standard()));
        let sword = swords.get_mut(id).unwrap();
        sword.launch(id, velocity, 0.0, &mut Vec::new());
        sword.flight_mut().unwrap().elapsed = 1.5;
        id
    }

    #[test]
    fn test_ray_shapes() {
        let sphere = Shape::Sphere {
            center: Vec3::new(0.0, 0.0, 5.0),
            radius: 1.0,
        };
        assert!((sphere.ray_distance(Vec3::ZERO, Vec3::Z).unwrap() - 4.0).abs() < 1e-5);
        assert_eq!(sphere.ray_distance(Vec3::ZERO, -Vec3::Z), None);
        assert_eq!(sphere.ray_distance(Vec3::new(0.0, 0.0, 5.0), Vec3::X), Some(0.0));

        let aabb = Shape::Aabb {
            min: Vec3::new(-1.0, -1.0, 2.0),
            max: Vec3::new(1.0, 1.0, 3.0),
        };
        assert!((aabb.ray_distance(Vec3::ZERO, Vec3::Z).unwrap() - 2.0).abs() < 1e-5);
        assert_eq!(aabb.ray_distance(Vec3::new(2.0, 0.0, 0.0), Vec3::Z), None);
    }

    #[test]
    fn test_static_scene_sorts_and_limits() {
        let scene = StaticScene::new()
            .with(
                BodyRef::Static(2),
                Shape::Sphere {
                    center: Vec3::new(0.0, 0.0, 8.0),
                    radius: 0.5,
                },
            )
            .with(
                BodyRef::Static(1),
                Shape::Sphere {
                    center: Vec3::new(0.0, 0.0, 3.0),
                    radius: 0.5,
                },
            );
        let hits = scene.raycast(Vec3::ZERO, Vec3::Z, 10.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].body, BodyRef::Static(1));
        assert_eq!(scene.raycast(Vec3::ZERO, Vec3::Z, 2.0).len(), 0);
    }

    #[test]
    fn test_sweep_hits_wall_ahead() {
        let mut swords = EntityTable::new();
        let id = armed_sword(&mut swords, Vec3::new(0.0, 0.0, 3.0));
        let scene = StaticScene::new().with(
            BodyRef::Static(7),
            Shape::Aabb {
                min: Vec3::new(-1.0, -1.0, 0.5),
                max: Vec3::new(1.0, 1.0, 0.6),
            },
        );
        let sword = swords.get_mut(id).unwrap();
        // Tip at z = 0.4, next tip at 0.45, buffer reaches 0.55
        let hit = sweep_tip(id, sword, &scene, 1.0 / 60.0).unwrap();
        assert_eq!(hit.body, BodyRef::Static(7));
        assert_eq!(sword.flight().unwrap().last_tip, Some(Vec3::new(0.0, 0.0, 0.4)));
    }

    #[test]
    fn test_sweep_ignores_own_colliders() {
        let mut swords = EntityTable::new();
        let id = armed_sword(&mut swords, Vec3::new(0.0, 0.0, 3.0));
        let scene = StaticScene::new().with(
            BodyRef::SwordPart { sword: id, part: 1 },
            Shape::Sphere {
                center: Vec3::new(0.0, 0.0, 0.45),
                radius: 0.1,
            },
        );
        assert!(sweep_tip(id, swords.get_mut(id).unwrap(), &scene, 1.0 / 60.0).is_none());
    }

    #[test]
    fn test_sweep_skips_during_delay_and_when_slow() {
        let mut swords = EntityTable::new();
        let id = armed_sword(&mut swords, Vec3::new(0.0, 0.0, 3.0));
        let wall = StaticScene::new().with(
            BodyRef::Static(0),
            Shape::Sphere {
                center: Vec3::new(0.0, 0.0, 0.42),
                radius: 0.1,
            },
        );
        let sword = swords.get_mut(id).unwrap();
        sword.flight_mut().unwrap().elapsed = 0.5;
        assert!(sweep_tip(id, sword, &wall, 1.0 / 60.0).is_none());
        assert!(sword.flight().unwrap().last_tip.is_none());

        let flight = sword.flight_mut().unwrap();
        flight.elapsed = 2.0;
        flight.velocity = Vec3::new(0.0, 0.0, 0.01);
        // 0.01 m/s over a frame moves the tip well under 1 mm
        assert!(sweep_tip(id, sword, &wall, 1.0 / 60.0).is_none());
        assert!(sword.flight().unwrap().last_tip.is_some());
    }

    #[test]
    fn test_classify_engine_events() {
        let mut swords = EntityTable::new();
        let id = armed_sword(&mut swords, Vec3::Z);
        let enemy: EnemyId = {
            let mut enemies = EntityTable::new();
            enemies.insert(crate::sim::state::Enemy::new(
                &crate::config::EnemyConfig::default(),
                Vec3::ZERO,
            ))
        };

        let hit = CollisionBegan {
            a: BodyRef::Enemy(enemy),
            b: BodyRef::Sword(id),
            contact: Vec3::ONE,
        };
        let contacts = classify(&hit, &swords);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].sword, id);
        assert_eq!(contacts[0].other, BodyRef::Enemy(enemy));

        let own = CollisionBegan {
            a: BodyRef::Sword(id),
            b: BodyRef::SwordPart { sword: id, part: 0 },
            contact: Vec3::ZERO,
        };
        assert!(classify(&own, &swords).is_empty());

        swords.get_mut(id).unwrap().flight_mut().unwrap().elapsed = 0.2;
        assert!(classify(&hit, &swords).is_empty());
    }

    #[test]
    fn test_stop_queue_is_idempotent() {
        let mut swords = EntityTable::new();
        let id = armed_sword(&mut swords, Vec3::Z);
        let mut queue = StopFlightQueue::default();
        let mut commands = Vec::new();

        queue.push(id, StopReason::EngineCollision);
        queue.push(id, StopReason::SweptRay);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.apply(&mut swords, &mut commands), 1);
        assert!(!swords.get(id).unwrap().is_flying());

        queue.push(id, StopReason::SweptRay);
        assert_eq!(queue.apply(&mut swords, &mut commands), 0);
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_feed_crosses_threads() {
        let (feed, inbox) = collision_channel();
        let mut swords = EntityTable::new();
        let id = armed_sword(&mut swords, Vec3::Z);
        let worker = feed.clone();
        std::thread::spawn(move || {
            worker.collision_began(BodyRef::Sword(id), BodyRef::Static(1), Vec3::ZERO);
        })
        .join()
        .unwrap();
        let events = inbox.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].b, BodyRef::Static(1));
        assert!(inbox.try_next().is_none());
    }
}
