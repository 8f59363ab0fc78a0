//! Per-frame simulation tick
//!
//! Order inside one frame:
//! 1. joints → hand anchors, engine-reported sword positions
//! 2. engine collision events (contact damage, flight stops)
//! 3. gesture sampling (follow pose, swing launch, steering samples)
//! 4. pinch recall
//! 5. flying swords: sweep, steering, integration, homing, timeout
//! 6. combat (spawn, contact damage, pursuit, timers)
//! 7. flying sword transforms

use glam::Vec3;

use super::collision::{RaycastScene, classify, sweep_tip};
use super::combat::CombatFrame;
use super::flight::{self, FlightFrame};
use super::recall;
use super::state::{BodyRef, SimCommand, Simulation, StopReason, SwordId};
use crate::consts::*;
use crate::tracking::JointSample;

/// Host input for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Tracked joints this frame (may be empty or partial)
    pub joints: Vec<JointSample>,
    /// Positions of engine-driven flying swords
    pub body_positions: Vec<(SwordId, Vec3)>,
}

/// Advance the simulation by one rendered frame of `dt` seconds
pub fn tick(sim: &mut Simulation, input: &TickInput, scene: &dyn RaycastScene, dt: f64) {
    let dt = if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DT)
    } else {
        0.0
    };
    sim.clock += dt;
    let now = sim.clock;

    sim.sampler.observe(&input.joints);
    apply_body_positions(sim, &input.body_positions);
    drain_engine_collisions(sim);

    if dt <= 0.0 {
        return;
    }

    sample_gestures(sim, now);

    let recall_input = sim.sampler.recall_input();
    for id in sim.swords.handles() {
        if let Some(sword) = sim.swords.get_mut(id) {
            recall::update(sword, recall_input, now, dt);
        }
    }

    update_flights(sim, scene, now, dt);

    let frame = CombatFrame {
        now,
        dt,
        player: sim.sampler.anchors().player(),
    };
    let mut commands = std::mem::take(sim.commands_mut());
    sim.combat.update(frame, &sim.swords, &mut commands);
    *sim.commands_mut() = commands;

    emit_sword_transforms(sim);
}

fn apply_body_positions(sim: &mut Simulation, positions: &[(SwordId, Vec3)]) {
    if !sim.config.engine_driven_motion {
        return;
    }
    for &(id, position) in positions {
        match sim.swords.get_mut(id) {
            Some(sword) if sword.is_flying() && sword.physics_attached => {
                sword.position = position;
            }
            Some(_) => {}
            None => log::debug!("Position for unknown sword {:?}", id),
        }
    }
}

fn drain_engine_collisions(sim: &mut Simulation) {
    let events = sim.collision_inbox().drain();
    if events.is_empty() {
        return;
    }
    let mut commands = std::mem::take(sim.commands_mut());
    for event in events {
        for contact in classify(&event, &sim.swords) {
            if let BodyRef::Enemy(enemy) = contact.other
                && let Some(sword) = sim.swords.get(contact.sword)
            {
                sim.combat
                    .apply_hit(contact.sword, sword, enemy, contact.contact, &mut commands);
            }
            log::debug!("Engine collision: {:?} hit {:?}", contact.sword, contact.other);
            sim.stops.push(contact.sword, StopReason::EngineCollision);
        }
    }
    sim.stops.apply(&mut sim.swords, &mut commands);
    *sim.commands_mut() = commands;
}

fn sample_gestures(sim: &mut Simulation, now: f64) {
    if !sim.sampler.has_fresh_tip() {
        return;
    }
    let Some(id) = sim.active_sword else {
        return;
    };
    let mut commands = std::mem::take(sim.commands_mut());
    if let Some(sword) = sim.swords.get_mut(id) {
        sim.sampler.sample(id, sword, now, &mut commands);
    }
    *sim.commands_mut() = commands;
}

fn update_flights(sim: &mut Simulation, scene: &dyn RaycastScene, now: f64, dt: f64) {
    let frame = FlightFrame {
        hand: sim.sampler.anchors().player(),
        now,
        dt,
        engine_driven: sim.config.engine_driven_motion,
    };
    let mut commands = std::mem::take(sim.commands_mut());

    for id in sim.swords.handles() {
        let Some(sword) = sim.swords.get_mut(id) else {
            continue;
        };
        let Some(flight) = sword.flight_mut() else {
            continue;
        };
        flight.elapsed += dt;

        if sweep_tip(id, sword, scene, dt as f32).is_some() {
            sim.stops.push(id, StopReason::SweptRay);
            continue;
        }
        if let Some(reason) = flight::advance(id, sword, frame, &mut commands) {
            sim.stops.push(id, reason);
        }
    }

    sim.stops.apply(&mut sim.swords, &mut commands);
    *sim.commands_mut() = commands;
}

fn emit_sword_transforms(sim: &mut Simulation) {
    if sim.config.engine_driven_motion {
        return;
    }
    let transforms: Vec<SimCommand> = sim
        .swords
        .iter()
        .filter(|(_, sword)| sword.is_flying())
        .map(|(id, sword)| SimCommand::SetTransform {
            body: BodyRef::Sword(id),
            position: sword.position,
            orientation: sword.orientation,
        })
        .collect();
    sim.commands_mut().extend(transforms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimConfig, SwordFlightConfig};
    use crate::sim::collision::{NoScene, Shape, StaticScene};
    use crate::sim::state::{Steering, Sword};
    use crate::tracking::{Chirality, JointName};

    const DT: f64 = 1.0 / 60.0;

    fn tip_at(position: Vec3) -> TickInput {
        TickInput {
            joints: vec![JointSample::at(JointName::IndexTip, Chirality::Right, position)],
            ..Default::default()
        }
    }

    /// Put the active sword in flight without a swing
    fn launch(sim: &mut Simulation, velocity: Vec3) -> SwordId {
        let id = sim.active_sword.unwrap();
        let mut commands = Vec::new();
        let sword: &mut Sword = sim.swords.get_mut(id).unwrap();
        sword.launch(id, velocity, sim.clock, &mut commands);
        sword.flight_mut().unwrap().steering = Steering::Cruising;
        id
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut sim = Simulation::new(SimConfig::default());
        tick(&mut sim, &TickInput::default(), &NoScene, 5.0);
        assert!((sim.clock - MAX_FRAME_DT).abs() < 1e-12);
        tick(&mut sim, &TickInput::default(), &NoScene, -1.0);
        tick(&mut sim, &TickInput::default(), &NoScene, f64::NAN);
        assert!((sim.clock - MAX_FRAME_DT).abs() < 1e-12);
    }

    #[test]
    fn test_zero_dt_skips_integration() {
        let mut sim = Simulation::new(SimConfig::default());
        let id = launch(&mut sim, Vec3::Z);
        tick(&mut sim, &TickInput::default(), &NoScene, 0.0);
        let sword = sim.swords.get(id).unwrap();
        assert_eq!(sword.position, Vec3::ZERO);
        assert_eq!(sword.elapsed(), 0.0);
    }

    #[test]
    fn test_held_sword_follows_hand() {
        let mut sim = Simulation::new(SimConfig::default());
        tick(&mut sim, &tip_at(Vec3::new(0.0, 1.0, 0.0)), &NoScene, DT);
        let id = sim.active_sword.unwrap();
        let sword = sim.swords.get(id).unwrap();
        assert!(!sword.is_flying());
        // No intermediate joint: offset along the tip's +Z
        assert!((sword.position - Vec3::new(0.0, 1.0, 0.12)).length() < 1e-5);
        assert!(sim.drain_commands().iter().any(|c| matches!(
            c,
            SimCommand::SetTransform { body: BodyRef::Sword(_), .. }
        )));
    }

    #[test]
    fn test_flight_moves_and_emits_transform() {
        let mut sim = Simulation::new(SimConfig::default());
        let id = launch(&mut sim, Vec3::new(0.0, 0.0, 3.0));
        sim.drain_commands();
        tick(&mut sim, &TickInput::default(), &NoScene, DT);
        let sword = sim.swords.get(id).unwrap().clone();
        assert!((sword.position.z - 0.05).abs() < 1e-5);
        assert!((sword.elapsed() - DT).abs() < 1e-12);
        let commands = sim.drain_commands();
        assert!(commands.contains(&SimCommand::SetTransform {
            body: BodyRef::Sword(id),
            position: sword.position,
            orientation: sword.orientation,
        }));
    }

    #[test]
    fn test_swept_ray_stops_flight() {
        let mut sim = Simulation::new(SimConfig::default());
        let id = launch(&mut sim, Vec3::new(0.0, 0.0, 3.0));
        sim.swords.get_mut(id).unwrap().flight_mut().unwrap().elapsed = 1.2;
        let wall = StaticScene::new().with(
            BodyRef::Static(9),
            Shape::Aabb {
                min: Vec3::new(-1.0, -1.0, 0.5),
                max: Vec3::new(1.0, 1.0, 0.6),
            },
        );
        tick(&mut sim, &TickInput::default(), &wall, DT);
        let sword = sim.swords.get(id).unwrap();
        assert!(!sword.is_flying());
        assert!(!sword.physics_attached);
        assert!(sim
            .drain_commands()
            .contains(&SimCommand::DetachPhysics { sword: id }));
    }

    #[test]
    fn test_engine_collision_respects_delay() {
        let mut sim = Simulation::new(SimConfig::default());
        let id = launch(&mut sim, Vec3::Z);
        let feed = sim.collision_feed();

        feed.collision_began(BodyRef::Sword(id), BodyRef::Static(1), Vec3::ZERO);
        tick(&mut sim, &TickInput::default(), &NoScene, DT);
        assert!(sim.swords.get(id).unwrap().is_flying());

        sim.swords.get_mut(id).unwrap().flight_mut().unwrap().elapsed = 1.5;
        feed.collision_began(BodyRef::Static(1), BodyRef::Sword(id), Vec3::ZERO);
        tick(&mut sim, &TickInput::default(), &NoScene, DT);
        assert!(!sim.swords.get(id).unwrap().is_flying());
    }

    #[test]
    fn test_engine_enemy_contact_damages_then_stops() {
        let mut sim = Simulation::new(SimConfig::default());
        let mut commands = Vec::new();
        let enemy = sim
            .combat
            .spawn_at(Vec3::new(20.0, 0.0, 0.0), &mut commands)
            .unwrap();
        let id = launch(&mut sim, Vec3::new(2.0, 0.0, 0.0));
        sim.swords.get_mut(id).unwrap().flight_mut().unwrap().elapsed = 1.5;

        sim.collision_feed()
            .collision_began(BodyRef::Sword(id), BodyRef::Enemy(enemy), Vec3::new(19.5, 0.5, 0.0));
        tick(&mut sim, &TickInput::default(), &NoScene, DT);

        assert_eq!(sim.combat.enemy(enemy).unwrap().health, 80.0);
        assert!(!sim.swords.get(id).unwrap().is_flying());
        let commands = sim.drain_commands();
        assert!(commands.iter().any(|c| matches!(
            c,
            SimCommand::Damage { enemy: e, position, .. } if *e == enemy && position.x == 19.5
        )));
    }

    #[test]
    fn test_engine_driven_motion() {
        let config = SimConfig {
            engine_driven_motion: true,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(config);
        let id = launch(&mut sim, Vec3::new(0.0, 0.0, 3.0));
        sim.drain_commands();

        let input = TickInput {
            body_positions: vec![(id, Vec3::new(0.0, 0.0, 0.7))],
            ..Default::default()
        };
        tick(&mut sim, &input, &NoScene, DT);
        let sword = sim.swords.get(id).unwrap();
        assert_eq!(sword.position, Vec3::new(0.0, 0.0, 0.7));
        let commands = sim.drain_commands();
        assert!(commands
            .iter()
            .any(|c| matches!(c, SimCommand::SetLinearVelocity { sword, .. } if *sword == id)));
        assert!(!commands
            .iter()
            .any(|c| matches!(c, SimCommand::SetTransform { body: BodyRef::Sword(_), .. })));
    }

    #[test]
    fn test_pinch_recall_turns_sword_home() {
        let mut sim = Simulation::new(SimConfig::default());
        let id = launch(&mut sim, Vec3::new(0.0, 0.0, 2.0));
        sim.swords.get_mut(id).unwrap().position = Vec3::new(0.0, 1.0, 3.0);

        let input = TickInput {
            joints: vec![
                JointSample::at(JointName::IndexTip, Chirality::Right, Vec3::new(0.0, 1.0, 0.0)),
                JointSample::at(JointName::IndexTip, Chirality::Left, Vec3::new(-0.2, 1.0, 0.0)),
                JointSample::at(JointName::ThumbTip, Chirality::Left, Vec3::new(-0.21, 1.0, 0.0)),
            ],
            ..Default::default()
        };
        for _ in 0..120 {
            tick(&mut sim, &input, &NoScene, DT);
        }
        let sword = sim.swords.get(id).unwrap();
        assert!(sword.velocity().z < 0.0, "sword should head back toward the hand");
        assert!(matches!(sword.pinch, crate::sim::state::PinchState::Pressed { .. }));
    }

    #[test]
    fn test_end_session_grounds_swords() {
        let mut sim = Simulation::new(SimConfig {
            sword: Some(SwordFlightConfig::light()),
            ..SimConfig::default()
        });
        let id = launch(&mut sim, Vec3::Z);
        tick(&mut sim, &tip_at(Vec3::new(0.0, 1.0, 0.0)), &NoScene, DT);
        sim.end_session();
        assert!(!sim.swords.get(id).unwrap().is_flying());
        assert_eq!(sim.clock, 0.0);
        assert!(sim.combat.enemies().is_empty());
        assert!(sim.sampler.anchors().player().is_none());
    }
}
