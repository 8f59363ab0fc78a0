//! Flying Sword headless demo
//!
//! Drives the simulation with a scripted hand: hold, swing to launch,
//! steer, then pinch-recall while enemies spawn. Usage:
//!
//! ```text
//! flying-sword [config.json]
//! ```

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Flying Sword (headless) starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => flying_sword::SimConfig::load_or_default(path),
        None => flying_sword::SimConfig::default(),
    };
    demo::run(config);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts embed the library directly; there is no wasm entry point
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::collections::BTreeMap;

    use flying_sword::SimConfig;
    use flying_sword::sim::{BodyRef, Shape, SimCommand, Simulation, StaticScene, TickInput, tick};
    use flying_sword::tracking::{Chirality, JointName, JointSample};
    use glam::Vec3;

    const DT: f64 = 1.0 / 50.0;
    const HAND: Vec3 = Vec3::new(0.0, 1.2, 0.0);

    /// Scripted hand pose for one frame
    struct Pose {
        tip: Vec3,
        pinch: bool,
    }

    fn joints(pose: &Pose) -> Vec<JointSample> {
        let mut joints = vec![
            JointSample::at(JointName::IndexTip, Chirality::Right, pose.tip),
            JointSample::at(
                JointName::IndexIntermediateTip,
                Chirality::Right,
                pose.tip - Vec3::Z * 0.03,
            ),
        ];
        let left = HAND + Vec3::new(-0.3, 0.0, 0.0);
        let thumb_gap = if pose.pinch { 0.01 } else { 0.06 };
        joints.push(JointSample::at(JointName::IndexTip, Chirality::Left, left));
        joints.push(JointSample::at(
            JointName::ThumbTip,
            Chirality::Left,
            left + Vec3::X * thumb_gap,
        ));
        joints
    }

    fn command_kind(command: &SimCommand) -> &'static str {
        match command {
            SimCommand::SetTransform { body: BodyRef::Sword(_), .. } => "sword transform",
            SimCommand::SetTransform { .. } => "enemy transform",
            SimCommand::AttachPhysics { .. } => "attach physics",
            SimCommand::DetachPhysics { .. } => "detach physics",
            SimCommand::SetLinearVelocity { .. } => "linear velocity",
            SimCommand::Damage { .. } => "damage",
            SimCommand::SpawnEnemy { .. } => "spawn enemy",
            SimCommand::DespawnEnemy { .. } => "despawn enemy",
            SimCommand::ShowDamageNumber { .. } => "show damage number",
            SimCommand::ExpireDamageNumber { .. } => "expire damage number",
        }
    }

    pub fn run(config: SimConfig) {
        let seed = config.seed;
        let mut sim = Simulation::new(config);
        log::info!("Session initialized with seed: {}", seed);

        let scene = StaticScene::new().with(
            BodyRef::Static(0),
            Shape::Aabb {
                min: Vec3::new(-5.0, -0.1, 12.0),
                max: Vec3::new(5.0, 4.0, 12.5),
            },
        );

        // Hold, swing forward, fly with the hand still, then pinch to recall
        let mut script: Vec<Pose> = Vec::new();
        script.extend((0..30).map(|_| Pose { tip: HAND, pinch: false }));
        script.extend((1..=15).map(|i| Pose {
            tip: HAND + Vec3::Z * (1.5 * DT as f32 * i as f32),
            pinch: false,
        }));
        script.extend((0..100).map(|_| Pose { tip: HAND, pinch: false }));
        script.extend((0..300).map(|_| Pose { tip: HAND, pinch: true }));

        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut was_flying = false;
        for (frame, pose) in script.iter().enumerate() {
            let input = TickInput {
                joints: joints(pose),
                ..Default::default()
            };
            tick(&mut sim, &input, &scene, DT);

            for command in sim.drain_commands() {
                match &command {
                    SimCommand::SetTransform { .. } | SimCommand::SetLinearVelocity { .. } => {
                        log::trace!("{:?}", command)
                    }
                    _ => log::info!("frame {}: {:?}", frame, command),
                }
                *counts.entry(command_kind(&command)).or_default() += 1;
            }

            let Some(sword) = sim.active_sword.and_then(|id| sim.swords.get(id)) else {
                continue;
            };
            if sword.is_flying() != was_flying {
                was_flying = sword.is_flying();
                log::info!(
                    "frame {}: sword {} at {:?}, speed {:.2} m/s",
                    frame,
                    if was_flying { "flying" } else { "held" },
                    sword.position,
                    sword.velocity().length()
                );
            }
        }

        for (kind, count) in &counts {
            log::info!("{:>22}: {}", kind, count);
        }
        log::info!(
            "{} enemies alive after {:.1} s",
            sim.combat.enemies().len(),
            sim.clock
        );
        sim.end_session();
    }
}
