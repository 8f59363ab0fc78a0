//! Frame-driven simulation module
//!
//! All flight and combat logic lives here:
//! - One `Simulation` context owns every cross-entity value
//! - Seeded RNG only (spawn placement)
//! - Stable iteration order (by entity slot)
//! - No rendering, tracking-provider or physics-engine dependencies

pub mod collision;
pub mod combat;
pub mod entity;
pub mod flight;
pub mod history;
pub mod launch;
pub mod recall;
pub mod state;
pub mod tick;
pub mod timers;

pub use collision::{
    CollisionBegan, CollisionFeed, NoScene, RayHit, RaycastScene, Shape, StaticScene,
    StopFlightQueue,
};
pub use combat::{AssetError, CombatDirector, DirectoryAssets, EnemyAssets, PresetAssets};
pub use entity::{EntityTable, Handle};
pub use history::{Sample, SampleHistory};
pub use launch::try_launch;
pub use state::{
    BodyRef, Enemy, EnemyId, EnemyLife, Flight, PhysicsAttachment, PinchState, SimCommand,
    Simulation, Steering, StopReason, Sword, SwordId, SwordPhase,
};
pub use tick::{TickInput, tick};
