//! Hand joint feed: anchors, held-sword follow pose and gesture sampling

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::sim::launch;
use crate::sim::recall::RecallInput;
use crate::sim::state::{BodyRef, SimCommand, Sword, SwordId, SwordPhase};

/// Which hand a joint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chirality {
    Left,
    Right,
}

/// Tracked joints the simulation cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    /// Forearm wrist; reference frame for swing samples
    Wrist,
    ThumbTip,
    /// Index finger distal joint, just behind the tip
    IndexIntermediateTip,
    IndexTip,
    /// Any other joint (ignored)
    Other,
}

/// One joint's world transform for this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSample {
    pub joint: JointName,
    pub chirality: Chirality,
    pub transform: Mat4,
}

impl JointSample {
    pub fn new(joint: JointName, chirality: Chirality, transform: Mat4) -> Self {
        Self {
            joint,
            chirality,
            transform,
        }
    }

    /// Joint at `position` with identity rotation
    pub fn at(joint: JointName, chirality: Chirality, position: Vec3) -> Self {
        Self::new(joint, chirality, Mat4::from_translation(position))
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }
}

/// Last known positions of the joints that drive the sword
#[derive(Debug, Clone, Default)]
pub struct HandAnchors {
    pub right_index_tip: Option<Mat4>,
    pub right_index_intermediate: Option<Vec3>,
    pub right_wrist: Option<Mat4>,
    pub left_index_tip: Option<Vec3>,
    pub left_thumb_tip: Option<Vec3>,
}

impl HandAnchors {
    /// Update from this frame's samples. Returns true when a right index tip
    /// arrived (missing joints keep their last value).
    pub fn ingest(&mut self, joints: &[JointSample]) -> bool {
        let mut fresh_tip = false;
        for sample in joints {
            if !sample.transform.is_finite() {
                log::debug!("Dropping non-finite {:?} sample", sample.joint);
                continue;
            }
            match (sample.chirality, sample.joint) {
                (Chirality::Right, JointName::IndexTip) => {
                    self.right_index_tip = Some(sample.transform);
                    fresh_tip = true;
                }
                (Chirality::Right, JointName::IndexIntermediateTip) => {
                    self.right_index_intermediate = Some(sample.position());
                }
                (Chirality::Right, JointName::Wrist) => self.right_wrist = Some(sample.transform),
                (Chirality::Left, JointName::IndexTip) => {
                    self.left_index_tip = Some(sample.position());
                }
                (Chirality::Left, JointName::ThumbTip) => {
                    self.left_thumb_tip = Some(sample.position());
                }
                _ => {}
            }
        }
        fresh_tip
    }

    /// World position of the right index tip (the player anchor)
    pub fn player(&self) -> Option<Vec3> {
        self.right_index_tip.map(|tip| tip.w_axis.truncate())
    }

    /// Left index to left thumb distance
    pub fn pinch_distance(&self) -> Option<f32> {
        Some(self.left_index_tip?.distance(self.left_thumb_tip?))
    }

    /// Right index tip in the right wrist's frame (world position without a wrist)
    pub fn wrist_local_tip(&self) -> Option<Vec3> {
        let tip = self.right_index_tip?.w_axis.truncate();
        match self.right_wrist {
            Some(wrist) => Some(wrist.inverse().transform_point3(tip)),
            None => Some(tip),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Pose of a held sword: `offset` ahead of the fingertip along the finger,
/// facing back along the tip's basis turned half a turn about its up axis
pub fn follow_pose(tip: Mat4, intermediate: Option<Vec3>, offset: f32) -> (Vec3, Quat) {
    let (_, rotation, tip_position) = tip.to_scale_rotation_translation();

    let along_finger = intermediate
        .map(|joint| tip_position - joint)
        .filter(|dir| dir.length() > 1e-4)
        .map(Vec3::normalize);
    let direction = along_finger
        .or_else(|| {
            let z = tip.z_axis.truncate();
            (z.length() > 1e-4).then(|| z.normalize())
        })
        .unwrap_or(Vec3::NEG_Z);

    let orientation = (rotation * Quat::from_rotation_y(std::f32::consts::PI)).normalize();
    (tip_position + direction * offset, orientation)
}

/// What the sampler did with a sword this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// No fresh fingertip this frame
    Idle,
    Launched { velocity: Vec3 },
    /// Held sword snapped to the hand
    Following { position: Vec3, orientation: Quat },
    /// Fingertip recorded for remote steering
    Steering,
}

/// Turns the joint feed into anchors, swing samples and follow poses
#[derive(Debug, Clone, Default)]
pub struct GestureSampler {
    anchors: HandAnchors,
    fresh_tip: bool,
}

impl GestureSampler {
    /// Ingest this frame's joints
    pub fn observe(&mut self, joints: &[JointSample]) {
        self.fresh_tip = self.anchors.ingest(joints);
    }

    pub fn anchors(&self) -> &HandAnchors {
        &self.anchors
    }

    /// A right index tip arrived this frame
    pub fn has_fresh_tip(&self) -> bool {
        self.fresh_tip
    }

    pub fn recall_input(&self) -> RecallInput {
        RecallInput {
            pinch_distance: self.anchors.pinch_distance(),
            hand: self.anchors.player(),
        }
    }

    /// Feed the fingertip to one sword: swing sampling and launch while held,
    /// steering samples while flying
    pub fn sample(
        &self,
        id: SwordId,
        sword: &mut Sword,
        now: f64,
        commands: &mut Vec<SimCommand>,
    ) -> SampleOutcome {
        if !self.fresh_tip {
            return SampleOutcome::Idle;
        }
        let Some(tip) = self.anchors.right_index_tip else {
            return SampleOutcome::Idle;
        };

        if let SwordPhase::Flying(flight) = &mut sword.phase {
            flight.finger_history.push(tip.w_axis.truncate(), now);
            return SampleOutcome::Steering;
        }

        if let Some(local) = self.anchors.wrist_local_tip() {
            sword.pre_launch.push(local, now);
        }
        if let Some(velocity) =
            launch::try_launch(&sword.pre_launch, &sword.config, sword.last_launch_at, now)
        {
            sword.launch(id, velocity, now, commands);
            return SampleOutcome::Launched { velocity };
        }

        let (position, orientation) = follow_pose(
            tip,
            self.anchors.right_index_intermediate,
            sword.config.follow_offset,
        );
        sword.position = position;
        sword.orientation = orientation;
        commands.push(SimCommand::SetTransform {
            body: BodyRef::Sword(id),
            position,
            orientation,
        });
        SampleOutcome::Following {
            position,
            orientation,
        }
    }

    pub fn reset(&mut self) {
        self.anchors.clear();
        self.fresh_tip = false;
    }
}
