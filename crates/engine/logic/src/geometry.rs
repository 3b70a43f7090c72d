//! Geometry primitives shared by rules and scene implementations
//!
//! Only glam types are used here so the rule engine stays independent of any
//! physics backend.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World-axis box, used for object bounds and box fill volumes
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_size(center: Vec3, half_size: Vec3) -> Self {
        Self::new(center - half_size, center + half_size)
    }

    /// Bounds of this local box after scaling, rotating and translating it
    ///
    /// Rotated boxes grow to enclose all eight transformed corners.
    pub fn to_world(&self, position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let (lo, hi) = (0..8u8).fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), i| {
            let corner = Vec3::select(
                glam::BVec3::new(i & 1 != 0, i & 2 != 0, i & 4 != 0),
                self.max,
                self.min,
            );
            let world = position + rotation * (corner * scale);
            (lo.min(world), hi.max(world))
        });
        Self::new(lo, hi)
    }

    /// Inclusive point containment
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// World-space position and orientation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Map a point from this pose's local frame into world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// Map a world-space point into this pose's local frame
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.orientation.inverse() * (world - self.position)
    }

    /// Whether every component is finite and the orientation is normalizable
    pub fn is_valid(&self) -> bool {
        self.position.is_finite()
            && self.orientation.is_finite()
            && self.orientation.length_squared() > f32::EPSILON
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// Interior region of a container, expressed in the container's local frame
///
/// Scene implementations report the volume once; rules combine it with the
/// container's current pose on every test, so a cached volume stays valid
/// while the container moves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillVolume {
    /// Local-frame box
    Box(Aabb),
    /// Local-frame sphere
    Sphere { center: Vec3, radius: f32 },
    /// Vertical cylinder along local +Y
    Cylinder {
        base: Vec3,
        radius: f32,
        height: f32,
    },
}

impl FillVolume {
    /// Test a local-frame point
    pub fn contains_local(&self, local: Vec3) -> bool {
        match *self {
            FillVolume::Box(aabb) => aabb.contains_point(local),
            FillVolume::Sphere { center, radius } => local.distance_squared(center) <= radius * radius,
            FillVolume::Cylinder {
                base,
                radius,
                height,
            } => {
                let d = local - base;
                d.y >= 0.0 && d.y <= height && d.x * d.x + d.z * d.z <= radius * radius
            }
        }
    }

    /// Test a world-space point against this volume attached to `pose`
    pub fn contains(&self, pose: &Pose, world: Vec3) -> bool {
        self.contains_local(pose.inverse_transform_point(world))
    }
}

/// Average a set of poses
///
/// Positions are averaged arithmetically. Orientations are summed after being
/// flipped into the hemisphere of the first one, then normalized. Returns
/// `None` for an empty set or when the summed orientation cancels out.
pub fn mean_pose(poses: &[Pose]) -> Option<Pose> {
    let first = poses.first()?;
    let n = poses.len() as f32;

    let mut position = Vec3::ZERO;
    let mut orientation = glam::Vec4::ZERO;
    let reference = glam::Vec4::from(first.orientation);

    for pose in poses {
        position += pose.position;
        let q = glam::Vec4::from(pose.orientation);
        orientation += if q.dot(reference) < 0.0 { -q } else { q };
    }

    let length = orientation.length();
    if !length.is_finite() || length <= f32::EPSILON {
        return None;
    }

    let pose = Pose::new(position / n, Quat::from_vec4(orientation / length));
    pose.is_valid().then_some(pose)
}
