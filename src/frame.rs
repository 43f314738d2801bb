//! Orthonormal shading frames for moving directions between world space and the local space
//! every lobe is evaluated in.
use glam::DMat3;

use crate::Vec3d;

/// An orthonormal basis `{tangent, bitangent, normal}`. In local coordinates the tangent is the
/// x-axis, the bitangent is the y-axis and the normal is the z-axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadingFrame {
    pub tangent: Vec3d,
    pub bitangent: Vec3d,
    pub normal: Vec3d,
}

impl ShadingFrame {
    /// Builds a frame around `normal` with an arbitrary but deterministic tangent.
    ///
    /// The tangent is taken perpendicular to the coordinate axis that is least parallel to
    /// `normal`, so the construction never divides by a vanishing length.
    #[must_use]
    pub fn from_normal(normal: Vec3d) -> Self {
        let normal = normal.normalize();
        let tangent = if normal.x.abs() > normal.y.abs() {
            Vec3d::new(-normal.z, 0.0, normal.x) / normal.x.hypot(normal.z)
        } else {
            Vec3d::new(0.0, normal.z, -normal.y) / normal.y.hypot(normal.z)
        };
        Self {
            tangent,
            bitangent: normal.cross(tangent),
            normal,
        }
    }

    /// Builds a frame from the shading normal and a tangent supplied by the host (e.g. `dP/du`).
    ///
    /// The tangent does not need to be perpendicular to the normal, it is Gram-Schmidt
    /// orthogonalized. A tangent (nearly) parallel to the normal falls back to
    /// [`ShadingFrame::from_normal`].
    #[must_use]
    pub fn from_normal_tangent(normal: Vec3d, tangent: Vec3d) -> Self {
        let normal = normal.normalize();
        let tangent = tangent - normal * normal.dot(tangent);
        if tangent.length_squared() < 1e-12 {
            return Self::from_normal(normal);
        }
        let tangent = tangent.normalize();
        Self {
            tangent,
            bitangent: normal.cross(tangent),
            normal,
        }
    }

    #[must_use]
    pub fn world_to_local(&self, v: Vec3d) -> Vec3d {
        Vec3d::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }

    #[must_use]
    pub fn local_to_world(&self, v: Vec3d) -> Vec3d {
        DMat3::from_cols(self.tangent, self.bitangent, self.normal) * v
    }
}
