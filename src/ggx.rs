//! Microfacet distributions and an implementation of the GGX (Trowbridge-Reitz) Distribution

use crate::{
    utils::{self, FloatExt},
    Vec2d, Vec3d,
};
use std::{f64::consts, fmt};

/// A statistical description of a rough surface made of tiny perfect mirrors.
///
/// Directions are in the local shading frame. `wh` denotes a microfacet normal (half vector).
pub trait MicrofacetDistribution: fmt::Debug {
    /// Distribution of normals / Normal Distribution Function, the $D$ term
    fn d(&self, wh: Vec3d) -> f64;

    /// Auxiliary function of the Smith masking-shadowing model
    fn lambda(&self, w: Vec3d) -> f64;

    /// Masking function, the fraction of microfacets visible from `w`
    fn g1(&self, w: Vec3d) -> f64 {
        1.0 / (1.0 + self.lambda(w))
    }

    /// Masking-Shadowing function, the $G$ term
    fn g(&self, omega_o: Vec3d, omega_i: Vec3d) -> f64 {
        1.0 / (1.0 + self.lambda(omega_o) + self.lambda(omega_i))
    }

    /// Samples a microfacet normal visible from `omega_o`. The result lies in the hemisphere of
    /// `omega_o`.
    fn sample_wh(&self, omega_o: Vec3d, u: Vec2d) -> Vec3d;

    /// The density of `sample_wh` returning `wh`
    fn pdf(&self, omega_o: Vec3d, wh: Vec3d) -> f64 {
        let cos_o = utils::abs_cos_theta(omega_o);
        if cos_o == 0.0 {
            return 0.0;
        }
        self.d(wh) * self.g1(omega_o) * omega_o.dot(wh).abs() / cos_o
    }
}

/// This is a common microsurface model to describe anisotropic rough surfaces. It backs the
/// microfacet lobes in [`crate::microfacet`] and [`crate::fresnel_blend`].
///
/// # Mathematical background
/// * [Understanding the Masking-Shadowing Function in Microfacet-Based BRDFs](https://jcgt.org/published/0003/02/03/)
/// * [Sampling the GGX Distribution of Visible Normals](https://jcgt.org/published/0007/04/01/)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GGX {
    /// roughness in direction x
    /// This roughness values are not perceived linearly. [`GGX::roughness_to_alpha`] is a good
    /// approximation for choosing roughness values.
    pub alpha_x: f64,

    /// roughness in direction y
    pub alpha_y: f64,
}

impl GGX {
    #[must_use]
    pub const fn new(alpha_x: f64, alpha_y: f64) -> Self {
        Self { alpha_x, alpha_y }
    }

    #[must_use]
    pub const fn isotropic(alpha: f64) -> Self {
        Self::new(alpha, alpha)
    }

    /// Maps a perceptually linear roughness in `[0,1]` to `alpha`
    #[must_use]
    pub fn roughness_to_alpha(roughness: f64) -> f64 {
        let x = roughness.max(1e-3).ln();
        #[allow(clippy::suboptimal_flops)]
        {
            1.62142
                + 0.819_955 * x
                + 0.1734 * x * x
                + 0.017_120_1 * x * x * x
                + 0.000_640_711 * x * x * x * x
        }
    }
}

impl MicrofacetDistribution for GGX {
    fn d(&self, wh: Vec3d) -> f64 {
        if wh.z.abs() <= 1e-10 {
            return 0.0;
        }
        let denom = consts::PI
            * self.alpha_x
            * self.alpha_y
            * ((wh.x / self.alpha_x).sq() + (wh.y / self.alpha_y).sq() + (wh.z).sq()).sq();
        1.0 / denom
    }

    fn lambda(&self, w: Vec3d) -> f64 {
        if w.z.abs() < 1e-10 {
            return f64::INFINITY;
        }
        let alpha2_tan2 = ((self.alpha_x * w.x).sq() + (self.alpha_y * w.y).sq()) / w.z.sq();
        (-1.0 + (1.0 + alpha2_tan2).sqrt()) / 2.0
    }

    fn sample_wh(&self, omega_o: Vec3d, u: Vec2d) -> Vec3d {
        let flip = omega_o.z < 0.0;
        let omega_o = if flip { -omega_o } else { omega_o };

        // stretch to the hemisphere configuration
        let v_h: Vec3d = Vec3d::new(
            omega_o.x * self.alpha_x,
            omega_o.y * self.alpha_y,
            omega_o.z,
        )
        .normalize();

        #[allow(clippy::suboptimal_flops)]
        let lensq = v_h.x * v_h.x + v_h.y * v_h.y;
        let at1: Vec3d = if lensq > (1.0e-10) {
            Vec3d::new(-v_h.y, v_h.x, 0.0) / f64::sqrt(lensq)
        } else {
            Vec3d::new(1.0, 0.0, 0.0)
        };
        let at2: Vec3d = Vec3d::cross(v_h, at1);

        let r = u.x.sqrt();
        let phi: f64 = (2.0) * consts::PI * u.y;
        let t1 = r * phi.cos();
        let t2 = r * phi.sin();
        let s: f64 = (0.5) * ((1.0) + v_h.z);

        #[allow(clippy::suboptimal_flops)]
        let t2r = (1.0 - s) * (1.0 - t1 * t1).sqrt() + s * t2;

        #[allow(clippy::suboptimal_flops)]
        let m_h: Vec3d = at1 * t1 + at2 * t2r + v_h * (1.0 - t1 * t1 - t2r * t2r).max(0.0).sqrt();

        // unstretch
        let wh = Vec3d::new(
            self.alpha_x * m_h.x,
            self.alpha_y * m_h.y,
            f64::max(1e-10, m_h.z),
        )
        .normalize();

        if flip {
            -wh
        } else {
            wh
        }
    }
}
