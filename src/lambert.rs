//! Lobes that resemble smooth diffuse surfaces like plastic or paper
use std::f64::consts;

use crate::{
    utils::{self, SafeCast},
    BxDF, BxDFSample, BxDFType, RgbD, RgbF, Vec2d, Vec3d,
};

/// Ideal diffuse reflection. Scatters light equally into all directions of the hemisphere it
/// arrived from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LambertianReflection {
    /// The color. Every component should be in \[0,1\] to preserve physical validity.
    pub r: RgbF,
}

impl LambertianReflection {
    #[must_use]
    pub const fn new(r: RgbF) -> Self {
        Self { r }
    }
}

impl BxDF for LambertianReflection {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::DIFFUSE
    }

    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD {
        if utils::same_hemisphere(omega_o, omega_i) {
            self.r.safe_cast() * consts::FRAC_1_PI
        } else {
            RgbD::ZERO
        }
    }

    fn rho_hd(&self, _omega_o: Vec3d, _samples: &[Vec2d]) -> RgbD {
        self.r.safe_cast()
    }

    fn rho_hh(&self, _samples_o: &[Vec2d], _samples_i: &[Vec2d]) -> RgbD {
        self.r.safe_cast()
    }
}

/// Ideal diffuse transmission through a thin surface, e.g. a lamp shade
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LambertianTransmission {
    pub t: RgbF,
}

impl LambertianTransmission {
    #[must_use]
    pub const fn new(t: RgbF) -> Self {
        Self { t }
    }
}

impl BxDF for LambertianTransmission {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::TRANSMISSION | BxDFType::DIFFUSE
    }

    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD {
        if utils::same_hemisphere(omega_o, omega_i) || omega_o.z * omega_i.z == 0.0 {
            RgbD::ZERO
        } else {
            self.t.safe_cast() * consts::FRAC_1_PI
        }
    }

    fn sample_f(&self, omega_o: Vec3d, u: Vec2d) -> BxDFSample {
        let mut omega_i = utils::cosine_sample_hemisphere(u);
        if omega_o.z > 0.0 {
            omega_i.z *= -1.0;
        }
        BxDFSample {
            f: self.f(omega_o, omega_i),
            omega_i,
            pdf: self.pdf(omega_o, omega_i),
            sampled_type: self.bxdf_type(),
        }
    }

    fn pdf(&self, omega_o: Vec3d, omega_i: Vec3d) -> f64 {
        if omega_o.z * omega_i.z < 0.0 {
            utils::abs_cos_theta(omega_i) * consts::FRAC_1_PI
        } else {
            0.0
        }
    }

    fn rho_hd(&self, _omega_o: Vec3d, _samples: &[Vec2d]) -> RgbD {
        self.t.safe_cast()
    }

    fn rho_hh(&self, _samples_o: &[Vec2d], _samples_i: &[Vec2d]) -> RgbD {
        self.t.safe_cast()
    }
}
