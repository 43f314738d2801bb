//! Diffuse reflection from rough surfaces made of V-shaped lambertian grooves, e.g. clay or
//! concrete. Looks flatter than [`crate::lambert::LambertianReflection`] at grazing angles.
use std::f64::consts;

use crate::{
    utils::{self, FloatExt, SafeCast},
    BxDF, BxDFType, RgbD, RgbF, Vec3d,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrenNayar {
    pub r: RgbF,
    a: f64,
    b: f64,
}

impl OrenNayar {
    /// `sigma` is the standard deviation of the groove angles, in degrees
    #[must_use]
    pub fn new(r: RgbF, sigma: f64) -> Self {
        let sigma2 = sigma.to_radians().sq();
        Self {
            r,
            a: 1.0 - sigma2 / (2.0 * (sigma2 + 0.33)),
            b: 0.45 * sigma2 / (sigma2 + 0.09),
        }
    }
}

impl BxDF for OrenNayar {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::DIFFUSE
    }

    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD {
        if !utils::same_hemisphere(omega_o, omega_i) {
            return RgbD::ZERO;
        }
        let sin_theta_i = utils::sin_theta(omega_i);
        let sin_theta_o = utils::sin_theta(omega_o);

        let max_cos = if sin_theta_i > 1e-4 && sin_theta_o > 1e-4 {
            let sin_phi_i = utils::sin_phi(omega_i);
            let cos_phi_i = utils::cos_phi(omega_i);
            let sin_phi_o = utils::sin_phi(omega_o);
            let cos_phi_o = utils::cos_phi(omega_o);
            #[allow(clippy::suboptimal_flops)]
            let d_cos = cos_phi_i * cos_phi_o + sin_phi_i * sin_phi_o;
            d_cos.max(0.0)
        } else {
            0.0
        };

        let (sin_alpha, tan_beta) =
            if utils::abs_cos_theta(omega_i) > utils::abs_cos_theta(omega_o) {
                (sin_theta_o, sin_theta_i / utils::abs_cos_theta(omega_i))
            } else {
                (sin_theta_i, sin_theta_o / utils::abs_cos_theta(omega_o))
            };

        #[allow(clippy::suboptimal_flops)]
        let factor = self.a + self.b * max_cos * sin_alpha * tan_beta;
        self.r.safe_cast() * consts::FRAC_1_PI * factor
    }
}
