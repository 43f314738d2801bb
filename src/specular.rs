//! Perfectly smooth lobes: mirrors, clear glass and the combination of both.
//!
//! These scatter into a single direction. [`BxDF::f`] and [`BxDF::pdf`] are `0`
//! for every pair of directions, the lobes are only reachable through [`BxDF::sample_f`].
use crate::{
    core::{eta_pair, transmission_scale},
    fresnel::{fr_dielectric, Fresnel, FresnelDielectric},
    utils::{self, SafeCast},
    BxDF, BxDFSample, BxDFType, RgbD, RgbF, TransportMode, Vec2d, Vec3d,
};

/// A perfect mirror whose reflectance is given by a [`Fresnel`] term
#[derive(Clone, Copy, Debug)]
pub struct SpecularReflection<'a> {
    pub r: RgbF,
    pub fresnel: &'a dyn Fresnel,
}

impl<'a> SpecularReflection<'a> {
    #[must_use]
    pub const fn new(r: RgbF, fresnel: &'a dyn Fresnel) -> Self {
        Self { r, fresnel }
    }
}

impl BxDF for SpecularReflection<'_> {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::SPECULAR
    }

    fn f(&self, _omega_o: Vec3d, _omega_i: Vec3d) -> RgbD {
        RgbD::ZERO
    }

    fn sample_f(&self, omega_o: Vec3d, _u: Vec2d) -> BxDFSample {
        let omega_i = Vec3d::new(-omega_o.x, -omega_o.y, omega_o.z);
        let cos_i = utils::abs_cos_theta(omega_i);
        if cos_i == 0.0 {
            return BxDFSample::none();
        }
        BxDFSample {
            f: self.fresnel.evaluate(utils::cos_theta(omega_i)) * self.r.safe_cast() / cos_i,
            omega_i,
            pdf: 1.0,
            sampled_type: self.bxdf_type(),
        }
    }

    fn pdf(&self, _omega_o: Vec3d, _omega_i: Vec3d) -> f64 {
        0.0
    }
}

/// Refraction through a smooth dielectric interface. The medium above the surface (`+z`) has
/// the index of refraction `eta_a`, the one below has `eta_b`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpecularTransmission {
    pub t: RgbF,
    pub eta_a: f64,
    pub eta_b: f64,
    pub mode: TransportMode,
}

impl SpecularTransmission {
    #[must_use]
    pub const fn new(t: RgbF, eta_a: f64, eta_b: f64, mode: TransportMode) -> Self {
        Self {
            t,
            eta_a,
            eta_b,
            mode,
        }
    }
}

impl BxDF for SpecularTransmission {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::TRANSMISSION | BxDFType::SPECULAR
    }

    fn f(&self, _omega_o: Vec3d, _omega_i: Vec3d) -> RgbD {
        RgbD::ZERO
    }

    fn sample_f(&self, omega_o: Vec3d, _u: Vec2d) -> BxDFSample {
        let (eta_i, eta_t) = eta_pair(omega_o, self.eta_a, self.eta_b);
        let normal = utils::face_forward(Vec3d::Z, omega_o);
        let Some(omega_i) = utils::refract(omega_o, normal, eta_i / eta_t) else {
            return BxDFSample::none();
        };
        let cos_i = utils::abs_cos_theta(omega_i);
        if cos_i == 0.0 {
            return BxDFSample::none();
        }

        let fresnel = FresnelDielectric::new(self.eta_a, self.eta_b);
        let ft = self.t.safe_cast()
            * (RgbD::ONE - fresnel.evaluate(utils::cos_theta(omega_i)))
            * transmission_scale(self.mode, eta_i, eta_t);
        BxDFSample {
            f: ft / cos_i,
            omega_i,
            pdf: 1.0,
            sampled_type: self.bxdf_type(),
        }
    }

    fn pdf(&self, _omega_o: Vec3d, _omega_i: Vec3d) -> f64 {
        0.0
    }
}

/// Smooth glass that picks reflection or refraction proportional to the Fresnel term
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FresnelSpecular {
    pub r: RgbF,
    pub t: RgbF,
    pub eta_a: f64,
    pub eta_b: f64,
    pub mode: TransportMode,
}

impl FresnelSpecular {
    #[must_use]
    pub const fn new(r: RgbF, t: RgbF, eta_a: f64, eta_b: f64, mode: TransportMode) -> Self {
        Self {
            r,
            t,
            eta_a,
            eta_b,
            mode,
        }
    }
}

impl BxDF for FresnelSpecular {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::TRANSMISSION | BxDFType::SPECULAR
    }

    fn f(&self, _omega_o: Vec3d, _omega_i: Vec3d) -> RgbD {
        RgbD::ZERO
    }

    fn sample_f(&self, omega_o: Vec3d, u: Vec2d) -> BxDFSample {
        let fr = fr_dielectric(utils::cos_theta(omega_o), self.eta_a, self.eta_b);
        if u.x < fr {
            let omega_i = Vec3d::new(-omega_o.x, -omega_o.y, omega_o.z);
            let cos_i = utils::abs_cos_theta(omega_i);
            if cos_i == 0.0 {
                return BxDFSample::none();
            }
            BxDFSample {
                f: self.r.safe_cast() * fr / cos_i,
                omega_i,
                pdf: fr,
                sampled_type: BxDFType::SPECULAR | BxDFType::REFLECTION,
            }
        } else {
            let (eta_i, eta_t) = eta_pair(omega_o, self.eta_a, self.eta_b);
            let normal = utils::face_forward(Vec3d::Z, omega_o);
            let Some(omega_i) = utils::refract(omega_o, normal, eta_i / eta_t) else {
                // fr is exactly 1 under total internal reflection, so this branch is unreachable
                // for samples in [0, 1)
                return BxDFSample::none();
            };
            let cos_i = utils::abs_cos_theta(omega_i);
            if cos_i == 0.0 {
                return BxDFSample::none();
            }
            let ft = self.t.safe_cast() * (1.0 - fr) * transmission_scale(self.mode, eta_i, eta_t);
            BxDFSample {
                f: ft / cos_i,
                omega_i,
                pdf: 1.0 - fr,
                sampled_type: BxDFType::SPECULAR | BxDFType::TRANSMISSION,
            }
        }
    }

    fn pdf(&self, _omega_o: Vec3d, _omega_i: Vec3d) -> f64 {
        0.0
    }
}
