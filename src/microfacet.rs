//! Glossy lobes built on a [`MicrofacetDistribution`]: rough metals and plastics reflect,
//! frosted glass transmits.
//!
//! # Mathematical background
//! * [Microfacet Models for Refraction through Rough Surfaces](https://www.cs.cornell.edu/~srm/publications/EGSR07-btdf.pdf)
use crate::{
    core::transmission_scale,
    fresnel::{Fresnel, FresnelDielectric},
    ggx::MicrofacetDistribution,
    utils::{self, FloatExt, SafeCast},
    BxDF, BxDFSample, BxDFType, RgbD, RgbF, TransportMode, Vec2d, Vec3d,
};

/// Torrance-Sparrow reflection off a rough surface
#[derive(Clone, Copy, Debug)]
pub struct MicrofacetReflection<'a> {
    pub r: RgbF,
    pub distribution: &'a dyn MicrofacetDistribution,
    pub fresnel: &'a dyn Fresnel,
}

impl<'a> MicrofacetReflection<'a> {
    #[must_use]
    pub const fn new(
        r: RgbF,
        distribution: &'a dyn MicrofacetDistribution,
        fresnel: &'a dyn Fresnel,
    ) -> Self {
        Self {
            r,
            distribution,
            fresnel,
        }
    }
}

impl BxDF for MicrofacetReflection<'_> {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::GLOSSY
    }

    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD {
        let cos_theta_o = utils::abs_cos_theta(omega_o);
        let cos_theta_i = utils::abs_cos_theta(omega_i);
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 {
            return RgbD::ZERO;
        }
        if !utils::same_hemisphere(omega_o, omega_i) {
            return RgbD::ZERO;
        }
        let wh = omega_i + omega_o;
        if wh == Vec3d::ZERO {
            return RgbD::ZERO;
        }
        let wh = wh.normalize();
        let fresnel = self
            .fresnel
            .evaluate(omega_i.dot(utils::face_forward(wh, Vec3d::Z)));
        let d = self.distribution.d(wh);
        let g = self.distribution.g(omega_o, omega_i);
        self.r.safe_cast() * fresnel * (d * g / (4.0 * cos_theta_i * cos_theta_o))
    }

    fn sample_f(&self, omega_o: Vec3d, u: Vec2d) -> BxDFSample {
        if omega_o.z == 0.0 {
            return BxDFSample::none();
        }
        let wh = self.distribution.sample_wh(omega_o, u);
        if omega_o.dot(wh) < 0.0 {
            return BxDFSample::none();
        }
        let omega_i = utils::reflect(wh, omega_o);
        if !utils::same_hemisphere(omega_o, omega_i) {
            return BxDFSample::none();
        }
        BxDFSample {
            f: self.f(omega_o, omega_i),
            omega_i,
            pdf: self.pdf(omega_o, omega_i),
            sampled_type: self.bxdf_type(),
        }
    }

    fn pdf(&self, omega_o: Vec3d, omega_i: Vec3d) -> f64 {
        if !utils::same_hemisphere(omega_o, omega_i) {
            return 0.0;
        }
        let wh = (omega_o + omega_i).normalize();
        let cos_oh = omega_o.dot(wh);
        if cos_oh <= 0.0 {
            return 0.0;
        }
        self.distribution.pdf(omega_o, wh) / (4.0 * cos_oh)
    }
}

/// Refraction through a rough dielectric interface. The medium above the surface (`+z`) has
/// the index of refraction `eta_a`, the one below has `eta_b`.
#[derive(Clone, Copy, Debug)]
pub struct MicrofacetTransmission<'a> {
    pub t: RgbF,
    pub distribution: &'a dyn MicrofacetDistribution,
    pub eta_a: f64,
    pub eta_b: f64,
    pub mode: TransportMode,
    fresnel: FresnelDielectric,
}

impl<'a> MicrofacetTransmission<'a> {
    #[must_use]
    pub const fn new(
        t: RgbF,
        distribution: &'a dyn MicrofacetDistribution,
        eta_a: f64,
        eta_b: f64,
        mode: TransportMode,
    ) -> Self {
        Self {
            t,
            distribution,
            eta_a,
            eta_b,
            mode,
            fresnel: FresnelDielectric::new(eta_a, eta_b),
        }
    }

    /// `eta_t / eta_i` as seen from `omega_o`
    fn relative_eta(&self, omega_o: Vec3d) -> f64 {
        if utils::cos_theta(omega_o) > 0.0 {
            self.eta_b / self.eta_a
        } else {
            self.eta_a / self.eta_b
        }
    }

    /// The generalized half vector of a refraction, `None` if the pair can not be produced by
    /// any microfacet facing `omega_o`.
    fn half_vector(omega_o: Vec3d, omega_i: Vec3d, eta: f64) -> Option<Vec3d> {
        let wh = (omega_o + omega_i * eta).try_normalize()?;
        let wh = if wh.z < 0.0 { -wh } else { wh };
        if omega_o.dot(wh) * omega_i.dot(wh) >= 0.0 {
            return None;
        }
        Some(wh)
    }
}

impl BxDF for MicrofacetTransmission<'_> {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::TRANSMISSION | BxDFType::GLOSSY
    }

    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD {
        if utils::same_hemisphere(omega_o, omega_i) {
            return RgbD::ZERO;
        }
        let cos_theta_o = utils::cos_theta(omega_o);
        let cos_theta_i = utils::cos_theta(omega_i);
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 {
            return RgbD::ZERO;
        }

        let eta = self.relative_eta(omega_o);
        let Some(wh) = Self::half_vector(omega_o, omega_i, eta) else {
            return RgbD::ZERO;
        };
        let fresnel = self.fresnel.evaluate(omega_o.dot(wh));

        #[allow(clippy::suboptimal_flops)]
        let sqrt_denom = omega_o.dot(wh) + eta * omega_i.dot(wh);
        // 1 / eta^2 in radiance mode
        let factor2 = transmission_scale(self.mode, 1.0, eta);

        let value = (self.distribution.d(wh)
            * self.distribution.g(omega_o, omega_i)
            * eta.sq()
            * omega_i.dot(wh).abs()
            * omega_o.dot(wh).abs()
            * factor2
            / (cos_theta_i * cos_theta_o * sqrt_denom.sq()))
        .abs();
        (RgbD::ONE - fresnel) * self.t.safe_cast() * value
    }

    fn sample_f(&self, omega_o: Vec3d, u: Vec2d) -> BxDFSample {
        if omega_o.z == 0.0 {
            return BxDFSample::none();
        }
        let wh = self.distribution.sample_wh(omega_o, u);
        if omega_o.dot(wh) < 0.0 {
            return BxDFSample::none();
        }
        let eta = self.relative_eta(omega_o).recip();
        let Some(omega_i) = utils::refract(omega_o, wh, eta) else {
            return BxDFSample::none();
        };
        let pdf = self.pdf(omega_o, omega_i);
        if pdf == 0.0 {
            return BxDFSample::none();
        }
        BxDFSample {
            f: self.f(omega_o, omega_i),
            omega_i,
            pdf,
            sampled_type: self.bxdf_type(),
        }
    }

    fn pdf(&self, omega_o: Vec3d, omega_i: Vec3d) -> f64 {
        if utils::same_hemisphere(omega_o, omega_i) {
            return 0.0;
        }
        let eta = self.relative_eta(omega_o);
        let Some(wh) = Self::half_vector(omega_o, omega_i, eta) else {
            return 0.0;
        };

        #[allow(clippy::suboptimal_flops)]
        let sqrt_denom = omega_o.dot(wh) + eta * omega_i.dot(wh);
        let dwh_dwi = (eta.sq() * omega_i.dot(wh) / sqrt_denom.sq()).abs();
        self.distribution.pdf(omega_o, wh) * dwh_dwi
    }
}
