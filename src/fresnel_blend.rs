//! Ashikhmin-Shirley model of a glossy coating on top of a diffuse base, e.g. varnished wood.
//! The diffuse part only receives the light the coating lets through.
use std::f64::consts;

use crate::{
    fresnel::schlick,
    ggx::MicrofacetDistribution,
    utils::{self, SafeCast},
    BxDF, BxDFSample, BxDFType, RgbD, RgbF, Vec2d, Vec3d, ONE_MINUS_EPSILON,
};

#[derive(Clone, Copy, Debug)]
pub struct FresnelBlend<'a> {
    /// diffuse albedo of the base
    pub rd: RgbF,
    /// reflectance of the coating at normal incidence
    pub rs: RgbF,
    pub distribution: &'a dyn MicrofacetDistribution,
}

impl<'a> FresnelBlend<'a> {
    #[must_use]
    pub const fn new(rd: RgbF, rs: RgbF, distribution: &'a dyn MicrofacetDistribution) -> Self {
        Self {
            rd,
            rs,
            distribution,
        }
    }
}

impl BxDF for FresnelBlend<'_> {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::GLOSSY
    }

    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD {
        let cos_i = utils::abs_cos_theta(omega_i);
        let cos_o = utils::abs_cos_theta(omega_o);
        let rd = self.rd.safe_cast();
        let rs = self.rs.safe_cast();

        let diffuse = rd
            * (RgbD::ONE - rs)
            * (28.0 / (23.0 * consts::PI))
            * (1.0 - utils::pow5(1.0 - 0.5 * cos_i))
            * (1.0 - utils::pow5(1.0 - 0.5 * cos_o));

        let wh = omega_i + omega_o;
        if wh == Vec3d::ZERO {
            return RgbD::ZERO;
        }
        let wh = wh.normalize();
        let denom = 4.0 * omega_i.dot(wh).abs() * cos_i.max(cos_o);
        if denom == 0.0 {
            return diffuse;
        }
        let specular = schlick(rs, omega_i.dot(wh)) * (self.distribution.d(wh) / denom);
        diffuse + specular
    }

    fn sample_f(&self, omega_o: Vec3d, u: Vec2d) -> BxDFSample {
        let omega_i = if u.x < 0.5 {
            let u = Vec2d::new((2.0 * u.x).min(ONE_MINUS_EPSILON), u.y);
            let mut omega_i = utils::cosine_sample_hemisphere(u);
            if omega_o.z < 0.0 {
                omega_i.z *= -1.0;
            }
            omega_i
        } else {
            let u = Vec2d::new((2.0 * (u.x - 0.5)).min(ONE_MINUS_EPSILON), u.y);
            let wh = self.distribution.sample_wh(omega_o, u);
            let omega_i = utils::reflect(wh, omega_o);
            if !utils::same_hemisphere(omega_o, omega_i) {
                return BxDFSample::none();
            }
            omega_i
        };
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
        let pdf_wh = if cos_oh > 0.0 {
            self.distribution.pdf(omega_o, wh) / (4.0 * cos_oh)
        } else {
            0.0
        };
        0.5 * (utils::abs_cos_theta(omega_i) * consts::FRAC_1_PI + pdf_wh)
    }
}
