//! A lobe that blends another lobe in with a constant weight
use crate::{utils::SafeCast, BxDF, BxDFSample, BxDFType, RgbD, RgbF, Vec2d, Vec3d};

/// Scales every value of `bxdf` by `scale`. The sampling density is unchanged.
#[derive(Clone, Copy)]
pub struct ScaledBxDF<'a> {
    pub bxdf: &'a dyn BxDF,
    pub scale: RgbF,
}

impl<'a> ScaledBxDF<'a> {
    #[must_use]
    pub const fn new(bxdf: &'a dyn BxDF, scale: RgbF) -> Self {
        Self { bxdf, scale }
    }
}

impl BxDF for ScaledBxDF<'_> {
    fn bxdf_type(&self) -> BxDFType {
        self.bxdf.bxdf_type()
    }

    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD {
        self.scale.safe_cast() * self.bxdf.f(omega_o, omega_i)
    }

    fn sample_f(&self, omega_o: Vec3d, u: Vec2d) -> BxDFSample {
        let sample = self.bxdf.sample_f(omega_o, u);
        BxDFSample {
            f: self.scale.safe_cast() * sample.f,
            ..sample
        }
    }

    fn pdf(&self, omega_o: Vec3d, omega_i: Vec3d) -> f64 {
        self.bxdf.pdf(omega_o, omega_i)
    }

    fn rho_hd(&self, omega_o: Vec3d, samples: &[Vec2d]) -> RgbD {
        self.scale.safe_cast() * self.bxdf.rho_hd(omega_o, samples)
    }

    fn rho_hh(&self, samples_o: &[Vec2d], samples_i: &[Vec2d]) -> RgbD {
        self.scale.safe_cast() * self.bxdf.rho_hh(samples_o, samples_i)
    }
}
