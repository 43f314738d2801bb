use std::fmt;

use bitflags::bitflags;

use crate::utils::{self, FloatExt};

/// used for colors
pub type RgbD = glam::f64::DVec3;
/// used for colors
pub type RgbF = glam::f32::Vec3;
/// used for colors handed back to a host, `w` is alpha
pub type RgbaD = glam::f64::DVec4;

/// used for direction vectors
pub type Vec3d = glam::f64::DVec3;
/// used for direction vectors and 2D sample points
pub type Vec2d = glam::f64::DVec2;

/// The largest `f64` below `1.0`. Remapped samples are clamped to it so they stay in `[0, 1)`
pub const ONE_MINUS_EPSILON: f64 = 1.0 - f64::EPSILON / 2.0;

bitflags! {
    /// Classifies a lobe along two axes: how light is transported (reflection, transmission)
    /// and what the scattering looks like (diffuse, glossy, specular).
    ///
    /// The same set is used as a filter mask when querying a [`crate::bsdf::Bsdf`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BxDFType: u8 {
        const REFLECTION = 1 << 0;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE = 1 << 2;
        const GLOSSY = 1 << 3;
        const SPECULAR = 1 << 4;
        const ALL = Self::REFLECTION.bits()
            | Self::TRANSMISSION.bits()
            | Self::DIFFUSE.bits()
            | Self::GLOSSY.bits()
            | Self::SPECULAR.bits();
    }
}

impl fmt::Display for BxDFType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let names = [
            (Self::REFLECTION, "Reflection"),
            (Self::TRANSMISSION, "Transmission"),
            (Self::DIFFUSE, "Diffuse"),
            (Self::GLOSSY, "Glossy"),
            (Self::SPECULAR, "Specular"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Direction in which light transport is computed.
///
/// Transmission through an interface between media with different indices of refraction is not
/// symmetric. Radiance carries an `eta^2` scaling that importance does not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// paths are traced from the camera, the transported quantity is radiance
    #[default]
    Radiance,
    /// paths are traced from the lights, the transported quantity is importance
    Importance,
}

/// Contains the Data that is returned by [`BxDF::sample_f`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BxDFSample {
    /// The value of the lobe for the pair `(omega_o, omega_i)`
    pub f: RgbD,

    /// # Incident Direction
    /// The sampled direction light arrives from, in the local shading frame
    pub omega_i: Vec3d,

    /// The probability density (with respect to solid angle) of having sampled `omega_i`
    pub pdf: f64,

    /// The kind of scattering that produced this sample
    pub sampled_type: BxDFType,
}

impl BxDFSample {
    /// A failed sample: no value, no direction, zero density
    #[must_use]
    pub const fn none() -> Self {
        Self {
            f: RgbD::ZERO,
            omega_i: Vec3d::ZERO,
            pdf: 0.0,
            sampled_type: BxDFType::empty(),
        }
    }
}

/// One scattering lobe (Bidirectional Scattering Distribution Function component).
///
/// All directions are given in the local shading frame: the surface is the xy-plane and the
/// normal is the z-axis. Both `omega_o` and `omega_i` point away from the surface.
///
/// `sample_f` is deterministic. You are responsible for generating the sample in `[0,1)^2`.
/// This keeps control over the random generator or low discrepancy sequence with the caller.
///
/// Perfectly specular lobes scatter into a set of measure zero. Their `f` and `pdf` are `0` and
/// they can only be reached through `sample_f`.
pub trait BxDF {
    /// Flags describing this lobe
    fn bxdf_type(&self) -> BxDFType;

    /// Whether every flag of this lobe is contained in `flags`
    fn matches_flags(&self, flags: BxDFType) -> bool {
        flags.contains(self.bxdf_type())
    }

    /// Returns the value of the lobe at the given directions
    ///
    /// # Arguments
    /// * `omega_o` - Exitant light direction
    /// * `omega_i` - Incident light direction
    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD;

    /// Given a direction where light is scattered to, samples an incident direction.
    ///
    /// The default implementation samples a cosine weighted hemisphere on the side of `omega_o`.
    fn sample_f(&self, omega_o: Vec3d, u: Vec2d) -> BxDFSample {
        let mut omega_i = utils::cosine_sample_hemisphere(u);
        if omega_o.z < 0.0 {
            omega_i.z *= -1.0;
        }
        BxDFSample {
            f: self.f(omega_o, omega_i),
            omega_i,
            pdf: self.pdf(omega_o, omega_i),
            sampled_type: self.bxdf_type(),
        }
    }

    /// The probability density of `sample_f` returning `omega_i` given `omega_o`
    fn pdf(&self, omega_o: Vec3d, omega_i: Vec3d) -> f64 {
        if utils::same_hemisphere(omega_o, omega_i) {
            utils::abs_cos_theta(omega_i) * std::f64::consts::FRAC_1_PI
        } else {
            0.0
        }
    }

    /// Hemispherical-directional reflectance: the fraction of light scattered towards
    /// `omega_o` under uniform illumination, estimated with one sample per entry of `samples`.
    fn rho_hd(&self, omega_o: Vec3d, samples: &[Vec2d]) -> RgbD {
        if samples.is_empty() {
            return RgbD::ZERO;
        }
        let mut r = RgbD::ZERO;
        for &u in samples {
            let sample = self.sample_f(omega_o, u);
            if sample.pdf > 0.0 {
                r += sample.f * utils::abs_cos_theta(sample.omega_i) / sample.pdf;
            }
        }
        r / samples.len() as f64
    }

    /// Hemispherical-hemispherical reflectance. `samples_o` pick outgoing directions uniformly on
    /// the hemisphere, `samples_i` are handed to `sample_f`.
    fn rho_hh(&self, samples_o: &[Vec2d], samples_i: &[Vec2d]) -> RgbD {
        let n = samples_o.len().min(samples_i.len());
        if n == 0 {
            return RgbD::ZERO;
        }
        let pdf_o = utils::uniform_hemisphere_pdf();
        let mut r = RgbD::ZERO;
        for (&u_o, &u_i) in samples_o.iter().zip(samples_i) {
            let omega_o = utils::uniform_sample_hemisphere(u_o);
            let sample = self.sample_f(omega_o, u_i);
            if sample.pdf > 0.0 {
                r += sample.f * utils::abs_cos_theta(sample.omega_i) * utils::abs_cos_theta(omega_o)
                    / (pdf_o * sample.pdf);
            }
        }
        r / (std::f64::consts::PI * n as f64)
    }
}

/// Pick the `(incident, transmitted)` indices of refraction for a lobe separating a medium with
/// `eta_a` above the surface from `eta_b` below. A direction with positive `cos theta` is
/// entering the lower medium.
#[must_use]
pub fn eta_pair(omega_o: Vec3d, eta_a: f64, eta_b: f64) -> (f64, f64) {
    if utils::cos_theta(omega_o) > 0.0 {
        (eta_a, eta_b)
    } else {
        (eta_b, eta_a)
    }
}

/// The radiance scaling applied when crossing from `eta_i` into `eta_t`
#[must_use]
pub fn transmission_scale(mode: TransportMode, eta_i: f64, eta_t: f64) -> f64 {
    match mode {
        TransportMode::Radiance => (eta_i / eta_t).sq(),
        TransportMode::Importance => 1.0,
    }
}
