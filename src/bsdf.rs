//! The scattering function of a shading point: a set of lobes evaluated in a common shading
//! frame.
//!
//! A [`Bsdf`] borrows its lobes. Build the lobes on the stack of the shader, attach them with
//! [`Bsdf::add`] and query the aggregate with world space directions.
use std::fmt;

use crate::{
    frame::ShadingFrame, BxDF, BxDFType, RgbD, Vec2d, Vec3d, ONE_MINUS_EPSILON,
};

/// The number of lobes a [`Bsdf`] can hold
pub const MAX_BXDFS: usize = 8;

/// Contains the Data that is returned by [`Bsdf::sample_f`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BsdfSample {
    /// The value of the whole scattering function for the pair of directions. For a sampled
    /// specular lobe it is the value of that lobe alone.
    pub f: RgbD,

    /// The sampled incident direction in world space
    pub omega_i: Vec3d,

    /// The probability density of the sample, averaged over all matching lobes
    pub pdf: f64,

    /// The kind of scattering that produced this sample
    pub sampled_type: BxDFType,
}

impl BsdfSample {
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

pub struct Bsdf<'a> {
    /// relative index of refraction over the boundary, `1` for opaque surfaces
    pub eta: f64,
    frame: ShadingFrame,
    geometric_normal: Vec3d,
    bxdfs: [Option<&'a dyn BxDF>; MAX_BXDFS],
    n_bxdfs: usize,
}

impl<'a> Bsdf<'a> {
    /// An empty scattering function. The geometric normal defaults to the shading normal.
    #[must_use]
    pub const fn new(frame: ShadingFrame, eta: f64) -> Self {
        Self {
            eta,
            geometric_normal: frame.normal,
            frame,
            bxdfs: [None; MAX_BXDFS],
            n_bxdfs: 0,
        }
    }

    /// Decides between reflection and transmission with the true surface normal instead of
    /// the (interpolated or bumped) shading normal.
    #[must_use]
    pub fn with_geometric_normal(mut self, geometric_normal: Vec3d) -> Self {
        self.geometric_normal = geometric_normal.normalize();
        self
    }

    /// Attaches a lobe.
    ///
    /// # Panics
    /// If [`MAX_BXDFS`] lobes are already attached.
    pub fn add(&mut self, bxdf: &'a dyn BxDF) {
        assert!(
            self.n_bxdfs < MAX_BXDFS,
            "a Bsdf holds at most {MAX_BXDFS} lobes"
        );
        self.bxdfs[self.n_bxdfs] = Some(bxdf);
        self.n_bxdfs += 1;
    }

    #[must_use]
    pub const fn frame(&self) -> &ShadingFrame {
        &self.frame
    }

    #[must_use]
    pub const fn geometric_normal(&self) -> Vec3d {
        self.geometric_normal
    }

    fn components(&self) -> impl Iterator<Item = &'a dyn BxDF> + '_ {
        self.bxdfs[..self.n_bxdfs].iter().flatten().copied()
    }

    fn matching(&self, flags: BxDFType) -> impl Iterator<Item = &'a dyn BxDF> + '_ {
        self.components().filter(move |bxdf| bxdf.matches_flags(flags))
    }

    /// The number of attached lobes whose type is contained in `flags`
    #[must_use]
    pub fn num_components(&self, flags: BxDFType) -> usize {
        self.matching(flags).count()
    }

    #[must_use]
    pub fn world_to_local(&self, v: Vec3d) -> Vec3d {
        self.frame.world_to_local(v)
    }

    #[must_use]
    pub fn local_to_world(&self, v: Vec3d) -> Vec3d {
        self.frame.local_to_world(v)
    }

    /// Sums the matching lobes that scatter to the side of the surface `omega_i` is on
    fn routed_f(&self, omega_o: Vec3d, omega_i: Vec3d, reflect: bool, flags: BxDFType) -> RgbD {
        let transport = if reflect {
            BxDFType::REFLECTION
        } else {
            BxDFType::TRANSMISSION
        };
        self.matching(flags)
            .filter(|bxdf| bxdf.bxdf_type().intersects(transport))
            .map(|bxdf| bxdf.f(omega_o, omega_i))
            .sum()
    }

    fn is_reflection(&self, omega_o_world: Vec3d, omega_i_world: Vec3d) -> bool {
        omega_i_world.dot(self.geometric_normal) * omega_o_world.dot(self.geometric_normal) > 0.0
    }

    /// Evaluates all matching lobes for a pair of world space directions
    #[must_use]
    pub fn f(&self, omega_o_world: Vec3d, omega_i_world: Vec3d, flags: BxDFType) -> RgbD {
        let omega_o = self.world_to_local(omega_o_world);
        let omega_i = self.world_to_local(omega_i_world);
        if omega_o.z == 0.0 {
            return RgbD::ZERO;
        }
        let reflect = self.is_reflection(omega_o_world, omega_i_world);
        self.routed_f(omega_o, omega_i, reflect, flags)
    }

    /// Picks one of the matching lobes uniformly with `u.x`, samples it and combines the result
    /// with the other matching lobes.
    ///
    /// Samples in `[0,1)^2` are expected. A failed sample has a `pdf` of `0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample_f(&self, omega_o_world: Vec3d, u: Vec2d, flags: BxDFType) -> BsdfSample {
        let matching = self.num_components(flags);
        if matching == 0 {
            log::trace!("no lobe matches {flags}");
            return BsdfSample::none();
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let comp = ((u.x * matching as f64).floor() as usize).min(matching - 1);
        let Some(bxdf) = self.matching(flags).nth(comp) else {
            return BsdfSample::none();
        };

        let u_remapped = Vec2d::new(
            (u.x * matching as f64 - comp as f64).min(ONE_MINUS_EPSILON),
            u.y,
        );

        let omega_o = self.world_to_local(omega_o_world);
        if omega_o.z == 0.0 {
            return BsdfSample::none();
        }
        let sample = bxdf.sample_f(omega_o, u_remapped);
        if sample.pdf == 0.0 {
            log::trace!("lobe {comp} ({}) rejected the sample", bxdf.bxdf_type());
            return BsdfSample::none();
        }
        log::trace!("sampled lobe {comp} of {matching} ({})", sample.sampled_type);

        let omega_i = sample.omega_i;
        let omega_i_world = self.local_to_world(omega_i);
        let specular = bxdf.bxdf_type().contains(BxDFType::SPECULAR);

        let mut pdf = sample.pdf;
        if !specular && matching > 1 {
            pdf += self
                .matching(flags)
                .enumerate()
                .filter(|(i, _)| *i != comp)
                .map(|(_, other)| other.pdf(omega_o, omega_i))
                .sum::<f64>();
        }
        if matching > 1 {
            pdf /= matching as f64;
        }

        let f = if specular {
            sample.f
        } else {
            let reflect = self.is_reflection(omega_o_world, omega_i_world);
            self.routed_f(omega_o, omega_i, reflect, flags)
        };

        BsdfSample {
            f,
            omega_i: omega_i_world,
            pdf,
            sampled_type: sample.sampled_type,
        }
    }

    /// The density of [`Bsdf::sample_f`] returning `omega_i_world`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pdf(&self, omega_o_world: Vec3d, omega_i_world: Vec3d, flags: BxDFType) -> f64 {
        if self.n_bxdfs == 0 {
            return 0.0;
        }
        let omega_o = self.world_to_local(omega_o_world);
        let omega_i = self.world_to_local(omega_i_world);
        if omega_o.z == 0.0 {
            return 0.0;
        }
        let (sum, count) = self
            .matching(flags)
            .fold((0.0, 0usize), |(sum, count), bxdf| {
                (sum + bxdf.pdf(omega_o, omega_i), count + 1)
            });
        if count > 0 {
            sum / count as f64
        } else {
            0.0
        }
    }

    /// Hemispherical-directional reflectance of the matching lobes, see [`BxDF::rho_hd`]
    #[must_use]
    pub fn rho_hd(&self, omega_o_world: Vec3d, samples: &[Vec2d], flags: BxDFType) -> RgbD {
        let omega_o = self.world_to_local(omega_o_world);
        self.matching(flags)
            .map(|bxdf| bxdf.rho_hd(omega_o, samples))
            .sum()
    }

    /// Hemispherical-hemispherical reflectance of the matching lobes, see [`BxDF::rho_hh`]
    #[must_use]
    pub fn rho_hh(&self, samples_o: &[Vec2d], samples_i: &[Vec2d], flags: BxDFType) -> RgbD {
        self.matching(flags)
            .map(|bxdf| bxdf.rho_hh(samples_o, samples_i))
            .sum()
    }
}

impl fmt::Display for Bsdf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ Bsdf eta: {} lobes: {}", self.eta, self.n_bxdfs)?;
        for bxdf in self.components() {
            write!(f, " ({})", bxdf.bxdf_type())?;
        }
        f.write_str(" ]")
    }
}

impl fmt::Debug for Bsdf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bsdf")
            .field("eta", &self.eta)
            .field("frame", &self.frame)
            .field("geometric_normal", &self.geometric_normal)
            .field("lobes", &self.components().map(|b| b.bxdf_type()).collect::<Vec<_>>())
            .finish()
    }
}
