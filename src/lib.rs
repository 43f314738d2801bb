#![warn(clippy::pedantic)]
#![warn(clippy::perf)]
#![warn(clippy::nursery)]
#![warn(clippy::suboptimal_flops)]
#![deny(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![deny(clippy::semicolon_if_nothing_returned)]
#![deny(clippy::must_use_candidate)]
#![deny(clippy::double_must_use)]
#![deny(clippy::use_self)]
#![deny(clippy::unreadable_literal)]
#![deny(clippy::explicit_iter_loop)]
// these are lints to enable later
#![allow(clippy::cast_lossless)]
#![allow(clippy::module_name_repetitions)]

//! Physically based scattering lobes for offline rendering, with importance sampling for all of
//! them.
//!
//! # Design Decisions
//! Lighting calculations are done exclusively in [f64]s. Scattering functions can be extremely
//! spiky and [f64] keeps the numerical error down. Material parameters are stored as [f32]s
//! ([`RgbF`]) for a minimal memory footprint and widened on use.
//!
//! Every lobe implements [`BxDF`] and is evaluated in a local shading frame: the surface is the
//! xy-plane and the z-axis is the normal. A [`bsdf::Bsdf`] collects up to
//! [`bsdf::MAX_BXDFS`] borrowed lobes, moves directions between world space and the shading
//! frame and picks a lobe to sample. Lobes borrow their collaborators ([`fresnel::Fresnel`],
//! `MicrofacetDistribution`), so everything can be built on the stack of a shader.
//!
//! The `|cos theta_i|` factor is not part of `f`. The user is responsible for multiplying it in
//! where necessary (almost always). Pdfs on the other hand are meant for importance sampling and
//! take the cosine into account where they can.
//!
//! `sample_f` functions are deterministic. You are responsible for generating the samples in
//! `[0,1)^2`. This allows you to control the random generator or low discrepancy sequence in
//! use.
//!
//! Perfectly specular lobes return `0` from `f` and `pdf` and can only be reached through
//! sampling.
//!
//! This crate is built on [glam] for a simple but fast vector math library at the core. It logs
//! through the [log] facade and never installs a logger.
//!
//! # Features
//! * `ggx`: the Trowbridge-Reitz (GGX) microfacet distribution
//! * `microfacet`: rough reflection and transmission (Torrance-Sparrow, Walter et al.)
//! * `fresnel-blend`: the Ashikhmin-Shirley coated diffuse model
//! * `fourier`: measured materials stored as Fourier series tables
//! * `materials`: glass, metal and plastic shaders for a host renderer
//!
//! # References
//! * Matt Pharr, Wenzel Jakob, and Greg Humphreys. *Physically Based Rendering: From Theory to
//!     Implementation*, 3rd edition, 2016.
//! * Eric Heitz. Understanding the masking-shadowing function in microfacet-based brdfs.
//!     *Journal of Computer Graphics Techniques, 3(2):32–91,* 2014.
//! * Eric Veach. *Robust monte carlo methods for light transport simulation.* PhD thesis, Stanford University, 1997.
//! * Bruce Walter, Stephen R. Marschner, Hongsong Li, and Kenneth E. Torrance. Microfacet models for refraction through rough surfaces. In *Proceedings of the Eurographics Symposium on Rendering,* 2007.
//! * Eric Heitz, Sampling the GGX Distribution of Visible Normals, *Journal of Computer Graphics Techniques (JCGT)*, vol. 7, no. 4, 1–13, 2018
//!     <http://jcgt.org/published/0007/04/01/>
//! * Michael Oren and Shree K. Nayar. Generalization of Lambert's reflectance model. In *Proceedings of SIGGRAPH*, 1994.
//! * Michael Ashikhmin and Peter Shirley. An anisotropic Phong BRDF model. *Journal of Graphics Tools, 5(2):25–32*, 2000.
//! * Wenzel Jakob, Eugene d'Eon, Otto Jakob, and Steve Marschner. A comprehensive framework for rendering layered materials. *ACM Transactions on Graphics, 33(4)*, 2014.

pub mod core;

pub use crate::core::{
    BxDF, BxDFSample, BxDFType, RgbD, RgbF, RgbaD, TransportMode, Vec2d, Vec3d,
    ONE_MINUS_EPSILON,
};

#[cfg(test)]
pub(crate) mod test_utils;
pub mod utils;

pub mod bsdf;
pub mod error;
pub mod frame;
pub mod fresnel;
pub mod lambert;
pub mod oren_nayar;
pub mod scaled;
pub mod specular;

#[cfg(feature = "fourier")]
pub mod fourier;
#[cfg(feature = "fresnel-blend")]
pub mod fresnel_blend;
#[cfg(feature = "ggx")]
pub mod ggx;
#[cfg(feature = "fourier")]
pub mod interpolation;
#[cfg(feature = "materials")]
pub mod materials;
#[cfg(feature = "microfacet")]
pub mod microfacet;
