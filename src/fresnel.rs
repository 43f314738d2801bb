//! Fresnel reflectance at smooth interfaces
//!
//! # Mathematical background
//! * [Memo on Fresnel equations](https://seblagarde.wordpress.com/2013/04/29/memo-on-fresnel-equations/)
use std::fmt;

use crate::{
    utils::{self, FloatExt, VecExt},
    RgbD,
};

/// Fresnel reflectance of a dielectric interface for unpolarized light.
///
/// `cos_theta_i` may be negative, in which case the direction is taken to leave the medium with
/// `eta_t` and the two indices are swapped.
#[must_use]
pub fn fr_dielectric(cos_theta_i: f64, eta_i: f64, eta_t: f64) -> f64 {
    let mut cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    let (eta_i, eta_t) = if cos_theta_i > 0.0 {
        (eta_i, eta_t)
    } else {
        cos_theta_i = cos_theta_i.abs();
        (eta_t, eta_i)
    };

    let sin_theta_i = (1.0 - cos_theta_i.sq()).max(0.0).sqrt();
    let sin_theta_t = eta_i / eta_t * sin_theta_i;
    if sin_theta_t >= 1.0 {
        // total internal reflection
        return 1.0;
    }
    let cos_theta_t = (1.0 - sin_theta_t.sq()).max(0.0).sqrt();

    #[allow(clippy::suboptimal_flops)]
    let r_parl = (eta_t * cos_theta_i - eta_i * cos_theta_t) / (eta_t * cos_theta_i + eta_i * cos_theta_t);
    #[allow(clippy::suboptimal_flops)]
    let r_perp = (eta_i * cos_theta_i - eta_t * cos_theta_t) / (eta_i * cos_theta_i + eta_t * cos_theta_t);
    (r_parl.sq() + r_perp.sq()) / 2.0
}

/// Fresnel reflectance between a dielectric (`eta_i`) and a conductor with complex index of
/// refraction `eta_t + i k`, evaluated per channel.
#[must_use]
pub fn fr_conductor(cos_theta_i: f64, eta_i: RgbD, eta_t: RgbD, k: RgbD) -> RgbD {
    let cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    let eta = eta_t / eta_i;
    let eta_k = k / eta_i;

    let cos2 = cos_theta_i.sq();
    let sin2 = 1.0 - cos2;
    let eta2 = eta.sq();
    let eta_k2 = eta_k.sq();

    let t0 = eta2 - eta_k2 - RgbD::splat(sin2);
    let a2_plus_b2 = (t0.sq() + 4.0 * eta2 * eta_k2).sqrt();
    let t1 = a2_plus_b2 + RgbD::splat(cos2);
    let a = (0.5 * (a2_plus_b2 + t0)).max(RgbD::ZERO).sqrt();
    let t2 = 2.0 * cos_theta_i * a;
    let rs = guarded_ratio(t1 - t2, t1 + t2);

    #[allow(clippy::suboptimal_flops)]
    let t3 = cos2 * a2_plus_b2 + RgbD::splat(sin2 * sin2);
    let t4 = t2 * sin2;
    let rp = rs * guarded_ratio(t3 - t4, t3 + t4);

    0.5 * (rp + rs)
}

/// `num / den` per channel. A vanishing denominator only happens at grazing angles against an
/// index matched interface without absorption. The numerator vanishes with it and nothing is
/// reflected there.
fn guarded_ratio(num: RgbD, den: RgbD) -> RgbD {
    let ratio = |n: f64, d: f64| if d == 0.0 { 0.0 } else { n / d };
    RgbD::new(ratio(num.x, den.x), ratio(num.y, den.y), ratio(num.z, den.z))
}

/// Schlick's approximation of the Fresnel term with normal incidence reflectance `r0`
#[must_use]
pub fn schlick(r0: RgbD, cos_theta: f64) -> RgbD {
    r0 + (RgbD::ONE - r0) * utils::pow5(1.0 - cos_theta.abs())
}

/// A reflectance model at an interface
pub trait Fresnel: fmt::Debug {
    /// The fraction of light reflected for an incident direction with the given cosine
    fn evaluate(&self, cos_theta_i: f64) -> RgbD;
}

/// Interface between two dielectrics
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FresnelDielectric {
    /// index of refraction on the side of the normal
    pub eta_i: f64,
    /// index of refraction on the opposite side
    pub eta_t: f64,
}

impl FresnelDielectric {
    #[must_use]
    pub const fn new(eta_i: f64, eta_t: f64) -> Self {
        Self { eta_i, eta_t }
    }
}

impl Fresnel for FresnelDielectric {
    fn evaluate(&self, cos_theta_i: f64) -> RgbD {
        RgbD::splat(fr_dielectric(cos_theta_i, self.eta_i, self.eta_t))
    }
}

/// Interface between a dielectric and a metal
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FresnelConductor {
    pub eta_i: RgbD,
    pub eta_t: RgbD,
    /// absorption coefficient
    pub k: RgbD,
}

impl FresnelConductor {
    #[must_use]
    pub const fn new(eta_i: RgbD, eta_t: RgbD, k: RgbD) -> Self {
        Self { eta_i, eta_t, k }
    }
}

impl Fresnel for FresnelConductor {
    fn evaluate(&self, cos_theta_i: f64) -> RgbD {
        fr_conductor(cos_theta_i.abs(), self.eta_i, self.eta_t, self.k)
    }
}

/// Reflects everything
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FresnelNoOp;

impl Fresnel for FresnelNoOp {
    fn evaluate(&self, _cos_theta_i: f64) -> RgbD {
        RgbD::ONE
    }
}
