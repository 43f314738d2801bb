use std::f64::consts;

use crate::{RgbD, RgbF, Vec2d, Vec3d};

pub trait FloatExt {
    fn sq(self) -> Self;
}

impl FloatExt for f64 {
    fn sq(self) -> Self {
        self * self
    }
}

pub trait SafeCast<Target> {
    fn safe_cast(self) -> Target;
}

impl SafeCast<RgbD> for RgbF {
    fn safe_cast(self) -> RgbD {
        RgbD {
            x: self.x as f64,
            y: self.y as f64,
            z: self.z as f64,
        }
    }
}

pub trait VecExt {
    type Scalar;
    #[must_use]
    fn luminance(self) -> Self::Scalar;
    #[must_use]
    fn sq(self) -> Self;
    #[must_use]
    fn sqrt(self) -> Self;
}

impl VecExt for Vec3d {
    type Scalar = f64;

    fn sq(self) -> Self {
        self * self
    }

    /// Returns the perceived brightness of the color
    fn luminance(self) -> Self::Scalar {
        let lfac = Self::new(0.2126, 0.7152, 0.0722);
        self.dot(lfac)
    }

    fn sqrt(self) -> Self {
        Self {
            x: self.x.sqrt(),
            y: self.y.sqrt(),
            z: self.z.sqrt(),
        }
    }
}

// ---------- trigonometry in the local shading frame (normal = z) ----------

#[must_use]
pub const fn cos_theta(w: Vec3d) -> f64 {
    w.z
}

#[must_use]
pub fn cos2_theta(w: Vec3d) -> f64 {
    w.z * w.z
}

#[must_use]
pub fn abs_cos_theta(w: Vec3d) -> f64 {
    w.z.abs()
}

#[must_use]
pub fn sin2_theta(w: Vec3d) -> f64 {
    (1.0 - cos2_theta(w)).max(0.0)
}

#[must_use]
pub fn sin_theta(w: Vec3d) -> f64 {
    sin2_theta(w).sqrt()
}

#[must_use]
pub fn tan_theta(w: Vec3d) -> f64 {
    sin_theta(w) / cos_theta(w)
}

#[must_use]
pub fn tan2_theta(w: Vec3d) -> f64 {
    sin2_theta(w) / cos2_theta(w)
}

#[must_use]
pub fn cos_phi(w: Vec3d) -> f64 {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        1.0
    } else {
        (w.x / sin_theta).clamp(-1.0, 1.0)
    }
}

#[must_use]
pub fn sin_phi(w: Vec3d) -> f64 {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        0.0
    } else {
        (w.y / sin_theta).clamp(-1.0, 1.0)
    }
}

#[must_use]
pub fn cos2_phi(w: Vec3d) -> f64 {
    cos_phi(w).sq()
}

#[must_use]
pub fn sin2_phi(w: Vec3d) -> f64 {
    sin_phi(w).sq()
}

/// cosine of the azimuthal angle between `wa` and `wb`
#[must_use]
pub fn cos_d_phi(wa: Vec3d, wb: Vec3d) -> f64 {
    #[allow(clippy::suboptimal_flops)]
    let num = wa.x * wb.x + wa.y * wb.y;
    #[allow(clippy::suboptimal_flops)]
    let den = ((wa.x * wa.x + wa.y * wa.y) * (wb.x * wb.x + wb.y * wb.y)).sqrt();
    if den == 0.0 {
        return 1.0;
    }
    (num / den).clamp(-1.0, 1.0)
}

#[must_use]
pub fn same_hemisphere(w: Vec3d, wp: Vec3d) -> bool {
    w.z * wp.z > 0.0
}

/// flips `n` so that it lies in the same hemisphere as `v`
#[must_use]
pub fn face_forward(n: Vec3d, v: Vec3d) -> Vec3d {
    if n.dot(v) < 0.0 {
        -n
    } else {
        n
    }
}

/// mirrors `vec` about `n`
#[must_use]
pub fn reflect(n: Vec3d, vec: Vec3d) -> Vec3d {
    n * (n.dot(vec) * 2.0) - vec
}

/// Refracts `omega_i` through an interface with normal `n` (on the side of `omega_i`).
/// `eta` is the ratio `eta_incident / eta_transmitted`.
/// Returns `None` on total internal reflection.
#[must_use]
pub fn refract(omega_i: Vec3d, n: Vec3d, eta: f64) -> Option<Vec3d> {
    let cos_theta_i = n.dot(omega_i);
    let sin2_theta_i = (1.0 - cos_theta_i.sq()).max(0.0);
    let sin2_theta_t = eta.sq() * sin2_theta_i;
    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = (1.0 - sin2_theta_t).sqrt();
    #[allow(clippy::suboptimal_flops)]
    Some(-omega_i * eta + n * (eta * cos_theta_i - cos_theta_t))
}

#[must_use]
pub fn pow5(v: f64) -> f64 {
    let v2 = v * v;
    v2 * v2 * v
}

// ---------- sampling ----------

/// maps `[0,1)^2` onto the unit disk, preserving relative areas
#[must_use]
pub fn concentric_sample_disk(u: Vec2d) -> Vec2d {
    let offset = u * 2.0 - Vec2d::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2d::ZERO;
    }
    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, consts::FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (
            offset.y,
            consts::FRAC_PI_2 - consts::FRAC_PI_4 * (offset.x / offset.y),
        )
    };
    let (sin, cos) = theta.sin_cos();
    Vec2d::new(cos, sin) * r
}

/* pdf is cos(theta) / pi */
#[must_use]
pub fn cosine_sample_hemisphere(u: Vec2d) -> Vec3d {
    let d = concentric_sample_disk(u);
    let z = (1.0 - d.length_squared()).max(0.0).sqrt();
    Vec3d::new(d.x, d.y, z)
}

/* pdf is 1 / (2 pi) */
#[must_use]
pub fn uniform_sample_hemisphere(u: Vec2d) -> Vec3d {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * consts::PI * u.y;
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vec3d::new(r * cos_phi, r * sin_phi, z)
}

#[must_use]
pub fn uniform_hemisphere_pdf() -> f64 {
    0.5 * consts::FRAC_1_PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_eq_approx_abs;

    #[test]
    fn local_frame_trigonometry() {
        let w = Vec3d::new(0.6, 0.0, 0.8);
        assert_eq_approx_abs!(tan_theta(w), 0.75, 1e-12);
        assert_eq_approx_abs!(tan2_theta(w), 0.5625, 1e-12);
        assert_eq_approx_abs!(cos2_phi(w), 1.0, 1e-12);
        assert_eq_approx_abs!(sin2_phi(w), 0.0, 1e-12);

        let w = Vec3d::new(0.0, -0.6, -0.8);
        assert_eq_approx_abs!(tan_theta(w), -0.75, 1e-12);
        assert_eq_approx_abs!(cos2_phi(w), 0.0, 1e-12);
        assert_eq_approx_abs!(sin2_phi(w), 1.0, 1e-12);

        // the normal itself has no azimuth
        assert_eq!(cos2_phi(Vec3d::Z), 1.0);
        assert_eq!(sin2_phi(Vec3d::Z), 0.0);
        assert_eq!(tan2_theta(Vec3d::Z), 0.0);
    }

    #[test]
    fn refract_straight_through() {
        let omega = Vec3d::new(0.0, 0.0, 1.0);
        let t = refract(omega, Vec3d::Z, 1.0 / 1.5).unwrap();
        assert_eq_approx_abs!(t, -Vec3d::Z, Vec3d::splat(1e-12));
    }

    #[test]
    fn refract_total_internal_reflection() {
        let omega = Vec3d::new(0.9, 0.0, (1.0 - 0.81_f64).sqrt());
        assert!(refract(omega, Vec3d::Z, 1.5).is_none());
    }

    #[test]
    fn refract_obeys_snell() {
        let omega = Vec3d::new(0.6, 0.0, 0.8);
        let eta = 1.0 / 1.33;
        let t = refract(omega, Vec3d::Z, eta).unwrap();
        assert_eq_approx_abs!(t.length(), 1.0, 1e-12);
        assert_eq_approx_abs!(sin_theta(t), eta * sin_theta(omega), 1e-12);
        assert!(t.z < 0.0);
    }

    #[test]
    fn cosine_samples_are_unit_and_upper() {
        let mut rd = fastrand::Rng::with_seed(7);
        for _ in 0..1000 {
            let w = cosine_sample_hemisphere(Vec2d::new(rd.f64(), rd.f64()));
            assert_eq_approx_abs!(w.length(), 1.0, 1e-9);
            assert!(w.z >= 0.0);
        }
    }

    #[test]
    fn azimuth_helpers() {
        let w = Vec3d::new(0.0, 0.0, 1.0);
        assert_eq_approx_abs!(cos_phi(w), 1.0, 1e-12);
        assert_eq_approx_abs!(sin_phi(w), 0.0, 1e-12);
        let a = Vec3d::new(1.0, 0.0, 0.5);
        let b = Vec3d::new(0.0, 1.0, 0.5);
        assert_eq_approx_abs!(cos_d_phi(a, b), 0.0, 1e-12);
        assert_eq_approx_abs!(cos_d_phi(a, -a), -1.0, 1e-12);
    }
}
