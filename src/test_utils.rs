pub trait ApproxEqual: Copy {
    fn equals_approx(self, other: Self, eps: Self, eps_rel: Self) -> bool;
    fn equals_approx_abs(self, other: Self, eps: Self) -> bool;
    fn equals_approx_rel(self, other: Self, eps: Self) -> bool;
}

macro_rules! assert_eq_approx {
    ($lhs:expr, $rhs:expr, $eps_abs:expr, $eps_rel:expr) => {
        assert!(
            $crate::test_utils::ApproxEqual::equals_approx($lhs, $rhs, $eps_abs, $eps_rel),
            r#"assert_eq_abs failed:
    {}: {:?}
    {}: {:?}
    {} (maximum absolute error): {:?}
    {} (maximum relative error): {:?}"#,
            stringify!($lhs),
            $lhs,
            stringify!($rhs),
            $rhs,
            stringify!($eps_abs),
            $eps_abs,
            stringify!($eps_rel),
            $eps_rel,
        );
    };

    ($lhs:expr, $rhs:expr, $eps_abs: expr, $eps_rel:expr, $($arg:tt)+) => {
        assert!($crate::test_utils::ApproxEqual::equals_approx($lhs, $rhs, $eps_abs, $eps_rel), $($arg)*);
    }
}

macro_rules! assert_eq_approx_abs {
    ($lhs:expr, $rhs:expr, $eps_abs:expr) => {
        assert!(
            $crate::test_utils::ApproxEqual::equals_approx_abs($lhs, $rhs, $eps_abs),
            r#"assert_eq_abs failed:
    {}: {:?}
    {}: {:?}
    {} (maximum absolute error): {:?}"#,
            stringify!($lhs),
            $lhs,
            stringify!($rhs),
            $rhs,
            stringify!($eps_abs),
            $eps_abs,
        )
    };

    ($lhs:expr, $rhs:expr, $eps_abs:expr, $($arg:tt)+) => {
        assert!($crate::test_utils::ApproxEqual::equals_approx_abs($lhs, $rhs, $eps_abs),
        $($arg)*);
    };
}

macro_rules! assert_in_range {
    ($value:expr, $lower:expr, $upper:expr) => {
        assert!(
            $lower <= $value && $value <= $upper,
            r#"assert_in_range failed:
    {} (value): {:?}
    {} (lower bound): {:?}
    {} (upper bound): {:?}"#,
            stringify!($value),
            $value,
            stringify!($lower),
            $lower,
            stringify!($upper),
            $upper
        )
    };
}

macro_rules! impl_approx_equal {
    ($scalar:ty, $vector:ty) => {
        impl ApproxEqual for $scalar {
            fn equals_approx(self, other: Self, eps: Self, eps_rel: Self) -> bool {
                #[allow(clippy::float_cmp)]
                if self == other || (self - other).abs() <= eps {
                    true
                } else {
                    let diff = (self - other).abs();
                    let max = self.abs().max(other.abs());
                    diff <= max * eps_rel
                }
            }

            fn equals_approx_abs(self, other: Self, eps: Self) -> bool {
                #[allow(clippy::float_cmp)]
                if self == other {
                    true
                } else {
                    (self - other).abs() <= eps
                }
            }

            fn equals_approx_rel(self, other: Self, eps: Self) -> bool {
                #[allow(clippy::float_cmp)]
                if self == other {
                    return true;
                }
                let diff = (self - other).abs();
                let max = self.abs().max(other.abs());
                diff <= max * eps
            }
        }

        impl ApproxEqual for $vector {
            fn equals_approx_rel(self, other: Self, eps: Self) -> bool {
                $crate::test_utils::ApproxEqual::equals_approx_rel(self.x, other.x, eps.x)
                    && $crate::test_utils::ApproxEqual::equals_approx_rel(self.y, other.y, eps.y)
                    && $crate::test_utils::ApproxEqual::equals_approx_rel(self.z, other.z, eps.z)
            }
            fn equals_approx_abs(self, other: Self, eps: Self) -> bool {
                $crate::test_utils::ApproxEqual::equals_approx_abs(self.x, other.x, eps.x)
                    && $crate::test_utils::ApproxEqual::equals_approx_abs(self.y, other.y, eps.y)
                    && $crate::test_utils::ApproxEqual::equals_approx_abs(self.z, other.z, eps.z)
            }
            fn equals_approx(self, other: Self, eps_abs: Self, eps_rel: Self) -> bool {
                $crate::test_utils::ApproxEqual::equals_approx(
                    self.x, other.x, eps_abs.x, eps_rel.x,
                ) && $crate::test_utils::ApproxEqual::equals_approx(
                    self.y, other.y, eps_abs.y, eps_rel.y,
                ) && $crate::test_utils::ApproxEqual::equals_approx(
                    self.z, other.z, eps_abs.z, eps_rel.z,
                )
            }
        }
    };
}


impl_approx_equal!(f64, Vec3d);

use std::f64::consts;

pub(crate) use assert_eq_approx;
pub(crate) use assert_eq_approx_abs;
pub(crate) use assert_in_range;

use crate::{
    utils::{FloatExt, VecExt},
    BxDF, BxDFSample, RgbD, Vec2d, Vec3d,
};

pub trait SamplerExt {
    fn vec2d(&mut self) -> Vec2d;
}

impl SamplerExt for fastrand::Rng {
    fn vec2d(&mut self) -> Vec2d {
        Vec2d::new(self.f64(), self.f64())
    }
}

/** sample a direction with density 1 / 4pi */
pub fn spherical_sample(rd: &mut fastrand::Rng) -> Vec3d {
    let u = rd.f64();
    let v = rd.f64();
    spherical_sample_uv(u, v)
}

fn spherical_sample_uv(u: f64, v: f64) -> Vec3d {
    #[allow(clippy::suboptimal_flops)]
    let cos_theta = 2.0 * u - 1.0;
    #[allow(clippy::suboptimal_flops)]
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    let phi = v * 2.0 * consts::PI;
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vec3d::new(sin_theta * sin_phi, sin_theta * cos_phi, cos_theta)
}

/// a direction that is neither grazing nor exactly along the normal
pub fn non_grazing_sample(rd: &mut fastrand::Rng) -> Vec3d {
    loop {
        let omega = spherical_sample(rd);
        if omega.z.abs() > 0.05 && omega.z.abs() < 0.999 {
            return omega;
        }
    }
}

/// Estimates the directional albedo for many outgoing directions and checks that no energy is
/// created. With `allowed_energy_loss` set, also checks that at most that much is lost.
#[allow(clippy::cast_lossless)]
pub fn test_energy_conservation<T: BxDF + ?Sized>(bxdf: &T, allowed_energy_loss: Option<f64>) {
    let mut rd = fastrand::Rng::with_seed(0x5eed);
    let runs = 20;
    let num_samples = 100_000;
    for _i in 0..runs {
        let omega_o = non_grazing_sample(&mut rd);
        let mut sum = RgbD::ZERO;
        let mut sum2 = RgbD::ZERO;
        for _ in 0..num_samples {
            let BxDFSample { f, omega_i, pdf, .. } = bxdf.sample_f(omega_o, rd.vec2d());

            if pdf > 0.0 && f.luminance() > 0.0 {
                let contrib = f / pdf * omega_i.z.abs();
                sum += contrib;
                sum2 += contrib.sq();
            }
        }
        sum /= num_samples as f64;
        sum2 /= num_samples as f64;

        let variance =
            (sum2 - sum.sq()).luminance() * num_samples as f64 / (num_samples - 1) as f64;

        let std_error = (variance.abs() / num_samples as f64).sqrt();
        let confidence = (4.0 * std_error).max(1e-3);

        for channel in [sum.x, sum.y, sum.z] {
            let lower = allowed_energy_loss.map_or(0.0, |loss| 1.0 - confidence - loss);
            assert_in_range!(channel, lower, 1.0 + confidence);
        }
    }
}

/// Checks that `sample_f`, `f` and `pdf` agree on the sampled directions.
pub fn test_bxdf_sample_eval<T: BxDF + ?Sized>(bxdf: &T) {
    let mut rd = fastrand::Rng::with_seed(0xbeef);
    let runs = 10000;
    for _ in 0..runs {
        let omega_o = non_grazing_sample(&mut rd);
        let BxDFSample {
            f,
            omega_i,
            pdf,
            sampled_type,
        } = bxdf.sample_f(omega_o, rd.vec2d());
        if pdf == 0.0 {
            continue;
        }
        assert_eq!(sampled_type, bxdf.bxdf_type());
        assert_eq_approx_abs!(omega_i.length(), 1.0, 1e-6);
        let c_f = bxdf.f(omega_o, omega_i);
        let c_pdf = bxdf.pdf(omega_o, omega_i);
        assert!(
            c_pdf > 0.0 || f.luminance() == 0.0,
            r#"
    PDFs must be greater than 0.
    pdf: {pdf},
    c_pdf: {c_pdf},
    f: {f:?},
    omega_o: {omega_o:?},
    omega_i: {omega_i:?}"#
        );
        assert_eq_approx!(
            pdf,
            c_pdf,
            0.01,
            0.003,
            r#"
    PDFs must be equal for sample_f and pdf,
    pdf: {pdf},
    c_pdf: {c_pdf},
    omega_o: {omega_o:?},
    omega_i: {omega_i:?}"#
        );
        assert_eq_approx!(f, c_f, RgbD::splat(0.001), RgbD::splat(0.001));

        assert!(pdf >= 0.0);
        assert!(f.x >= 0.0);
        assert!(f.y >= 0.0);
        assert!(f.z >= 0.0);
    }
}

/// Reflection lobes must be symmetric in their arguments
pub fn test_bxdf_reciprocity<T: BxDF + ?Sized>(bxdf: &T) {
    let mut rd = fastrand::Rng::with_seed(0xcafe);
    let runs = 10000;
    for _i in 0..runs {
        let omega_o = non_grazing_sample(&mut rd);
        let omega_i = non_grazing_sample(&mut rd);

        let c_f = bxdf.f(omega_o, omega_i);
        let r_f = bxdf.f(omega_i, omega_o);

        assert!(bxdf.pdf(omega_o, omega_i) >= 0.0, "the pdf should never be negative");
        assert!(c_f.x >= 0.0, "the bsdf should always be positive");
        assert!(c_f.y >= 0.0, "the bsdf should always be positive");
        assert!(c_f.z >= 0.0, "the bsdf should always be positive");

        assert_eq_approx!(c_f, r_f, RgbD::splat(0.001), RgbD::splat(0.0001));
    }
}

/// Integrates `1 / pdf` with a mixture of the lobe's own sampling and uniform sphere sampling.
/// The estimate only approaches `1` if `sample_f` and `pdf` describe the same density, which
/// requires a lobe whose `sample_f` never fails.
pub fn test_integrate_inverse_pdf<T: BxDF + ?Sized>(bxdf: &T) {
    const DOMAIN: f64 = 4.0 * std::f64::consts::PI;
    let spheric_pdf = 1.0 / DOMAIN;

    let mut rd = fastrand::Rng::with_seed(0xf00d);
    let runs = 10;
    let num_samples = 200_000;
    for i in 0..runs {
        let omega_o: Vec3d = non_grazing_sample(&mut rd);
        let mut sum = 0.0;
        let mut sum_of_squared = 0.0;
        for _ in 0..num_samples {
            let pdf = if rd.f32() > 0.5 {
                let BxDFSample { pdf: pdf_bxdf, .. } = bxdf.sample_f(omega_o, rd.vec2d());
                #[allow(clippy::suboptimal_flops)]
                {
                    0.5 * spheric_pdf + 0.5 * pdf_bxdf
                }
            } else {
                let omega_i = spherical_sample(&mut rd);
                let pdf_bxdf = bxdf.pdf(omega_o, omega_i);
                #[allow(clippy::suboptimal_flops)]
                {
                    0.5 * spheric_pdf + 0.5 * pdf_bxdf
                }
            };
            let value = 1.0 / pdf;
            sum += value;
            sum_of_squared += value.sq();
        }
        sum /= DOMAIN * num_samples as f64;
        sum_of_squared /= DOMAIN.sq() * (num_samples) as f64;
        let variance_unscaled = sum_of_squared - sum.sq();

        let sample_standard_deviation =
            ((num_samples as f64) / (num_samples - 1) as f64 * variance_unscaled).sqrt();
        let standard_error = sample_standard_deviation / (num_samples as f64).sqrt();

        let confidence_thres = (4.0 * standard_error).max(1e-3);
        assert_eq_approx_abs!(
            sum,
            1.0,
            confidence_thres,
            r#"
    expected the monte carlo test to approach 1.
    But it approached {sum} after {num_samples} Samples with a standard error of {standard_error}.
    Required Confidence is {}.
    Difference is {}.
    omega_o: {omega_o:?}
    i: {i}"#,
            confidence_thres,
            (sum - 1.0).abs()
        );
    }
}

/// For lobes whose sampling may fail (e.g. a reflected half vector ending up below the
/// surface), the pdf integrates to at most `1` over the sphere.
pub fn test_pdf_integral_at_most_one<T: BxDF + ?Sized>(bxdf: &T) {
    const DOMAIN: f64 = 4.0 * std::f64::consts::PI;
    let mut rd = fastrand::Rng::with_seed(0xd1ce);
    let num_samples = 200_000;
    for _ in 0..10 {
        let omega_o = non_grazing_sample(&mut rd);
        let mut sum = 0.0;
        for _ in 0..num_samples {
            let omega_i = spherical_sample(&mut rd);
            sum += bxdf.pdf(omega_o, omega_i) * DOMAIN;
        }
        let integral = sum / num_samples as f64;
        assert!(
            integral <= 1.05,
            "pdf integrates to {integral} for omega_o: {omega_o:?}"
        );
    }
}

/// uniformly distributed directions in the upper hemisphere, useful for `rho_hh`
pub fn sample_set(rd: &mut fastrand::Rng, n: usize) -> Vec<Vec2d> {
    (0..n).map(|_| rd.vec2d()).collect()
}

