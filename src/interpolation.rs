//! Spline interpolation and Fourier series helpers for tabulated scattering data
use std::f64::consts;

use crate::utils::FloatExt;

/// Largest index `i` in `[0, size - 2]` with `pred(i)` true, assuming `pred` is true for a prefix
fn find_interval(size: usize, pred: impl Fn(usize) -> bool) -> usize {
    let mut first = 0;
    let mut len = size;
    while len > 0 {
        let half = len >> 1;
        let middle = first + half;
        if pred(middle) {
            first = middle + 1;
            len -= half + 1;
        } else {
            len = half;
        }
    }
    first.saturating_sub(1).min(size.saturating_sub(2))
}

/// Position of a value on a spline: the four nodes starting at `offset` (which may be `-1`)
/// contribute with `weights`. Weights for nodes outside the grid are always `0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplineWeights {
    pub offset: isize,
    pub weights: [f64; 4],
}

impl SplineWeights {
    /// Iterates the grid indices with a non-zero weight
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != 0.0)
            .filter_map(|(i, &w)| usize::try_from(self.offset + i as isize).ok().map(|idx| (idx, w)))
    }
}

/// Catmull-Rom weights for evaluating a spline through `nodes` at `x`. Returns `None` if `x` is
/// outside of the grid. At the ends of the grid the missing derivative is replaced by a one
/// sided difference.
#[must_use]
pub fn catmull_rom_weights(nodes: &[f64], x: f64) -> Option<SplineWeights> {
    let size = nodes.len();
    if size < 2 || !(x >= nodes[0] && x <= nodes[size - 1]) {
        return None;
    }
    let idx = find_interval(size, |i| nodes[i] <= x);
    let x0 = nodes[idx];
    let x1 = nodes[idx + 1];
    let t = (x - x0) / (x1 - x0);
    let t2 = t * t;
    let t3 = t2 * t;

    let mut weights = [0.0; 4];
    #[allow(clippy::suboptimal_flops)]
    {
        weights[1] = 2.0 * t3 - 3.0 * t2 + 1.0;
        weights[2] = -2.0 * t3 + 3.0 * t2;

        if idx > 0 {
            let w0 = (t3 - 2.0 * t2 + t) * (x1 - x0) / (x1 - nodes[idx - 1]);
            weights[0] = -w0;
            weights[2] += w0;
        } else {
            let w0 = t3 - 2.0 * t2 + t;
            weights[0] = 0.0;
            weights[1] -= w0;
            weights[2] += w0;
        }

        if idx + 2 < size {
            let w3 = (t3 - t2) * (x1 - x0) / (nodes[idx + 2] - x0);
            weights[1] -= w3;
            weights[3] = w3;
        } else {
            let w3 = t3 - t2;
            weights[1] -= w3;
            weights[2] += w3;
            weights[3] = 0.0;
        }
    }
    Some(SplineWeights {
        offset: idx as isize - 1,
        weights,
    })
}

/// Integrates the Catmull-Rom spline through `(nodes, values)`. Returns the running integral at
/// every node (starting with `0`) and the total.
#[must_use]
pub fn integrate_catmull_rom(nodes: &[f64], values: &[f64]) -> (Vec<f64>, f64) {
    let n = nodes.len().min(values.len());
    let mut cdf = Vec::with_capacity(n.max(1));
    cdf.push(0.0);
    let mut sum = 0.0;
    for i in 0..n.saturating_sub(1) {
        let (x0, x1) = (nodes[i], nodes[i + 1]);
        let (f0, f1) = (values[i], values[i + 1]);
        let width = x1 - x0;
        let d0 = if i > 0 {
            width * (f1 - values[i - 1]) / (x1 - nodes[i - 1])
        } else {
            f1 - f0
        };
        let d1 = if i + 2 < n {
            width * (values[i + 2] - f0) / (nodes[i + 2] - x0)
        } else {
            f1 - f0
        };
        #[allow(clippy::suboptimal_flops)]
        {
            sum += ((d0 - d1) * (1.0 / 12.0) + (f0 + f1) * 0.5) * width;
        }
        cdf.push(sum);
    }
    (cdf, sum)
}

/// Samples the second dimension of a 2D spline `values` (row major, `nodes1.len()` rows of
/// `nodes2.len()` entries) with the first dimension fixed to `alpha`. `cdf` holds the running
/// integrals of every row as computed by [`integrate_catmull_rom`].
///
/// Returns the sampled position, the spline value there and the density of the sample.
#[must_use]
pub fn sample_catmull_rom_2d(
    nodes1: &[f64],
    nodes2: &[f64],
    values: &[f64],
    cdf: &[f64],
    alpha: f64,
    u: f64,
) -> Option<(f64, f64, f64)> {
    let size2 = nodes2.len();
    if size2 < 2 {
        return None;
    }
    let spline = catmull_rom_weights(nodes1, alpha)?;
    let interpolate = |array: &[f64], idx: usize| -> f64 {
        spline
            .nonzero()
            .map(|(row, w)| array[row * size2 + idx] * w)
            .sum()
    };

    let maximum = interpolate(cdf, size2 - 1);
    if maximum <= 0.0 {
        return None;
    }
    let u = u * maximum;
    let idx = find_interval(size2, |i| interpolate(cdf, i) <= u);

    let f0 = interpolate(values, idx);
    let f1 = interpolate(values, idx + 1);
    let x0 = nodes2[idx];
    let x1 = nodes2[idx + 1];
    let width = x1 - x0;
    let d0 = if idx > 0 {
        width * (f1 - interpolate(values, idx - 1)) / (x1 - nodes2[idx - 1])
    } else {
        f1 - f0
    };
    let d1 = if idx + 2 < size2 {
        width * (interpolate(values, idx + 2) - f0) / (nodes2[idx + 2] - x0)
    } else {
        f1 - f0
    };

    // invert the spline segment with a bisection safeguarded Newton iteration
    let u = (u - interpolate(cdf, idx)) / width;
    #[allow(clippy::float_cmp)]
    let mut t = if f0 == f1 {
        u / f0
    } else {
        #[allow(clippy::suboptimal_flops)]
        let disc = (f0 * f0 + 2.0 * u * (f1 - f0)).max(0.0);
        (f0 - disc.sqrt()) / (f0 - f1)
    };
    let (mut a, mut b) = (0.0, 1.0);
    let mut f_hat;
    loop {
        if !(t >= a && t <= b) {
            t = 0.5 * (a + b);
        }
        #[allow(clippy::suboptimal_flops)]
        let big_f_hat = t
            * (f0
                + t * (0.5 * d0
                    + t * ((1.0 / 3.0) * (-2.0 * d0 - d1) + f1 - f0
                        + t * (0.25 * (d0 + d1) + 0.5 * (f0 - f1)))));
        #[allow(clippy::suboptimal_flops)]
        {
            f_hat = f0
                + t * (d0
                    + t * (-2.0 * d0 - d1 + 3.0 * (f1 - f0) + t * (d0 + d1 + 2.0 * (f0 - f1))));
        }
        if (big_f_hat - u).abs() < 1e-6 || b - a < 1e-6 {
            break;
        }
        if big_f_hat - u < 0.0 {
            a = t;
        } else {
            b = t;
        }
        t -= (big_f_hat - u) / f_hat;
    }
    #[allow(clippy::suboptimal_flops)]
    Some((x0 + width * t, f_hat, f_hat / maximum))
}

/// Evaluates the cosine series `sum_k a[k] cos(k phi)` using the recurrence for `cos(k phi)`
#[must_use]
pub fn fourier(a: &[f64], cos_phi: f64) -> f64 {
    let mut value = 0.0;
    let mut cos_k_minus_one_phi = cos_phi;
    let mut cos_k_phi = 1.0;
    for &ak in a {
        value += ak * cos_k_phi;
        #[allow(clippy::suboptimal_flops)]
        let cos_k_plus_one_phi = 2.0 * cos_phi * cos_k_phi - cos_k_minus_one_phi;
        cos_k_minus_one_phi = cos_k_phi;
        cos_k_phi = cos_k_plus_one_phi;
    }
    value
}

/// Importance samples the azimuth of a non-negative cosine series `ak`. `recip[k]` must hold
/// `1 / k`.
///
/// Returns the series value at the sampled angle, its density and the angle in `[0, 2 pi)`.
#[must_use]
pub fn sample_fourier(ak: &[f64], recip: &[f64], u: f64) -> (f64, f64, f64) {
    let Some(&a0) = ak.first() else {
        return (0.0, 0.0, 0.0);
    };
    if a0 <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    // the series is even, sample [0, pi] and mirror half of the samples
    let (flip, u) = if u < 0.5 {
        (false, 1.0 - 2.0 * u)
    } else {
        (true, 2.0 * (u - 0.5))
    };

    let (mut a, mut b) = (0.0, consts::PI);
    let mut phi = 0.5 * consts::PI;
    let mut f;
    loop {
        let cos_phi = phi.cos();
        let sin_phi = (1.0 - cos_phi.sq()).max(0.0).sqrt();
        let (mut cos_phi_prev, mut cos_phi_cur) = (cos_phi, 1.0);
        let (mut sin_phi_prev, mut sin_phi_cur) = (-sin_phi, 0.0);

        let mut big_f = a0 * phi;
        f = a0;
        for (k, &a_k) in ak.iter().enumerate().skip(1) {
            #[allow(clippy::suboptimal_flops)]
            let sin_phi_next = 2.0 * cos_phi * sin_phi_cur - sin_phi_prev;
            #[allow(clippy::suboptimal_flops)]
            let cos_phi_next = 2.0 * cos_phi * cos_phi_cur - cos_phi_prev;
            sin_phi_prev = sin_phi_cur;
            sin_phi_cur = sin_phi_next;
            cos_phi_prev = cos_phi_cur;
            cos_phi_cur = cos_phi_next;
            big_f += a_k * recip[k] * sin_phi_next;
            f += a_k * cos_phi_next;
        }
        big_f -= u * a0 * consts::PI;

        if big_f > 0.0 {
            b = phi;
        } else {
            a = phi;
        }
        if big_f.abs() < 1e-6 || b - a < 1e-6 {
            break;
        }
        phi -= big_f / f;
        if !(phi > a && phi < b) {
            phi = 0.5 * (a + b);
        }
    }
    if flip {
        phi = 2.0 * consts::PI - phi;
    }
    (f, 0.5 * consts::FRAC_1_PI * f / a0, phi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_eq_approx_abs;

    const NODES: [f64; 5] = [-1.0, -0.4, 0.0, 0.3, 1.0];

    fn eval(nodes: &[f64], values: &[f64], x: f64) -> f64 {
        let spline = catmull_rom_weights(nodes, x).unwrap();
        spline.nonzero().map(|(i, w)| values[i] * w).sum()
    }

    #[test]
    fn weights_partition_unity() {
        let mut rd = fastrand::Rng::with_seed(51);
        for _ in 0..1000 {
            let x = rd.f64() * 2.0 - 1.0;
            let spline = catmull_rom_weights(&NODES, x).unwrap();
            assert_eq_approx_abs!(spline.weights.iter().sum::<f64>(), 1.0, 1e-12);
        }
        assert!(catmull_rom_weights(&NODES, 1.01).is_none());
        assert!(catmull_rom_weights(&NODES, -1.01).is_none());
        assert!(catmull_rom_weights(&NODES, f64::NAN).is_none());
    }

    #[test]
    fn spline_interpolates_nodes_and_lines() {
        let values: Vec<f64> = NODES.iter().map(|x| 3.0 * x - 1.0).collect();
        for (x, v) in NODES.iter().zip(&values) {
            assert_eq_approx_abs!(eval(&NODES, &values, *x), *v, 1e-12);
        }
        let mut rd = fastrand::Rng::with_seed(52);
        for _ in 0..100 {
            let x = rd.f64() * 2.0 - 1.0;
            assert_eq_approx_abs!(eval(&NODES, &values, x), 3.0 * x - 1.0, 1e-12);
        }
    }

    #[test]
    fn integrate_lines() {
        let ones = [1.0; 5];
        let (cdf, total) = integrate_catmull_rom(&NODES, &ones);
        assert_eq_approx_abs!(total, 2.0, 1e-12);
        assert_eq!(cdf.len(), NODES.len());
        assert_eq_approx_abs!(cdf[2], 1.0, 1e-12);

        let values: Vec<f64> = NODES.iter().map(|x| x + 1.0).collect();
        let (_, total) = integrate_catmull_rom(&NODES, &values);
        assert_eq_approx_abs!(total, 2.0, 1e-12);
    }

    #[test]
    fn sample_constant_spline_is_uniform() {
        let rows = [0.0, 1.0];
        let values = [2.0; 10];
        let (cdf0, _) = integrate_catmull_rom(&NODES, &values[..5]);
        let cdf: Vec<f64> = cdf0.iter().chain(&cdf0).copied().collect();
        for u in [0.1, 0.25, 0.5, 0.9] {
            let (x, f, pdf) = sample_catmull_rom_2d(&rows, &NODES, &values, &cdf, 0.5, u).unwrap();
            assert_eq_approx_abs!(x, -1.0 + 2.0 * u, 1e-5);
            assert_eq_approx_abs!(f, 2.0, 1e-9);
            assert_eq_approx_abs!(pdf, 0.5, 1e-9);
        }
        assert!(sample_catmull_rom_2d(&rows, &NODES, &values, &cdf, 1.5, 0.5).is_none());
    }

    #[test]
    fn sample_linear_spline() {
        // density proportional to x + 1 on [-1, 1], the inverse cdf is 2 sqrt(u) - 1
        let rows = [0.0, 1.0];
        let row: Vec<f64> = NODES.iter().map(|x| x + 1.0).collect();
        let values: Vec<f64> = row.iter().chain(&row).copied().collect();
        let (cdf0, _) = integrate_catmull_rom(&NODES, &row);
        let cdf: Vec<f64> = cdf0.iter().chain(&cdf0).copied().collect();
        for u in [0.05, 0.3, 0.6, 0.95] {
            let (x, _, pdf) = sample_catmull_rom_2d(&rows, &NODES, &values, &cdf, 0.0, u).unwrap();
            assert_eq_approx_abs!(x, 2.0 * u.sqrt() - 1.0, 1e-5);
            assert_eq_approx_abs!(pdf, (x + 1.0) / 2.0, 1e-5);
        }
    }

    #[test]
    fn fourier_series() {
        assert_eq_approx_abs!(fourier(&[1.0, 0.5], 0.5), 1.25, 1e-12);
        // cos(2 phi) = 2 cos^2 - 1
        assert_eq_approx_abs!(fourier(&[0.0, 0.0, 1.0], 0.3), 2.0 * 0.09 - 1.0, 1e-12);
        assert_eq_approx_abs!(fourier(&[], 0.3), 0.0, 1e-12);
    }

    #[test]
    fn sample_constant_series() {
        let recip = [0.0, 1.0, 0.5];
        let (y, pdf, phi) = sample_fourier(&[1.0], &recip, 0.25);
        assert_eq_approx_abs!(y, 1.0, 1e-12);
        assert_eq_approx_abs!(pdf, 0.5 * consts::FRAC_1_PI, 1e-12);
        assert_eq_approx_abs!(phi, 0.5 * consts::PI, 1e-5);

        let (_, _, phi) = sample_fourier(&[1.0], &recip, 0.75);
        assert_eq_approx_abs!(phi, 1.5 * consts::PI, 1e-5);
    }

    #[test]
    fn sampled_series_density_matches_value() {
        let ak = [1.0, 0.6, 0.2];
        let recip = [0.0, 1.0, 0.5];
        let mut rd = fastrand::Rng::with_seed(53);
        for _ in 0..1000 {
            let (y, pdf, phi) = sample_fourier(&ak, &recip, rd.f64());
            assert!((0.0..2.0 * consts::PI + 1e-9).contains(&phi));
            assert_eq_approx_abs!(y, fourier(&ak, phi.cos()), 1e-6);
            assert_eq_approx_abs!(pdf, y / (2.0 * consts::PI), 1e-6);
        }
    }
}
