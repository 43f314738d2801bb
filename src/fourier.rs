//! Measured or simulated scattering tabulated as Fourier series over the azimuth difference.
//!
//! For every pair of zenith angle cosines `(mu_i, mu_o)` on a grid the table stores the
//! coefficients of a cosine series in `phi_i - phi_o`. Values between grid nodes are found with
//! Catmull-Rom splines, see [`crate::interpolation`].
use crate::{
    error::{Error, Result},
    interpolation::{self, SplineWeights},
    utils::{self, FloatExt},
    BxDF, BxDFSample, BxDFType, RgbD, TransportMode, Vec2d, Vec3d,
};

/// Coefficients of a tabulated BSDF.
///
/// Pairs are stored row major with the outgoing cosine as the row: pair `o * mu.len() + i`
/// belongs to `(mu[i], mu[o])`. Its `m` coefficients per channel start at `a_offset` and the
/// channels (luminance, red, blue) follow each other.
#[derive(Clone, Debug, PartialEq)]
pub struct FourierTable {
    eta: f64,
    m_max: usize,
    n_channels: usize,
    mu: Vec<f64>,
    m: Vec<usize>,
    a_offset: Vec<usize>,
    a: Vec<f64>,
    a0: Vec<f64>,
    cdf: Vec<f64>,
    recip: Vec<f64>,
}

impl FourierTable {
    /// Validates the table and precomputes the data needed for sampling.
    ///
    /// # Errors
    /// If the grid is not sorted within `[-1, 1]`, the per-pair data does not cover the whole
    /// grid, the channel count is neither 1 nor 3, coefficients point outside of `a` or `eta` is
    /// not positive.
    pub fn new(
        eta: f64,
        mu: Vec<f64>,
        m: Vec<usize>,
        a_offset: Vec<usize>,
        a: Vec<f64>,
        n_channels: usize,
    ) -> Result<Self> {
        if !(eta > 0.0 && eta.is_finite()) {
            return Err(Error::InvalidEta(eta));
        }
        let n_mu = mu.len();
        if n_mu < 2 {
            return Err(Error::GridTooSmall(n_mu));
        }
        for (index, &value) in mu.iter().enumerate() {
            let above_previous = index == 0 || value > mu[index - 1];
            if !above_previous || !(-1.0..=1.0).contains(&value) {
                return Err(Error::UnsortedGrid { index, value });
            }
        }
        let n_pairs = n_mu * n_mu;
        if m.len() != n_pairs {
            return Err(Error::LengthMismatch {
                name: "m",
                expected: n_pairs,
                actual: m.len(),
            });
        }
        if a_offset.len() != n_pairs {
            return Err(Error::LengthMismatch {
                name: "a_offset",
                expected: n_pairs,
                actual: a_offset.len(),
            });
        }
        if n_channels != 1 && n_channels != 3 {
            return Err(Error::UnsupportedChannels(n_channels));
        }
        for (pair, (&offset, &order)) in a_offset.iter().zip(&m).enumerate() {
            let end = order
                .checked_mul(n_channels)
                .and_then(|len| offset.checked_add(len))
                .unwrap_or(usize::MAX);
            if end > a.len() {
                return Err(Error::OffsetOutOfRange {
                    pair,
                    end,
                    len: a.len(),
                });
            }
        }

        let m_max = m.iter().copied().max().unwrap_or(0);
        let a0: Vec<f64> = a_offset
            .iter()
            .zip(&m)
            .map(|(&offset, &order)| if order > 0 { a[offset] } else { 0.0 })
            .collect();
        let mut cdf = Vec::with_capacity(n_pairs);
        for row in a0.chunks(n_mu) {
            let (row_cdf, _) = interpolation::integrate_catmull_rom(&mu, row);
            cdf.extend(row_cdf);
        }
        let recip = (0..m_max)
            .map(|i| if i == 0 { 0.0 } else { (i as f64).recip() })
            .collect();

        Ok(Self {
            eta,
            m_max,
            n_channels,
            mu,
            m,
            a_offset,
            a,
            a0,
            cdf,
            recip,
        })
    }

    /// relative index of refraction of the interface the table describes
    #[must_use]
    pub const fn eta(&self) -> f64 {
        self.eta
    }

    #[must_use]
    pub const fn n_channels(&self) -> usize {
        self.n_channels
    }

    #[must_use]
    pub const fn m_max(&self) -> usize {
        self.m_max
    }

    fn weights(&self, cos_theta: f64) -> Option<SplineWeights> {
        interpolation::catmull_rom_weights(&self.mu, cos_theta)
    }

    /// Blends the coefficient rows around `(mu_i, mu_o)`. Returns the coefficients of the first
    /// `channels` channels, each `m_max` long, and the largest order that contributed.
    fn coefficients(
        &self,
        weights_i: &SplineWeights,
        weights_o: &SplineWeights,
        channels: usize,
    ) -> (Vec<f64>, usize) {
        let n_mu = self.mu.len();
        let mut ak = vec![0.0; self.m_max * channels];
        let mut m_max = 0;
        for (o, weight_o) in weights_o.nonzero() {
            for (i, weight_i) in weights_i.nonzero() {
                let weight = weight_i * weight_o;
                let pair = o * n_mu + i;
                let order = self.m[pair];
                let offset = self.a_offset[pair];
                m_max = m_max.max(order);
                for c in 0..channels {
                    for k in 0..order {
                        ak[c * self.m_max + k] += weight * self.a[offset + c * order + k];
                    }
                }
            }
        }
        (ak, m_max)
    }

    /// `1 / |mu_i|`, with the `eta^2` scaling of radiance transport across the interface
    fn scale(&self, mu_i: f64, mu_o: f64, mode: TransportMode) -> f64 {
        let mut scale = if mu_i == 0.0 { 0.0 } else { mu_i.abs().recip() };
        if mode == TransportMode::Radiance && mu_i * mu_o > 0.0 {
            let eta = if mu_i > 0.0 { self.eta.recip() } else { self.eta };
            scale *= eta.sq();
        }
        scale
    }

    /// Turns the blended series into a color at `cos_phi`. `y` is the luminance, already
    /// evaluated.
    fn color(&self, ak: &[f64], m: usize, y: f64, cos_phi: f64, scale: f64) -> RgbD {
        if self.n_channels == 1 {
            return RgbD::splat(y * scale);
        }
        let r = interpolation::fourier(&ak[self.m_max..self.m_max + m], cos_phi);
        let b = interpolation::fourier(&ak[2 * self.m_max..2 * self.m_max + m], cos_phi);
        #[allow(clippy::suboptimal_flops)]
        let g = 1.39829 * y - 0.100_913 * b - 0.297_375 * r;
        (RgbD::new(r, g, b) * scale).max(RgbD::ZERO)
    }
}

/// Lobe backed by a [`FourierTable`]. Covers reflection and transmission at once.
#[derive(Clone, Copy, Debug)]
pub struct FourierBSDF<'a> {
    pub table: &'a FourierTable,
    pub mode: TransportMode,
}

impl<'a> FourierBSDF<'a> {
    #[must_use]
    pub const fn new(table: &'a FourierTable, mode: TransportMode) -> Self {
        Self { table, mode }
    }
}

impl BxDF for FourierBSDF<'_> {
    fn bxdf_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::TRANSMISSION | BxDFType::GLOSSY
    }

    fn f(&self, omega_o: Vec3d, omega_i: Vec3d) -> RgbD {
        let mu_i = utils::cos_theta(-omega_i);
        let mu_o = utils::cos_theta(omega_o);
        let cos_phi = utils::cos_d_phi(-omega_i, omega_o);

        let table = self.table;
        let (Some(weights_i), Some(weights_o)) = (table.weights(mu_i), table.weights(mu_o)) else {
            return RgbD::ZERO;
        };
        let (ak, m) = table.coefficients(&weights_i, &weights_o, table.n_channels);
        let y = interpolation::fourier(&ak[..m], cos_phi).max(0.0);
        let scale = table.scale(mu_i, mu_o, self.mode);
        table.color(&ak, m, y, cos_phi, scale)
    }

    fn sample_f(&self, omega_o: Vec3d, u: Vec2d) -> BxDFSample {
        let table = self.table;
        let mu_o = utils::cos_theta(omega_o);
        let Some((mu_i, _, pdf_mu)) = interpolation::sample_catmull_rom_2d(
            &table.mu, &table.mu, &table.a0, &table.cdf, mu_o, u.y,
        ) else {
            return BxDFSample::none();
        };

        let (Some(weights_i), Some(weights_o)) = (table.weights(mu_i), table.weights(mu_o)) else {
            return BxDFSample::none();
        };
        let (ak, m) = table.coefficients(&weights_i, &weights_o, table.n_channels);

        let (y, pdf_phi, phi) = interpolation::sample_fourier(&ak[..m], &table.recip, u.x);
        let pdf = (pdf_phi * pdf_mu).max(0.0);
        if pdf == 0.0 {
            return BxDFSample::none();
        }

        let sin2_theta_i = (1.0 - mu_i.sq()).max(0.0);
        let mut norm = (sin2_theta_i / utils::sin2_theta(omega_o)).sqrt();
        if norm.is_infinite() {
            norm = 0.0;
        }
        let (sin_phi, cos_phi) = phi.sin_cos();
        #[allow(clippy::suboptimal_flops)]
        let raw = -Vec3d::new(
            norm * (cos_phi * omega_o.x - sin_phi * omega_o.y),
            norm * (sin_phi * omega_o.x + cos_phi * omega_o.y),
            mu_i,
        );
        // rounding compounds over bounces and can leave the direction several times too long
        let length = raw.length();
        if (length - 1.0).abs() > 0.1 {
            log::warn!("renormalizing sampled direction of length {length} (omega_o: {omega_o})");
        }
        let Some(omega_i) = raw.try_normalize() else {
            return BxDFSample::none();
        };

        let scale = table.scale(mu_i, mu_o, self.mode);
        BxDFSample {
            f: table.color(&ak, m, y, cos_phi, scale),
            omega_i,
            pdf,
            sampled_type: self.bxdf_type(),
        }
    }

    fn pdf(&self, omega_o: Vec3d, omega_i: Vec3d) -> f64 {
        let mu_i = utils::cos_theta(-omega_i);
        let mu_o = utils::cos_theta(omega_o);
        let cos_phi = utils::cos_d_phi(-omega_i, omega_o);

        let table = self.table;
        let (Some(weights_i), Some(weights_o)) = (table.weights(mu_i), table.weights(mu_o)) else {
            return 0.0;
        };
        let (ak, m) = table.coefficients(&weights_i, &weights_o, 1);

        let n_mu = table.mu.len();
        let rho: f64 = weights_o
            .nonzero()
            .map(|(o, weight)| weight * table.cdf[o * n_mu + n_mu - 1] * 2.0 * std::f64::consts::PI)
            .sum();
        let y = interpolation::fourier(&ak[..m], cos_phi);
        if rho > 0.0 && y > 0.0 {
            y / rho
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FourierBSDF, FourierTable};
    use crate::{
        error::Error,
        test_utils::{self, assert_eq_approx, assert_eq_approx_abs, SamplerExt},
        BxDF, RgbD, TransportMode, Vec3d,
    };

    const C: f64 = 0.1;

    fn grid() -> Vec<f64> {
        (0..=20).map(|i| -1.0 + 0.1 * i as f64).collect()
    }

    /// An isotropic table that is constant `C` in both hemispheres. Each channel holds the
    /// same single coefficient.
    fn constant_table(eta: f64, n_channels: usize) -> FourierTable {
        let mu = grid();
        let n = mu.len();
        let mut m = Vec::new();
        let mut a_offset = Vec::new();
        let mut a = Vec::new();
        for _o in 0..n {
            for mu_i in &mu {
                m.push(1);
                a_offset.push(a.len());
                for _ in 0..n_channels {
                    a.push(C * mu_i.abs());
                }
            }
        }
        FourierTable::new(eta, mu, m, a_offset, a, n_channels).unwrap()
    }

    /// directions whose zenith cosine stays away from the kink of `|mu|` at the horizon
    fn away_from_horizon(rd: &mut fastrand::Rng) -> Vec3d {
        loop {
            let omega = test_utils::spherical_sample(rd);
            if omega.z.abs() > 0.15 && omega.z.abs() < 0.99 {
                return omega;
            }
        }
    }

    #[test]
    fn constant_table_evaluates_to_constant() {
        let table = constant_table(1.0, 1);
        let lobe = FourierBSDF::new(&table, TransportMode::Radiance);
        let mut rd = fastrand::Rng::with_seed(61);
        for _ in 0..1000 {
            let omega_o = test_utils::spherical_sample(&mut rd);
            let omega_i = away_from_horizon(&mut rd);
            assert_eq_approx_abs!(lobe.f(omega_o, omega_i), RgbD::splat(C), RgbD::splat(1e-9));
        }
    }

    #[test]
    fn sampling_matches_evaluation() {
        let table = constant_table(1.0, 1);
        let lobe = FourierBSDF::new(&table, TransportMode::Radiance);
        let mut rd = fastrand::Rng::with_seed(62);
        for _ in 0..2000 {
            let omega_o = test_utils::non_grazing_sample(&mut rd);
            let s = lobe.sample_f(omega_o, rd.vec2d());
            if s.pdf == 0.0 {
                continue;
            }
            assert_eq_approx_abs!(s.omega_i.length(), 1.0, 1e-9);
            assert_eq_approx!(s.pdf, lobe.pdf(omega_o, s.omega_i), 1e-6, 1e-4);
            if s.omega_i.z.abs() > 0.01 {
                assert_eq_approx!(s.f, lobe.f(omega_o, s.omega_i), RgbD::splat(1e-6), RgbD::splat(1e-4));
            }
        }
    }

    #[test]
    fn pdf_integrates_to_one() {
        let table = constant_table(1.0, 1);
        let lobe = FourierBSDF::new(&table, TransportMode::Radiance);
        test_utils::test_integrate_inverse_pdf(&lobe);
    }

    #[test]
    fn three_channels() {
        let table = constant_table(1.0, 3);
        let lobe = FourierBSDF::new(&table, TransportMode::Importance);
        let omega_o = Vec3d::new(0.0, 0.6, 0.8);
        let omega_i = Vec3d::new(0.6, 0.0, -0.8);
        let g = (1.39829 - 0.100_913 - 0.297_375) * C;
        assert_eq_approx_abs!(lobe.f(omega_o, omega_i), RgbD::new(C, g, C), RgbD::splat(1e-9));
    }

    #[test]
    fn radiance_is_scaled_across_the_interface() {
        let table = constant_table(1.5, 1);
        let radiance = FourierBSDF::new(&table, TransportMode::Radiance);
        let importance = FourierBSDF::new(&table, TransportMode::Importance);
        let omega_o = Vec3d::new(0.0, 0.6, 0.8);
        let transmitted = Vec3d::new(0.6, 0.0, -0.8);
        let reflected = Vec3d::new(0.6, 0.0, 0.8);
        assert_eq_approx_abs!(
            radiance.f(omega_o, transmitted),
            importance.f(omega_o, transmitted) / 2.25,
            RgbD::splat(1e-9)
        );
        assert_eq_approx_abs!(
            radiance.f(omega_o, reflected),
            importance.f(omega_o, reflected),
            RgbD::splat(1e-12)
        );
    }

    #[test]
    fn rejects_malformed_tables() {
        let mu = grid();
        let n = mu.len() * mu.len();
        assert_eq!(
            FourierTable::new(1.0, vec![0.0], vec![0], vec![0], vec![], 1),
            Err(Error::GridTooSmall(1))
        );
        assert_eq!(
            FourierTable::new(1.0, vec![0.5, 0.2], vec![0; 4], vec![0; 4], vec![], 1),
            Err(Error::UnsortedGrid {
                index: 1,
                value: 0.2
            })
        );
        assert_eq!(
            FourierTable::new(1.0, mu.clone(), vec![1; n - 1], vec![0; n], vec![1.0], 1),
            Err(Error::LengthMismatch {
                name: "m",
                expected: n,
                actual: n - 1
            })
        );
        assert_eq!(
            FourierTable::new(1.0, mu.clone(), vec![1; n], vec![0; n], vec![1.0; 3], 2),
            Err(Error::UnsupportedChannels(2))
        );
        assert_eq!(
            FourierTable::new(1.0, mu.clone(), vec![1; n], vec![0; n], vec![1.0], 3),
            Err(Error::OffsetOutOfRange {
                pair: 0,
                end: 3,
                len: 1
            })
        );
        assert_eq!(
            FourierTable::new(-1.0, mu, vec![1; n], vec![0; n], vec![1.0], 1),
            Err(Error::InvalidEta(-1.0))
        );
    }

    #[test]
    fn rejects_overflowing_offsets() {
        let mu = grid();
        let n = mu.len() * mu.len();
        let mut a_offset = vec![0; n];
        a_offset[1] = usize::MAX;
        assert_eq!(
            FourierTable::new(1.0, mu.clone(), vec![1; n], a_offset, vec![1.0], 1),
            Err(Error::OffsetOutOfRange {
                pair: 1,
                end: usize::MAX,
                len: 1
            })
        );
        let mut m = vec![0; n];
        m[0] = usize::MAX / 2;
        assert_eq!(
            FourierTable::new(1.0, mu, m, vec![0; n], vec![1.0], 3),
            Err(Error::OffsetOutOfRange {
                pair: 0,
                end: usize::MAX,
                len: 1
            })
        );
    }

    #[test]
    fn table_reports_its_shape() {
        let table = constant_table(1.5, 3);
        assert_eq!(table.eta(), 1.5);
        assert_eq!(table.n_channels(), 3);
        assert_eq!(table.m_max(), 1);
    }

    #[test]
    fn empty_table_scatters_nothing() {
        let mu = grid();
        let n = mu.len() * mu.len();
        let table = FourierTable::new(1.0, mu, vec![0; n], vec![0; n], vec![], 1).unwrap();
        let lobe = FourierBSDF::new(&table, TransportMode::Radiance);
        let omega_o = Vec3d::new(0.0, 0.6, 0.8);
        assert_eq!(lobe.f(omega_o, Vec3d::Z), RgbD::ZERO);
        assert_eq!(lobe.pdf(omega_o, Vec3d::Z), 0.0);
        assert_eq!(lobe.sample_f(omega_o, crate::Vec2d::new(0.3, 0.3)).pdf, 0.0);
    }
}
