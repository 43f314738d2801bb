//! Shaders for a host renderer built on top of the lobes of this crate.
//!
//! The host supplies everything that is not scattering: tracing secondary rays, light samples,
//! a global illumination estimate and the stream of 2D samples. It does so through
//! [`ShadingHost`]. One host value describes one shading point, just like the state a renderer
//! hands to its material shaders.
//!
//! Every estimator returns the mean over the samples the host actually delivered. A host that
//! ends the sample stream early still gets an unbiased (if noisier) result.
use crate::{
    frame::ShadingFrame,
    fresnel::{FresnelConductor, FresnelDielectric},
    ggx::GGX,
    lambert::LambertianReflection,
    microfacet::{MicrofacetReflection, MicrofacetTransmission},
    oren_nayar::OrenNayar,
    specular::{SpecularReflection, SpecularTransmission},
    utils::{self, SafeCast},
    BxDF, BxDFSample, RgbD, RgbF, RgbaD, TransportMode, Vec2d, Vec3d,
};

/// One sample of a light source as seen from the shading point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSample {
    /// radiance arriving from the light, shadowing included
    pub color: RgbD,
    /// world space direction towards the light
    pub direction: Vec3d,
    /// `cos` of the angle between `direction` and the shading normal
    pub cos_theta: f64,
}

/// Services a renderer provides to the shaders for one shading point
pub trait ShadingHost {
    /// Traces a reflected ray. `None` if nothing was hit.
    fn trace_reflection(&mut self, direction: Vec3d) -> Option<RgbD>;

    /// Looks up the environment in `direction`
    fn trace_environment(&mut self, direction: Vec3d) -> RgbD;

    /// Traces a refracted ray. Misses are resolved by the host.
    fn trace_refraction(&mut self, direction: Vec3d) -> RgbD;

    /// The sample `index` of a stream of `count` low discrepancy samples in `[0,1)^2`.
    /// `None` ends the stream early.
    fn sample_2d(&mut self, index: usize, count: usize) -> Option<Vec2d>;

    /// The sample `index` of the light `light`. `None` once the host is done with this light.
    fn sample_light(&mut self, light: usize, index: usize) -> Option<LightSample>;

    /// Estimate of the irradiance from indirect illumination
    fn average_radiance(&mut self) -> RgbD;
}

/// Maximum recursion depths. A shader stops tracing once a counter exceeds its limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceLimits {
    pub reflection_depth: u32,
    pub refraction_depth: u32,
    /// limit for the sum of both counters
    pub trace_depth: u32,
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            reflection_depth: 2,
            refraction_depth: 2,
            trace_depth: 4,
        }
    }
}

/// Geometry and recursion state of a shading point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadingState {
    /// shading normal
    pub normal: Vec3d,
    /// direction of the ray that hit the surface, pointing towards the surface
    pub direction: Vec3d,
    /// surface tangent, e.g. `dP/du`
    pub tangent: Option<Vec3d>,
    /// the ray hit the back side of the surface
    pub inv_normal: bool,
    pub reflection_level: u32,
    pub refraction_level: u32,
    pub limits: TraceLimits,
}

impl ShadingState {
    /// A primary hit without tangent information
    #[must_use]
    pub fn new(normal: Vec3d, direction: Vec3d) -> Self {
        Self {
            normal,
            direction,
            tangent: None,
            inv_normal: false,
            reflection_level: 0,
            refraction_level: 0,
            limits: TraceLimits::default(),
        }
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.reflection_level + self.refraction_level
    }

    #[must_use]
    pub const fn past_reflection_depth(&self) -> bool {
        self.reflection_level > self.limits.reflection_depth
    }

    #[must_use]
    pub const fn past_refraction_depth(&self) -> bool {
        self.refraction_level > self.limits.refraction_depth
    }

    #[must_use]
    pub const fn past_trace_depth(&self) -> bool {
        self.level() > self.limits.trace_depth
    }

    #[must_use]
    pub fn frame(&self) -> ShadingFrame {
        match self.tangent {
            Some(tangent) => ShadingFrame::from_normal_tangent(self.normal, tangent),
            None => ShadingFrame::from_normal(self.normal),
        }
    }

    /// Replaces the normal with a non zero `bump` normal and turns it towards the viewer
    #[must_use]
    pub fn oriented(mut self, bump: Option<Vec3d>) -> Self {
        if let Some(bump) = bump.filter(|b| *b != Vec3d::ZERO) {
            self.normal = bump.normalize();
        }
        if self.inv_normal {
            self.normal = -self.normal;
        }
        self
    }
}

/// Number of samples to spend at a recursion `level`. Secondary bounces get less.
#[must_use]
pub fn sample_count(samples: usize, level: u32) -> usize {
    match level {
        0 => samples,
        1 => (samples / 2).max(1),
        _ => 1,
    }
}

fn trace_reflected(host: &mut dyn ShadingHost, direction: Vec3d) -> RgbD {
    match host.trace_reflection(direction) {
        Some(color) => color,
        None => host.trace_environment(direction),
    }
}

/// Weight of a sample: `f * |cos theta_i| / pdf`
fn throughput(sample: &BxDFSample) -> RgbD {
    sample.f * utils::abs_cos_theta(sample.omega_i) / sample.pdf
}

fn single_sample(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    bxdf: &dyn BxDF,
    trace: fn(&mut dyn ShadingHost, Vec3d) -> RgbD,
) -> RgbD {
    let frame = state.frame();
    let omega_o = frame.world_to_local(-state.direction);
    let sample = bxdf.sample_f(omega_o, Vec2d::ZERO);
    if sample.pdf == 0.0 {
        return RgbD::ZERO;
    }
    trace(host, frame.local_to_world(sample.omega_i)) * throughput(&sample)
}

#[allow(clippy::cast_precision_loss)]
fn sampled_mean(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    bxdf: &dyn BxDF,
    samples: usize,
    trace: fn(&mut dyn ShadingHost, Vec3d) -> RgbD,
) -> RgbD {
    let frame = state.frame();
    let omega_o = frame.world_to_local(-state.direction);
    let count = sample_count(samples, state.level());

    let mut sum = RgbD::ZERO;
    let mut completed = 0usize;
    for index in 0..count {
        let Some(u) = host.sample_2d(index, count) else {
            break;
        };
        completed += 1;
        let sample = bxdf.sample_f(omega_o, u);
        if sample.pdf > 0.0 {
            sum += trace(host, frame.local_to_world(sample.omega_i)) * throughput(&sample);
        }
    }
    if completed == 0 {
        return RgbD::ZERO;
    }
    sum / completed as f64
}

fn reflection_blocked(state: &ShadingState) -> bool {
    let blocked = state.past_reflection_depth() || state.past_trace_depth();
    if blocked {
        log::debug!(
            "reflection depth exhausted at level {}/{}",
            state.reflection_level,
            state.level()
        );
    }
    blocked
}

fn refraction_blocked(state: &ShadingState) -> bool {
    let blocked = state.past_refraction_depth() || state.past_trace_depth();
    if blocked {
        log::debug!(
            "refraction depth exhausted at level {}/{}",
            state.refraction_level,
            state.level()
        );
    }
    blocked
}

/// Mirror reflection off a dielectric with index of refraction `eta`
pub fn spec_dielectric_reflection(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    reflect_k: RgbF,
    eta: f64,
) -> RgbD {
    if reflection_blocked(state) {
        return RgbD::ZERO;
    }
    let fresnel = FresnelDielectric::new(1.0, eta);
    let bxdf = SpecularReflection::new(reflect_k, &fresnel);
    single_sample(host, state, &bxdf, trace_reflected)
}

/// Rough reflection off a dielectric. `roughness` is the GGX `alpha`.
pub fn glossy_dielectric_reflection(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    reflect_k: RgbF,
    eta: f64,
    roughness: f64,
    samples: usize,
) -> RgbD {
    if reflection_blocked(state) {
        return RgbD::ZERO;
    }
    let fresnel = FresnelDielectric::new(1.0, eta);
    let distribution = GGX::isotropic(roughness);
    let bxdf = MicrofacetReflection::new(reflect_k, &distribution, &fresnel);
    sampled_mean(host, state, &bxdf, samples, trace_reflected)
}

/// Perfect refraction into a dielectric with index of refraction `eta`
pub fn spec_dielectric_transmission(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    refract_k: RgbF,
    eta: f64,
) -> RgbD {
    if refraction_blocked(state) {
        return RgbD::ZERO;
    }
    let bxdf = SpecularTransmission::new(refract_k, 1.0, eta, TransportMode::Radiance);
    single_sample(host, state, &bxdf, |host, dir| host.trace_refraction(dir))
}

/// Rough refraction into a dielectric. `roughness` is the GGX `alpha`.
pub fn glossy_dielectric_transmission(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    refract_k: RgbF,
    eta: f64,
    roughness: f64,
    samples: usize,
) -> RgbD {
    if refraction_blocked(state) {
        return RgbD::ZERO;
    }
    let distribution = GGX::isotropic(roughness);
    let bxdf =
        MicrofacetTransmission::new(refract_k, &distribution, 1.0, eta, TransportMode::Radiance);
    sampled_mean(host, state, &bxdf, samples, |host, dir| {
        host.trace_refraction(dir)
    })
}

/// Mirror reflection off a metal with complex index of refraction `eta + i k`
pub fn spec_metal_reflection(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    eta: RgbD,
    k: RgbD,
) -> RgbD {
    if reflection_blocked(state) {
        return RgbD::ZERO;
    }
    let fresnel = FresnelConductor::new(RgbD::ONE, eta, k);
    let bxdf = SpecularReflection::new(RgbF::ONE, &fresnel);
    single_sample(host, state, &bxdf, trace_reflected)
}

/// Rough reflection off a metal. `roughness` is the GGX `alpha`.
pub fn glossy_metal_reflection(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    eta: RgbD,
    k: RgbD,
    roughness: f64,
    samples: usize,
) -> RgbD {
    if reflection_blocked(state) {
        return RgbD::ZERO;
    }
    let fresnel = FresnelConductor::new(RgbD::ONE, eta, k);
    let distribution = GGX::isotropic(roughness);
    let bxdf = MicrofacetReflection::new(RgbF::ONE, &distribution, &fresnel);
    sampled_mean(host, state, &bxdf, samples, trace_reflected)
}

/// Indirect light scaled by `diffuse_k` plus the mean of every light's samples
#[allow(clippy::cast_precision_loss)]
fn direct_diffuse(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    bxdf: &dyn BxDF,
    diffuse_k: RgbF,
    lights: &[usize],
) -> RgbD {
    let frame = state.frame();
    let omega_o = frame.world_to_local(-state.direction);
    let mut result = host.average_radiance() * diffuse_k.safe_cast();

    for &light in lights {
        let mut sum = RgbD::ZERO;
        let mut count = 0usize;
        while let Some(sample) = host.sample_light(light, count) {
            let omega_i = frame.world_to_local(sample.direction);
            sum += sample.color * bxdf.f(omega_o, omega_i) * sample.cos_theta;
            count += 1;
        }
        if count > 0 {
            result += sum / count as f64;
        }
    }
    result
}

pub fn lambertian_diffuse(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    diffuse_k: RgbF,
    lights: &[usize],
) -> RgbD {
    let bxdf = LambertianReflection::new(diffuse_k);
    direct_diffuse(host, state, &bxdf, diffuse_k, lights)
}

/// `sigma` is the groove slope deviation in degrees, see [`OrenNayar::new`]
pub fn oren_nayar_diffuse(
    host: &mut dyn ShadingHost,
    state: &ShadingState,
    diffuse_k: RgbF,
    sigma: f64,
    lights: &[usize],
) -> RgbD {
    let bxdf = OrenNayar::new(diffuse_k, sigma);
    direct_diffuse(host, state, &bxdf, diffuse_k, lights)
}

fn is_black(color: RgbF) -> bool {
    color == RgbF::ZERO
}

fn opaque(color: RgbD) -> RgbaD {
    color.extend(1.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlassParams {
    pub eta: f64,
    pub reflect_k: RgbF,
    /// `0` for a perfect mirror
    pub reflection_roughness: f64,
    pub reflection_samples: usize,
    pub refract_k: RgbF,
    /// `0` for perfect refraction
    pub transmission_roughness: f64,
    pub transmission_samples: usize,
    pub bump: Option<Vec3d>,
}

impl Default for GlassParams {
    fn default() -> Self {
        Self {
            eta: 1.5,
            reflect_k: RgbF::ONE,
            reflection_roughness: 0.0,
            reflection_samples: 8,
            refract_k: RgbF::ONE,
            transmission_roughness: 0.0,
            transmission_samples: 8,
            bump: None,
        }
    }
}

/// A dielectric interface: reflection plus transmission
///
/// Hits from the back side see the relative index of refraction `1 / eta`.
pub fn glass(host: &mut dyn ShadingHost, state: &ShadingState, params: &GlassParams) -> RgbaD {
    let oriented = state.oriented(params.bump);
    let eta = if state.inv_normal {
        params.eta.recip()
    } else {
        params.eta
    };

    let mut result = RgbD::ZERO;
    if !is_black(params.reflect_k) {
        result += if params.reflection_roughness > 0.0 {
            glossy_dielectric_reflection(
                host,
                &oriented,
                params.reflect_k,
                eta,
                params.reflection_roughness,
                params.reflection_samples,
            )
        } else {
            spec_dielectric_reflection(host, &oriented, params.reflect_k, eta)
        };
    }
    if !is_black(params.refract_k) {
        result += if params.transmission_roughness > 0.0 {
            glossy_dielectric_transmission(
                host,
                &oriented,
                params.refract_k,
                eta,
                params.transmission_roughness,
                params.transmission_samples,
            )
        } else {
            spec_dielectric_transmission(host, &oriented, params.refract_k, eta)
        };
    }
    opaque(result)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetalParams {
    pub eta: RgbD,
    pub k: RgbD,
    /// `0` for a perfect mirror
    pub roughness: f64,
    pub samples: usize,
    pub bump: Option<Vec3d>,
}

impl Default for MetalParams {
    /// gold
    fn default() -> Self {
        Self {
            eta: RgbD::new(0.143, 0.374, 1.442),
            k: RgbD::new(3.983, 2.385, 1.603),
            roughness: 0.0,
            samples: 8,
            bump: None,
        }
    }
}

pub fn metal(host: &mut dyn ShadingHost, state: &ShadingState, params: &MetalParams) -> RgbaD {
    let oriented = state.oriented(params.bump);
    let result = if params.roughness == 0.0 {
        spec_metal_reflection(host, &oriented, params.eta, params.k)
    } else {
        glossy_metal_reflection(
            host,
            &oriented,
            params.eta,
            params.k,
            params.roughness,
            params.samples,
        )
    };
    opaque(result)
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlasticParams {
    pub eta: f64,
    pub reflect_k: RgbF,
    /// `0` for a perfect mirror
    pub roughness: f64,
    pub diffuse_k: RgbF,
    /// Oren-Nayar groove deviation in degrees
    pub sigma: f64,
    pub samples: usize,
    pub bump: Option<Vec3d>,
    /// identifiers of the lights handed to [`ShadingHost::sample_light`]
    pub lights: Vec<usize>,
}

impl Default for PlasticParams {
    fn default() -> Self {
        Self {
            eta: 1.5,
            reflect_k: RgbF::ONE,
            roughness: 0.1,
            diffuse_k: RgbF::splat(0.5),
            sigma: 0.0,
            samples: 8,
            bump: None,
            lights: Vec::new(),
        }
    }
}

/// A glossy dielectric coating over a rough diffuse base
pub fn plastic(host: &mut dyn ShadingHost, state: &ShadingState, params: &PlasticParams) -> RgbaD {
    let oriented = state.oriented(params.bump);

    let mut result = RgbD::ZERO;
    if !is_black(params.reflect_k) {
        result += if params.roughness == 0.0 {
            spec_dielectric_reflection(host, &oriented, params.reflect_k, params.eta)
        } else {
            glossy_dielectric_reflection(
                host,
                &oriented,
                params.reflect_k,
                params.eta,
                params.roughness,
                params.samples,
            )
        };
    }
    if !is_black(params.diffuse_k) {
        result += oren_nayar_diffuse(
            host,
            &oriented,
            params.diffuse_k,
            params.sigma,
            &params.lights,
        );
    }
    opaque(result)
}
