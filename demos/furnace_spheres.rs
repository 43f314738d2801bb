// A small recursive ray tracer that shades a few spheres with the `materials` shaders.
// The scene itself plays the host renderer: it traces the secondary rays, samples the single
// point light and hands out random samples.
//
// Run with `RUST_LOG=debug` to see the shaders give up on the recursion limits.
use bxdf::{
    materials::{
        self, GlassParams, LightSample, MetalParams, PlasticParams, ShadingHost, ShadingState,
    },
    RgbD, RgbF, Vec2d, Vec3d,
};
use rayon::prelude::*;

#[derive(Copy, Clone)]
struct Sphere {
    center: Vec3d,
    radius: f64,
}

#[derive(Copy, Clone)]
struct Ray {
    origin: Vec3d,
    direction: Vec3d,
}

#[derive(Copy, Clone)]
struct HitRecord {
    t: f64, // hit distance
    pos: Vec3d,
    normal: Vec3d,
}

impl Sphere {
    fn hit(&self, ray: Ray, ray_tmin: f64, ray_tmax: f64) -> Option<HitRecord> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let half_b = Vec3d::dot(oc, ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = f64::sqrt(discriminant);

        // Find the nearest root that lies in the acceptable range.
        let mut root = (-half_b - sqrtd) / a;
        if root <= ray_tmin || ray_tmax <= root {
            root = (-half_b + sqrtd) / a;
            if root <= ray_tmin || ray_tmax <= root {
                return None;
            }
        }

        let pos = ray.origin + ray.direction * root;
        Some(HitRecord {
            t: root,
            pos,
            normal: (pos - self.center) / self.radius,
        })
    }
}

enum Material {
    Glass(GlassParams),
    Metal(MetalParams),
    Plastic(PlasticParams),
}

struct World {
    spheres: Vec<(Sphere, Material)>,
    light_position: Vec3d,
    light_color: RgbD,
}

const RAY_EPSILON: f64 = 1e-5;

fn sky(direction: Vec3d) -> RgbD {
    let a = 0.5 * (direction.normalize().z + 1.0);
    (1.0 - a) * RgbD::ONE + a * RgbD::new(0.5, 0.7, 1.0)
}

impl World {
    fn find_hit(&self, ray: Ray, ray_tmax: f64) -> Option<(HitRecord, &Material)> {
        let mut closest: Option<(HitRecord, &Material)> = None;
        let mut closest_so_far = ray_tmax;
        for (sphere, material) in &self.spheres {
            if let Some(hit) = sphere.hit(ray, RAY_EPSILON, closest_so_far) {
                closest_so_far = hit.t;
                closest = Some((hit, material));
            }
        }
        closest
    }

    /// Radiance arriving at `ray.origin` from `ray.direction`. `None` if the ray escapes.
    fn shade(
        &self,
        ray: Ray,
        reflection_level: u32,
        refraction_level: u32,
        rd: &mut fastrand::Rng,
    ) -> Option<RgbD> {
        let (hit, material) = self.find_hit(ray, f64::MAX)?;
        let mut state = ShadingState::new(hit.normal, ray.direction);
        state.inv_normal = ray.direction.dot(hit.normal) > 0.0;
        state.reflection_level = reflection_level;
        state.refraction_level = refraction_level;

        let mut host = SceneHost {
            world: self,
            pos: hit.pos,
            state,
            rd,
        };
        let color = match material {
            Material::Glass(params) => materials::glass(&mut host, &state, params),
            Material::Metal(params) => materials::metal(&mut host, &state, params),
            Material::Plastic(params) => materials::plastic(&mut host, &state, params),
        };
        Some(color.truncate())
    }
}

/// The renderer side of one shading point
struct SceneHost<'w, 'r> {
    world: &'w World,
    pos: Vec3d,
    state: ShadingState,
    rd: &'r mut fastrand::Rng,
}

impl ShadingHost for SceneHost<'_, '_> {
    fn trace_reflection(&mut self, direction: Vec3d) -> Option<RgbD> {
        let ray = Ray {
            origin: self.pos,
            direction,
        };
        self.world.shade(
            ray,
            self.state.reflection_level + 1,
            self.state.refraction_level,
            self.rd,
        )
    }

    fn trace_environment(&mut self, direction: Vec3d) -> RgbD {
        sky(direction)
    }

    fn trace_refraction(&mut self, direction: Vec3d) -> RgbD {
        let ray = Ray {
            origin: self.pos,
            direction,
        };
        self.world
            .shade(
                ray,
                self.state.reflection_level,
                self.state.refraction_level + 1,
                self.rd,
            )
            .unwrap_or_else(|| sky(direction))
    }

    fn sample_2d(&mut self, _index: usize, _count: usize) -> Option<Vec2d> {
        Some(Vec2d::new(self.rd.f64(), self.rd.f64()))
    }

    fn sample_light(&mut self, light: usize, index: usize) -> Option<LightSample> {
        if light != 0 || index > 0 {
            return None;
        }
        let to_light = self.world.light_position - self.pos;
        let distance = to_light.length();
        let direction = to_light / distance;
        let normal = self.state.oriented(None).normal;
        let cos_theta = direction.dot(normal);
        let shadow = Ray {
            origin: self.pos,
            direction,
        };
        let visible = cos_theta > 0.0 && self.world.find_hit(shadow, distance).is_none();
        let color = if visible {
            self.world.light_color / (distance * distance)
        } else {
            RgbD::ZERO
        };
        Some(LightSample {
            color,
            direction,
            cos_theta: cos_theta.max(0.0),
        })
    }

    fn average_radiance(&mut self) -> RgbD {
        RgbD::splat(0.05)
    }
}

fn save_image(
    path: &std::path::Path,
    buffer: &[u8],
    width: u32,
    height: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(&mut writer, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_source_gamma(png::ScaledFloat::new(1.0 / 2.2));

    let source_chromaticities = png::SourceChromaticities::new(
        // Using unscaled instantiation here
        (0.31270, 0.32900),
        (0.64000, 0.33000),
        (0.30000, 0.60000),
        (0.15000, 0.06000),
    );

    encoder.set_source_chromaticities(source_chromaticities);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(buffer)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let sphere = |x, y, z, radius| Sphere {
        center: Vec3d::new(x, y, z),
        radius,
    };
    let world = World {
        spheres: vec![
            (
                sphere(0.0, 0.0, -1000.0, 1000.0),
                Material::Plastic(PlasticParams {
                    diffuse_k: RgbF::splat(0.4),
                    reflect_k: RgbF::splat(0.5),
                    roughness: 0.3,
                    sigma: 20.0,
                    lights: vec![0],
                    ..Default::default()
                }),
            ),
            (
                sphere(-1.2, 0.0, 0.5, 0.5),
                Material::Glass(GlassParams::default()),
            ),
            (
                sphere(0.0, 0.0, 0.5, 0.5),
                Material::Metal(MetalParams {
                    roughness: 0.2,
                    ..Default::default()
                }),
            ),
            (
                sphere(1.2, 0.0, 0.5, 0.5),
                Material::Plastic(PlasticParams {
                    diffuse_k: RgbF::new(0.8, 0.2, 0.1),
                    roughness: 0.0,
                    lights: vec![0],
                    ..Default::default()
                }),
            ),
        ],
        light_position: Vec3d::new(2.0, -3.0, 4.0),
        light_color: RgbD::splat(30.0),
    };

    let image_size = (640, 360);
    let num_samples = 4;

    let cam_center = Vec3d::new(0.0, -5.0, 1.0);
    let cam_target = Vec3d::new(0.0, 0.0, 0.5);
    let forward = (cam_target - cam_center).normalize();
    let up = Vec3d::Z;
    // ensures that image is not distorted by image_size.0 and image_size.1 being
    // different
    let right = forward.cross(up).normalize() * 2.0 * image_size.0 as f64 / image_size.1 as f64;
    let up = -right.cross(forward).normalize() * 2.0;
    let focal_length = 8.0;
    let forward = forward * focal_length;

    let mut image: Vec<u8> = vec![0; 3 * image_size.0 * image_size.1];

    image
        .par_chunks_mut(3 * image_size.0)
        .enumerate()
        .for_each(|(y, row)| {
            let mut rd = fastrand::Rng::with_seed(y as u64);
            for x in 0..image_size.0 {
                let mut color = RgbD::ZERO;
                for _ in 0..num_samples {
                    // from 0 to 1
                    let uv_x = (x as f64 + rd.f64()) / image_size.0 as f64;
                    let uv_y = (y as f64 + rd.f64()) / image_size.1 as f64;

                    let direction =
                        (forward + right * (uv_x * 2.0 - 1.0) + up * (uv_y * 2.0 - 1.0))
                            .normalize();
                    let ray = Ray {
                        origin: cam_center,
                        direction,
                    };
                    color += world.shade(ray, 0, 0, &mut rd).unwrap_or_else(|| sky(direction));
                }
                color /= num_samples as f64;

                for (channel, value) in color.to_array().into_iter().enumerate() {
                    row[x * 3 + channel] = (value * 255.0).clamp(0.0, 255.0).floor() as u8;
                }
            }
            log::info!("row {y} of {} rows finished", image_size.1);
        });

    save_image(
        std::path::Path::new("furnace_spheres.png"),
        &image,
        image_size.0 as u32,
        image_size.1 as u32,
    )
}
