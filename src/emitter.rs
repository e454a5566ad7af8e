//! Particle emitters.
//!
//! Emitters claim inactive slots from the pool and initialize them. Each
//! emitter converts its rate into whole particles per frame, carrying the
//! fractional remainder over to the next frame so the long-run rate is
//! exact regardless of frame timing.
//!
//! # Emitter Shapes
//!
//! | Shape | Spawn position | Initial velocity |
//! |-------|----------------|------------------|
//! | [`EmitterShape::Point`] | Emitter position | `speed` in a random direction |
//! | [`EmitterShape::Circle`] | Random point within 50 units | `speed` radially outward |
//! | [`EmitterShape::Line`] | Random point on a 200-unit horizontal segment | Upward with slight horizontal jitter |
//! | [`EmitterShape::Spiral`] | Advancing point on a growing spiral | Mostly tangential |
//!
//! When the pool has no inactive slot left, the remaining spawns of that
//! frame are dropped without error.
//!
//! # Example
//!
//! ```ignore
//! let fountain = EmitterSettings::new(Vec2::new(640.0, 620.0), EmitterShape::Point)
//!     .with_rate(500.0)
//!     .with_speed(200.0)
//!     .with_lifetime(3.0)
//!     .with_color(ColorRange::new(Rgba::new(50, 150, 200, 150), Rgba::new(100, 255, 255, 255)));
//! let handle = system.add_emitter(fountain);
//! ```

use crate::particle::{Particle, Rgba};
use crate::store::StoreGuard;
use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;

/// Maximum spawn distance of a circle emitter.
const CIRCLE_RADIUS: f32 = 50.0;
/// Half-length of a line emitter.
const LINE_HALF_WIDTH: f32 = 100.0;
/// Horizontal velocity jitter of a line emitter, as a fraction of speed.
const LINE_JITTER: f32 = 0.2;
/// Extra random distance added to the spiral radius.
const SPIRAL_OFFSET_MIN: f32 = 5.0;
const SPIRAL_OFFSET_MAX: f32 = 20.0;
/// Tangential speed factor range of a spiral emitter.
const SPIRAL_SPIN_MIN: f32 = 2.0;
const SPIRAL_SPIN_MAX: f32 = 5.0;
/// Outward speed factor of a spiral emitter.
const SPIRAL_RADIAL: f32 = 0.5;
/// Spiral angle advance per emitted particle (radians).
pub const SPIRAL_ANGLE_STEP: f32 = 0.1;
/// Spiral radius growth per emitted particle.
pub const SPIRAL_RADIUS_STEP: f32 = 0.05;
/// Spiral radius at start and after wrapping.
pub const SPIRAL_RADIUS_START: f32 = 5.0;
/// Spiral radius beyond which it wraps back to the start.
pub const SPIRAL_RADIUS_MAX: f32 = 100.0;

/// Spawn pattern of an emitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmitterShape {
    #[default]
    Point,
    Circle,
    Line,
    Spiral,
}

/// Per-channel inclusive color range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub min: Rgba,
    pub max: Rgba,
}

impl ColorRange {
    pub fn new(min: Rgba, max: Rgba) -> Self {
        Self { min, max }
    }

    /// A range containing a single color.
    pub fn solid(color: Rgba) -> Self {
        Self { min: color, max: color }
    }

    /// Whether every channel of `color` lies within the range.
    pub fn contains(&self, color: Rgba) -> bool {
        fn within(v: u8, a: u8, b: u8) -> bool {
            v >= a.min(b) && v <= a.max(b)
        }
        within(color.r, self.min.r, self.max.r)
            && within(color.g, self.min.g, self.max.g)
            && within(color.b, self.min.b, self.max.b)
            && within(color.a, self.min.a, self.max.a)
    }

    fn sample(&self, rng: &mut SmallRng) -> Rgba {
        let mut channel = |a: u8, b: u8| rng.gen_range(a.min(b)..=a.max(b));
        Rgba {
            r: channel(self.min.r, self.max.r),
            g: channel(self.min.g, self.max.g),
            b: channel(self.min.b, self.max.b),
            a: channel(self.min.a, self.max.a),
        }
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::solid(Rgba::WHITE)
    }
}

/// Configuration of an emitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterSettings {
    pub position: Vec2,
    /// Particles per second.
    pub rate: f32,
    /// Initial particle speed.
    pub speed: f32,
    /// Display size of emitted particles.
    pub particle_size: f32,
    /// Lifetime of emitted particles in seconds.
    pub lifetime: f32,
    pub shape: EmitterShape,
    pub color: ColorRange,
    /// Mark emitted particles for rainbow coloring.
    pub rainbow: bool,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rate: 100.0,
            speed: 100.0,
            particle_size: 3.0,
            lifetime: 3.0,
            shape: EmitterShape::Point,
            color: ColorRange::default(),
            rainbow: false,
        }
    }
}

impl EmitterSettings {
    pub fn new(position: Vec2, shape: EmitterShape) -> Self {
        Self {
            position,
            shape,
            ..Default::default()
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_particle_size(mut self, size: f32) -> Self {
        self.particle_size = size;
        self
    }

    pub fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_color(mut self, color: ColorRange) -> Self {
        self.color = color;
        self
    }

    pub fn with_rainbow(mut self, rainbow: bool) -> Self {
        self.rainbow = rainbow;
        self
    }
}

/// Persistent phase of a spiral emitter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpiralPhase {
    pub angle: f32,
    pub radius: f32,
}

impl Default for SpiralPhase {
    fn default() -> Self {
        Self {
            angle: 0.0,
            radius: SPIRAL_RADIUS_START,
        }
    }
}

impl SpiralPhase {
    fn advance(&mut self) {
        self.angle += SPIRAL_ANGLE_STEP;
        self.radius += SPIRAL_RADIUS_STEP;
        if self.radius > SPIRAL_RADIUS_MAX {
            self.radius = SPIRAL_RADIUS_START;
        }
    }
}

/// Callback run on every particle right after an emitter initializes it.
pub type ParticleModifier = Box<dyn Fn(&mut Particle) + Send + Sync>;

/// A stateful spawn policy.
pub struct Emitter {
    settings: EmitterSettings,
    /// Fractional particles owed from previous frames, always in `[0, 1)`.
    carry: f32,
    spiral: SpiralPhase,
    rng: SmallRng,
    modifiers: Vec<ParticleModifier>,
}

impl Emitter {
    /// Create an emitter seeded from system entropy.
    pub fn new(settings: EmitterSettings) -> Self {
        Self::with_rng(settings, SmallRng::from_entropy())
    }

    /// Create an emitter with a deterministic random stream.
    pub fn with_seed(settings: EmitterSettings, seed: u64) -> Self {
        Self::with_rng(settings, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(settings: EmitterSettings, rng: SmallRng) -> Self {
        Self {
            settings,
            carry: 0.0,
            spiral: SpiralPhase::default(),
            rng,
            modifiers: Vec::new(),
        }
    }

    pub fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    pub fn position(&self) -> Vec2 {
        self.settings.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.settings.position = position;
    }

    /// Fractional emission owed to the next frame.
    pub fn carry(&self) -> f32 {
        self.carry
    }

    pub fn spiral_phase(&self) -> SpiralPhase {
        self.spiral
    }

    /// Register a callback applied to each newly emitted particle.
    pub fn add_modifier<F>(&mut self, modifier: F)
    where
        F: Fn(&mut Particle) + Send + Sync + 'static,
    {
        self.modifiers.push(Box::new(modifier));
    }

    /// Advance by `dt` seconds, spawning into the pool.
    ///
    /// Returns the number of particles actually emitted, which is lower
    /// than the owed amount when the pool runs out of inactive slots.
    pub fn update(&mut self, dt: f32, store: &mut StoreGuard<'_>) -> usize {
        let owed = (self.settings.rate * dt + self.carry).max(0.0);
        if !owed.is_finite() {
            self.carry = 0.0;
            return 0;
        }

        let whole = owed.floor();
        self.carry = (owed - whole).clamp(0.0, 1.0 - f32::EPSILON);
        self.emit(whole as usize, store)
    }

    /// Spawn up to `count` particles immediately, ignoring the rate.
    ///
    /// A particle that a modifier leaves inactive is discarded and its slot
    /// returned to the pool; it does not count as emitted.
    pub fn emit(&mut self, count: usize, store: &mut StoreGuard<'_>) -> usize {
        let mut emitted = 0;
        for _ in 0..count {
            let Some((index, particle)) = store.claim_slot() else {
                break;
            };
            self.spawn(particle);
            if particle.active {
                emitted += 1;
            } else {
                store.release(index);
            }
        }
        emitted
    }

    fn spawn(&mut self, particle: &mut Particle) {
        let s = &self.settings;
        let rng = &mut self.rng;

        let (offset, velocity) = match s.shape {
            EmitterShape::Point => {
                let angle = rng.gen_range(0.0..TAU);
                (Vec2::ZERO, Vec2::from_angle(angle) * s.speed)
            }
            EmitterShape::Circle => {
                let dir = Vec2::from_angle(rng.gen_range(0.0..TAU));
                let radius = rng.gen_range(0.0..=CIRCLE_RADIUS);
                (dir * radius, dir * s.speed)
            }
            EmitterShape::Line => {
                let x = rng.gen_range(-LINE_HALF_WIDTH..=LINE_HALF_WIDTH);
                let jitter = rng.gen_range(-LINE_JITTER..=LINE_JITTER);
                (Vec2::new(x, 0.0), Vec2::new(jitter * s.speed, -s.speed))
            }
            EmitterShape::Spiral => {
                let dir = Vec2::from_angle(self.spiral.angle);
                let radius = self.spiral.radius + rng.gen_range(SPIRAL_OFFSET_MIN..=SPIRAL_OFFSET_MAX);
                let spin = rng.gen_range(SPIRAL_SPIN_MIN..=SPIRAL_SPIN_MAX);
                // Tangent scaled by spin plus a small outward push.
                let velocity = (dir.perp() * spin + dir * SPIRAL_RADIAL) * s.speed;
                self.spiral.advance();
                (dir * radius, velocity)
            }
        };

        *particle = Particle {
            position: s.position + offset,
            velocity,
            acceleration: Vec2::ZERO,
            lifetime: s.lifetime,
            max_lifetime: s.lifetime,
            size: s.particle_size,
            color: s.color.sample(rng),
            active: true,
            rainbow: s.rainbow,
        };

        for modifier in &self.modifiers {
            modifier(particle);
        }
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("settings", &self.settings)
            .field("carry", &self.carry)
            .field("spiral", &self.spiral)
            .field("modifiers", &self.modifiers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ParticleStore;

    fn emitter(shape: EmitterShape) -> Emitter {
        let settings = EmitterSettings::new(Vec2::new(200.0, 300.0), shape)
            .with_speed(100.0)
            .with_lifetime(2.0)
            .with_particle_size(4.0);
        Emitter::with_seed(settings, 42)
    }

    fn spawn_all(emitter: &mut Emitter, count: usize) -> Vec<Particle> {
        let store = ParticleStore::new(count, 1);
        let mut guard = store.lock();
        assert_eq!(emitter.emit(count, &mut guard), count);
        guard.iter_active().map(|(_, p)| *p).collect()
    }

    #[test]
    fn test_carry_accumulates_fractional_rate() {
        let store = ParticleStore::new(1000, 2);
        let mut guard = store.lock();
        let mut e = Emitter::with_seed(EmitterSettings::default().with_rate(10.0), 1);

        let total: usize = (0..20).map(|_| e.update(0.05, &mut guard)).sum();
        assert_eq!(total, 10);
        assert_eq!(guard.active_count(), 10);
    }

    #[test]
    fn test_carry_stays_in_unit_interval() {
        let store = ParticleStore::new(100_000, 1);
        let mut guard = store.lock();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut e = Emitter::with_seed(EmitterSettings::default().with_rate(137.0), 2);
        for _ in 0..200 {
            e.update(rng.gen_range(0.0..0.05), &mut guard);
            assert!((0.0..1.0).contains(&e.carry()));
        }
    }

    #[test]
    fn test_saturated_pool_drops_excess() {
        let store = ParticleStore::new(100, 4);
        let mut guard = store.lock();
        let mut e = Emitter::with_seed(EmitterSettings::default().with_rate(1000.0), 5);

        assert_eq!(e.update(1.0, &mut guard), 100);
        assert_eq!(e.update(1.0, &mut guard), 0);
        assert_eq!(guard.active_count(), 100);
    }

    #[test]
    fn test_nan_dt_emits_nothing() {
        let store = ParticleStore::new(10, 1);
        let mut guard = store.lock();
        let mut e = emitter(EmitterShape::Point);
        assert_eq!(e.update(f32::NAN, &mut guard), 0);
        assert_eq!(e.update(-1.0, &mut guard), 0);
        assert!((0.0..1.0).contains(&e.carry()));
    }

    #[test]
    fn test_particle_fully_initialized() {
        let colors = ColorRange::new(Rgba::new(10, 20, 30, 40), Rgba::new(50, 60, 70, 80));
        let settings = EmitterSettings::new(Vec2::ZERO, EmitterShape::Point)
            .with_lifetime(1.5)
            .with_particle_size(2.0)
            .with_color(colors)
            .with_rainbow(true);
        let mut e = Emitter::with_seed(settings, 9);

        for p in spawn_all(&mut e, 50) {
            assert!(p.active && p.rainbow);
            assert_eq!(p.lifetime, 1.5);
            assert_eq!(p.max_lifetime, 1.5);
            assert_eq!(p.size, 2.0);
            assert_eq!(p.acceleration, Vec2::ZERO);
            assert!(colors.contains(p.color), "{:?} outside range", p.color);
        }
    }

    #[test]
    fn test_point_shape() {
        let mut e = emitter(EmitterShape::Point);
        for p in spawn_all(&mut e, 50) {
            assert_eq!(p.position, Vec2::new(200.0, 300.0));
            assert!((p.velocity.length() - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_circle_shape_moves_radially() {
        let mut e = emitter(EmitterShape::Circle);
        for p in spawn_all(&mut e, 50) {
            let offset = p.position - Vec2::new(200.0, 300.0);
            assert!(offset.length() <= CIRCLE_RADIUS + 1e-3);
            assert!((p.velocity.length() - 100.0).abs() < 1e-3);
            if offset.length() > 1.0 {
                assert!(offset.normalize().dot(p.velocity.normalize()) > 0.999);
            }
        }
    }

    #[test]
    fn test_line_shape_moves_up() {
        let mut e = emitter(EmitterShape::Line);
        for p in spawn_all(&mut e, 50) {
            assert_eq!(p.position.y, 300.0);
            assert!((p.position.x - 200.0).abs() <= LINE_HALF_WIDTH + 1e-3);
            assert_eq!(p.velocity.y, -100.0);
            assert!(p.velocity.x.abs() <= LINE_JITTER * 100.0 + 1e-3);
        }
    }

    #[test]
    fn test_spiral_phase_advances_and_wraps() {
        let mut e = emitter(EmitterShape::Spiral);
        let particles = spawn_all(&mut e, 10);

        let phase = e.spiral_phase();
        assert!((phase.angle - 10.0 * SPIRAL_ANGLE_STEP).abs() < 1e-4);
        assert!((phase.radius - (SPIRAL_RADIUS_START + 10.0 * SPIRAL_RADIUS_STEP)).abs() < 1e-4);

        // First particle sits on angle 0 at radius start + [5, 20].
        let first = particles[0].position - Vec2::new(200.0, 300.0);
        assert!(first.y.abs() < 1e-3);
        assert!(first.x >= SPIRAL_RADIUS_START + SPIRAL_OFFSET_MIN - 1e-3);
        assert!(first.x <= SPIRAL_RADIUS_START + SPIRAL_OFFSET_MAX + 1e-3);

        let mut phase = SpiralPhase { angle: 0.0, radius: SPIRAL_RADIUS_MAX };
        phase.advance();
        assert_eq!(phase.radius, SPIRAL_RADIUS_START);
    }

    #[test]
    fn test_spiral_velocity_is_tangential_with_outward_push() {
        let mut e = emitter(EmitterShape::Spiral);
        for p in spawn_all(&mut e, 200) {
            let dir = (p.position - Vec2::new(200.0, 300.0)).normalize();
            let radial = p.velocity.dot(dir) / 100.0;
            let spin = p.velocity.dot(dir.perp()) / 100.0;
            assert!((radial - SPIRAL_RADIAL).abs() < 1e-3, "radial {}", radial);
            assert!(spin >= SPIRAL_SPIN_MIN - 1e-3 && spin <= SPIRAL_SPIN_MAX + 1e-3, "spin {}", spin);
        }
    }

    #[test]
    fn test_modifiers_run_after_spawn() {
        let mut e = emitter(EmitterShape::Point);
        e.add_modifier(|p| p.size *= 2.0);
        e.add_modifier(|p| p.velocity = Vec2::ZERO);
        for p in spawn_all(&mut e, 5) {
            assert_eq!(p.size, 8.0);
            assert_eq!(p.velocity, Vec2::ZERO);
        }
    }

    #[test]
    fn test_modifier_can_discard_particles() {
        let store = ParticleStore::new(4, 1);
        let mut guard = store.lock();

        let mut e = emitter(EmitterShape::Point);
        e.add_modifier(|p| p.active = false);
        assert_eq!(e.emit(4, &mut guard), 0);
        assert_eq!(guard.active_count(), 0);
        assert!(guard.has_free_slot());

        let mut normal = emitter(EmitterShape::Point);
        assert_eq!(normal.emit(4, &mut guard), 4);
        assert_eq!(guard.active_count(), 4);
        assert_eq!(guard.iter_active().count(), 4);
    }

    #[test]
    fn test_set_position() {
        let mut e = emitter(EmitterShape::Point);
        e.set_position(Vec2::new(1.0, 2.0));
        assert_eq!(spawn_all(&mut e, 1)[0].position, Vec2::new(1.0, 2.0));
    }
}
