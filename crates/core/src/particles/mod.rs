//! Short-lived sparks that rise from the bottom edge on beats.

use crate::palette::{palette_color, Rgba};
use crate::VisualStyle;

/// Life lost per frame.
pub const LIFE_DECAY: f32 = 0.02;
/// Downward acceleration added to vertical velocity per frame.
pub const GRAVITY: f32 = 0.05;
/// Pulse a frame needs to spawn a particle.
pub const SPAWN_PULSE: f32 = 0.1;
/// Radius particles are painted with, in logical pixels.
pub const PARTICLE_RADIUS: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life: f32,
    pub color: Rgba,
    age: u32,
}

impl Particle {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, color: Rgba) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            life: 1.0,
            color,
            age: 0,
        }
    }

    /// Moves the particle one frame.
    ///
    /// Life is derived from the frame count rather than accumulated, so it
    /// lands on exactly zero after `1 / LIFE_DECAY` frames.
    pub fn advance(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
        self.vy += GRAVITY;
        self.age += 1;
        self.life = (1.0 - self.age as f32 * LIFE_DECAY).max(0.0);
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Owns the live particles of one visualizer.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: fastrand::Rng,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// Particle system with reproducible spawn positions and colors.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Self {
        Self {
            particles: Vec::new(),
            rng,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Adds a particle directly, bypassing the spawn rule.
    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Runs one frame: maybe spawn, advance everything, drop dead particles.
    pub fn update(&mut self, style: &VisualStyle, width: f32, height: f32, pulse: f32) {
        if self.particles.len() < style.particle_density && pulse > SPAWN_PULSE {
            let particle = self.spawn(style, width, height);
            self.particles.push(particle);
        }

        for particle in &mut self.particles {
            particle.advance();
        }
        self.particles.retain(Particle::is_alive);
    }

    fn spawn(&mut self, style: &VisualStyle, width: f32, height: f32) -> Particle {
        let x = self.rng.f32() * width.max(0.0);
        let vx = (self.rng.f32() - 0.5) * 2.0;
        let vy = -self.rng.f32() * 5.0 - 2.0;
        let color = match style.particle_color.as_deref() {
            Some(color) => Rgba::parse_or_fallback(color),
            None => palette_color(&style.colors, self.rng.f32()),
        };
        Particle::new(x, height, vx, vy, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(density: usize, particle_color: Option<&str>) -> VisualStyle {
        VisualStyle {
            particle_density: density,
            particle_color: particle_color.map(str::to_string),
            ..VisualStyle::default()
        }
    }

    #[test]
    fn life_drops_by_fixed_step_and_dies_after_fifty_frames() {
        let mut particle = Particle::new(0.0, 0.0, 0.0, 0.0, Rgba::opaque(0, 0, 0));
        let mut previous = particle.life;
        for frame in 1..50 {
            particle.advance();
            assert!(particle.life < previous);
            assert!((particle.life - (1.0 - frame as f32 * 0.02)).abs() < 1e-5);
            assert!(particle.is_alive(), "died early at frame {frame}");
            previous = particle.life;
        }
        particle.advance();
        assert_eq!(particle.life, 0.0);
        assert!(!particle.is_alive());
    }

    #[test]
    fn system_culls_after_fifty_updates() {
        let mut system = ParticleSystem::with_seed(7);
        system.push(Particle::new(10.0, 10.0, 0.0, 0.0, Rgba::opaque(1, 2, 3)));
        let quiet = style(50, None);

        for _ in 0..49 {
            system.update(&quiet, 100.0, 100.0, 0.0);
        }
        assert_eq!(system.len(), 1);
        system.update(&quiet, 100.0, 100.0, 0.0);
        assert!(system.is_empty());
    }

    #[test]
    fn applies_velocity_then_gravity() {
        let mut particle = Particle::new(5.0, 50.0, 1.0, -3.0, Rgba::opaque(0, 0, 0));
        particle.advance();
        assert_eq!((particle.x, particle.y), (6.0, 47.0));
        assert!((particle.vy + 2.95).abs() < 1e-6);
    }

    #[test]
    fn spawns_only_with_pulse_and_below_density() {
        let mut system = ParticleSystem::with_seed(1);
        system.update(&style(2, None), 200.0, 100.0, 0.1);
        assert!(system.is_empty());

        for _ in 0..5 {
            system.update(&style(2, None), 200.0, 100.0, 0.5);
        }
        assert_eq!(system.len(), 2);
    }

    #[test]
    fn spawned_particles_rise_from_bottom_edge() {
        let mut system = ParticleSystem::with_seed(42);
        system.update(&style(10, Some("#ff0000")), 320.0, 240.0, 1.0);

        let particle = &system.particles()[0];
        assert!((0.0..320.0).contains(&particle.x));
        assert!((-1.0..=1.0).contains(&particle.vx));
        // One advance has already run: y = 240 + vy0, vy = vy0 + 0.05.
        let initial_vy = particle.vy - GRAVITY;
        assert!((-7.0..=-2.0).contains(&initial_vy));
        assert!((particle.y - (240.0 + initial_vy)).abs() < 1e-3);
        assert_eq!(particle.color, Rgba::opaque(255, 0, 0));
    }

    #[test]
    fn seeded_systems_are_reproducible() {
        let run = || {
            let mut system = ParticleSystem::with_seed(99);
            for _ in 0..10 {
                system.update(&style(50, None), 640.0, 480.0, 0.8);
            }
            system.particles().to_vec()
        };
        assert_eq!(run(), run());
    }
}
