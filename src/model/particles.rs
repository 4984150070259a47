//! Short-lived point-cloud puffs.
//!
//! Each effect owns a fixed number of particles that drift outward and upward
//! while fading. Effects retire themselves once their lifetime is spent.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ParticleConfig;

#[derive(Debug, Clone)]
pub struct ParticleEffect {
    pub origin: Vec3,
    /// Offsets from `origin`.
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub life: f32,
    pub duration: f32,
    pub opacity: f32,
    pub size: f32,
    initial_opacity: f32,
    initial_size: f32,
    size_growth: f32,
}

impl ParticleEffect {
    /// Fraction of the lifetime spent, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.life / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_expired(&self) -> bool {
        self.life >= self.duration
    }

    fn advance(&mut self, dt: f32) {
        self.life += dt;
        for (p, v) in self.positions.iter_mut().zip(&self.velocities) {
            *p += *v * dt;
        }
        let t = self.progress();
        self.opacity = (self.initial_opacity * (1.0 - t)).max(0.0);
        self.size = self.initial_size + t * self.size_growth;
    }

    /// World-space particle positions.
    pub fn world_positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.positions.iter().map(move |p| self.origin + *p)
    }
}

pub struct ParticlePool {
    config: ParticleConfig,
    effects: Vec<ParticleEffect>,
    rng: StdRng,
}

impl ParticlePool {
    pub fn new(config: ParticleConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_rng(config: ParticleConfig, rng: StdRng) -> Self {
        Self { config, effects: Vec::new(), rng }
    }

    pub fn spawn(&mut self, center: Vec3) {
        let cfg = &self.config;
        let mut positions = Vec::with_capacity(cfg.count);
        let mut velocities = Vec::with_capacity(cfg.count);

        for _ in 0..cfg.count {
            let angle = self.rng.random::<f32>() * TAU;
            let radius = self.rng.random::<f32>() * cfg.radius;
            let offset = Vec3::new(
                angle.cos() * radius,
                self.rng.random::<f32>() * cfg.lift,
                angle.sin() * radius,
            );
            let rise = cfg.rise_min + self.rng.random::<f32>() * cfg.rise_jitter;

            positions.push(offset);
            velocities.push(Vec3::new(offset.x * cfg.spread, rise, offset.z * cfg.spread));
        }

        tracing::debug!(?center, count = cfg.count, "spawned particle effect");
        self.effects.push(ParticleEffect {
            origin: center,
            positions,
            velocities,
            life: 0.0,
            duration: cfg.duration,
            opacity: cfg.opacity,
            size: cfg.size,
            initial_opacity: cfg.opacity,
            initial_size: cfg.size,
            size_growth: cfg.size_growth,
        });
    }

    /// Advance every live effect and retire the spent ones.
    pub fn update(&mut self, dt: f32) {
        // high-to-low so removal never skips an entry
        for i in (0..self.effects.len()).rev() {
            let effect = &mut self.effects[i];
            effect.advance(dt);
            if effect.is_expired() {
                self.effects.swap_remove(i);
            }
        }
    }

    pub fn effects(&self) -> &[ParticleEffect] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Total number of live particles across all effects.
    pub fn particle_count(&self) -> usize {
        self.effects.iter().map(|e| e.positions.len()).sum()
    }
}
