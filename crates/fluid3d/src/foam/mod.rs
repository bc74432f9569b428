//! Secondary particles (spray, foam, bubbles) driven by the primary fluid.
//!
//! Foam particles live in a fixed-capacity ring buffer. New particles claim
//! slots through a wrapping atomic cursor and overwrite whatever was there;
//! expired particles stay in the buffer until a spawn reuses their slot.

pub mod spawn;
pub mod update;

use std::sync::atomic::{AtomicUsize, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::config::SimConfig;
use crate::particle::ParticleBuffers;
use crate::spatial::SpatialIndex;

pub use spawn::{ramp, spawn_count, spawn_foam, stochastic_round, trapped_air_potential};
pub use update::{classify, update_foam, FoamKind};

/// One secondary particle, laid out for direct GPU upload (32 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FoamParticle {
    pub position: Vec3,
    /// Seconds left to live; the particle is dead at or below zero.
    pub lifetime: f32,
    pub velocity: Vec3,
    /// Render scale in [0, 1].
    pub scale: f32,
}

impl FoamParticle {
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.lifetime > 0.0
    }
}

/// Ring buffer of foam particles.
#[derive(Debug)]
pub struct FoamBuffer {
    particles: Vec<FoamParticle>,
    cursor: AtomicUsize,
}

impl FoamBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: vec![FoamParticle::default(); capacity],
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[FoamParticle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [FoamParticle] {
        &mut self.particles
    }

    /// Total number of spawns so far, including overwritten ones.
    pub fn spawned(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn live_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_alive()).count()
    }

    /// Claim the next slot. The cursor wraps, so the oldest slot is reused
    /// whether or not its particle has expired.
    #[inline]
    pub fn claim_slot(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.particles.len()
    }

    /// Write new particles into claimed slots.
    pub fn insert(&mut self, new_particles: &[FoamParticle]) {
        for particle in new_particles {
            let slot = self.claim_slot();
            self.particles[slot] = *particle;
        }
    }
}

/// Spawn from the fluid, then advance and classify every live foam particle.
pub fn step_foam(
    foam: &mut FoamBuffer,
    particles: &ParticleBuffers,
    index: &SpatialIndex,
    config: &SimConfig,
    frame: u64,
    dt: f32,
) {
    let spawned = spawn_foam(particles, index, &config.foam, frame, dt);
    foam.insert(&spawned);
    update_foam(foam.particles_mut(), particles, index, config, dt);
    log::trace!("foam: {} spawned, {} live", spawned.len(), foam.live_count());
}
