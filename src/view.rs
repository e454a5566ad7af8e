//! Read-only particle views for the presentation layer.
//!
//! After [`ParticleSystem::update`](crate::ParticleSystem::update) returns,
//! callers may read every active particle either as [`ParticleView`]
//! values or packed into a [`ParticleInstance`] buffer ready to be copied
//! into a vertex/instance buffer with `bytemuck::cast_slice`.

use crate::particle::{Particle, Rgba};
use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Snapshot of one active particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleView {
    /// Global pool index.
    pub index: usize,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Rgba,
    pub size: f32,
    /// Remaining fraction of lifetime (1.0 at birth).
    pub life_ratio: f32,
    pub rainbow: bool,
}

impl ParticleView {
    pub fn new(index: usize, particle: &Particle) -> Self {
        Self {
            index,
            position: particle.position,
            velocity: particle.velocity,
            color: particle.color,
            size: particle.size,
            life_ratio: particle.life_ratio(),
            rainbow: particle.rainbow,
        }
    }
}

/// GPU-friendly per-particle record (48 bytes, no implicit padding).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 2],
    pub size: f32,
    pub life_ratio: f32,
    /// Normalized RGBA.
    pub color: [f32; 4],
    /// 1 for rainbow particles, 0 otherwise.
    pub rainbow: u32,
    pub _pad: [u32; 3],
}

impl From<&Particle> for ParticleInstance {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.position.to_array(),
            size: p.size,
            life_ratio: p.life_ratio(),
            color: p.color.to_array(),
            rainbow: p.rainbow as u32,
            _pad: [0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 48);
        let instances = [ParticleInstance::default(); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&instances);
        assert_eq!(bytes.len(), 96);
    }

    #[test]
    fn test_views_from_particle() {
        let p = Particle {
            position: Vec2::new(3.0, 4.0),
            lifetime: 1.0,
            max_lifetime: 4.0,
            size: 2.0,
            color: Rgba::new(255, 0, 0, 255),
            active: true,
            rainbow: true,
            ..Default::default()
        };

        let view = ParticleView::new(7, &p);
        assert_eq!(view.index, 7);
        assert_eq!(view.life_ratio, 0.25);

        let inst = ParticleInstance::from(&p);
        assert_eq!(inst.position, [3.0, 4.0]);
        assert_eq!(inst.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(inst.rainbow, 1);
    }
}
