//! Point force fields.
//!
//! A force field pulls particles toward its center (positive strength) or
//! pushes them away (negative strength) within a bounded radius. Fields are
//! addressed by index handles; every accessor is bounds-checked and treats
//! a stale handle as a no-op.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A radius-bounded attractor or repeller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForceField {
    pub position: Vec2,
    /// Radius of effect.
    pub radius: f32,
    /// Positive attracts, negative repels.
    pub strength: f32,
    pub active: bool,
}

impl ForceField {
    pub fn new(position: Vec2, radius: f32, strength: f32) -> Self {
        Self {
            position,
            radius,
            strength,
            active: true,
        }
    }

    /// Force exerted on a particle at `point`.
    ///
    /// Magnitude is `strength / distance`, directed from the particle
    /// toward the field. Zero when inactive, outside the radius, or when
    /// the squared distance is at most `min_distance_sq`.
    pub fn force_at(&self, point: Vec2, min_distance_sq: f32) -> Vec2 {
        if !self.active {
            return Vec2::ZERO;
        }

        let delta = self.position - point;
        let dist_sq = delta.length_squared();
        if dist_sq < self.radius * self.radius && dist_sq > min_distance_sq {
            let dist = dist_sq.sqrt();
            delta / dist * (self.strength / dist)
        } else {
            Vec2::ZERO
        }
    }
}

/// Index-addressed list of force fields.
#[derive(Clone, Debug, Default)]
pub struct ForceFields {
    fields: Vec<ForceField>,
}

impl ForceFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field and return its handle.
    pub fn add(&mut self, field: ForceField) -> usize {
        self.fields.push(field);
        self.fields.len() - 1
    }

    /// Remove a field. Later handles shift down by one.
    pub fn remove(&mut self, handle: usize) -> Option<ForceField> {
        (handle < self.fields.len()).then(|| self.fields.remove(handle))
    }

    pub fn get(&self, handle: usize) -> Option<&ForceField> {
        self.fields.get(handle)
    }

    pub fn get_mut(&mut self, handle: usize) -> Option<&mut ForceField> {
        self.fields.get_mut(handle)
    }

    pub fn set_position(&mut self, handle: usize, position: Vec2) {
        if let Some(field) = self.fields.get_mut(handle) {
            field.position = position;
        }
    }

    /// Strength of a field, or `0.0` for a stale handle.
    pub fn strength(&self, handle: usize) -> f32 {
        self.fields.get(handle).map_or(0.0, |f| f.strength)
    }

    pub fn set_strength(&mut self, handle: usize, strength: f32) {
        if let Some(field) = self.fields.get_mut(handle) {
            field.strength = strength;
        }
    }

    /// Swap attraction and repulsion.
    pub fn toggle_polarity(&mut self, handle: usize) {
        if let Some(field) = self.fields.get_mut(handle) {
            field.strength = -field.strength;
        }
    }

    pub fn set_active(&mut self, handle: usize, active: bool) {
        if let Some(field) = self.fields.get_mut(handle) {
            field.active = active;
        }
    }

    /// Sum of all field forces at `point`.
    pub fn force_at(&self, point: Vec2, min_distance_sq: f32) -> Vec2 {
        self.fields.iter().map(|f| f.force_at(point, min_distance_sq)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForceField> + '_ {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 0.01;

    #[test]
    fn test_repel_pushes_away() {
        let field = ForceField::new(Vec2::ZERO, 50.0, -100.0);
        let force = field.force_at(Vec2::new(10.0, 0.0), EPS);
        assert!((force.x - 10.0).abs() < 1e-5);
        assert!(force.y.abs() < 1e-6);
    }

    #[test]
    fn test_attract_pulls_toward() {
        let field = ForceField::new(Vec2::new(0.0, 20.0), 50.0, 100.0);
        let force = field.force_at(Vec2::ZERO, EPS);
        assert!((force.y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_no_force_outside_radius_or_at_center() {
        let field = ForceField::new(Vec2::ZERO, 50.0, 100.0);
        assert_eq!(field.force_at(Vec2::new(50.0, 0.0), EPS), Vec2::ZERO);
        assert_eq!(field.force_at(Vec2::new(0.05, 0.0), EPS), Vec2::ZERO);
    }

    #[test]
    fn test_min_distance_is_configurable() {
        let field = ForceField::new(Vec2::ZERO, 50.0, 100.0);
        assert_ne!(field.force_at(Vec2::new(0.05, 0.0), 0.0), Vec2::ZERO);
        assert_eq!(field.force_at(Vec2::new(2.0, 0.0), 4.0), Vec2::ZERO);

        let mut fields = ForceFields::new();
        fields.add(field);
        fields.add(ForceField::new(Vec2::new(10.0, 0.0), 50.0, 100.0));
        assert_eq!(fields.force_at(Vec2::new(5.0, 0.0), EPS), Vec2::ZERO);
        assert_eq!(fields.force_at(Vec2::new(3.0, 0.0), 100.0), Vec2::ZERO);
    }

    #[test]
    fn test_inactive_field_is_silent() {
        let mut field = ForceField::new(Vec2::ZERO, 50.0, 100.0);
        field.active = false;
        assert_eq!(field.force_at(Vec2::new(5.0, 0.0), EPS), Vec2::ZERO);
    }

    #[test]
    fn test_stale_handles_are_noops() {
        let mut fields = ForceFields::new();
        let h = fields.add(ForceField::new(Vec2::ZERO, 10.0, 5.0));
        fields.set_position(h + 3, Vec2::ONE);
        fields.toggle_polarity(h + 3);
        assert!(fields.remove(h + 1).is_none());
        assert_eq!(fields.strength(h + 1), 0.0);
        assert_eq!(fields.get(h).unwrap().position, Vec2::ZERO);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_mutators() {
        let mut fields = ForceFields::new();
        let h = fields.add(ForceField::new(Vec2::ZERO, 10.0, 5.0));
        fields.toggle_polarity(h);
        assert_eq!(fields.strength(h), -5.0);
        fields.set_strength(h, 2.0);
        fields.set_position(h, Vec2::new(3.0, 4.0));
        fields.set_active(h, false);
        let f = fields.get(h).unwrap();
        assert_eq!((f.strength, f.position, f.active), (2.0, Vec2::new(3.0, 4.0), false));
        assert!(fields.remove(h).is_some());
        assert!(fields.is_empty());
    }
}
