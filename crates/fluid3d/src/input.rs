//! Pointer interaction state written by the host application.

use glam::Vec3;

/// Read once per external-forces stage. The host updates it between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    /// Interaction point in world space (SPH).
    pub position: Vec3,
    pub pull: bool,
    pub push: bool,
    /// Pointer ray in world space (FLIP).
    pub ray_origin: Vec3,
    pub ray_direction: Vec3,
    /// World-space velocity of the pointer, used to stir the FLIP grid.
    pub pointer_velocity: Vec3,
}

impl InputState {
    /// Signed interaction strength: positive when pulling, negative when
    /// pushing, zero when idle or when both buttons are held.
    pub fn signed_strength(&self, strength: f32) -> f32 {
        match (self.pull, self.push) {
            (true, false) => strength,
            (false, true) => -strength,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_strength() {
        let mut input = InputState::default();
        assert_eq!(input.signed_strength(40.0), 0.0);
        input.pull = true;
        assert_eq!(input.signed_strength(40.0), 40.0);
        input.push = true;
        assert_eq!(input.signed_strength(40.0), 0.0);
        input.pull = false;
        assert_eq!(input.signed_strength(40.0), -40.0);
    }
}
