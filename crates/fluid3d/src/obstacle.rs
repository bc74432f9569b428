//! Static obstacle inside the domain.
//!
//! Shared by SPH collision, FLIP solid-cell marking and FLIP advection.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::DISTANCE_EPSILON;
use crate::error::{ConfigError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    /// Oriented box.
    Box {
        centre: Vec3,
        half_size: Vec3,
        rotation: Quat,
    },
    Sphere { centre: Vec3, radius: f32 },
}

/// Closest surface point and outward normal for a point inside an obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub position: Vec3,
    pub normal: Vec3,
}

impl Obstacle {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Obstacle::Box {
                centre,
                half_size,
                rotation,
            } => {
                if !centre.is_finite() || !rotation.is_finite() {
                    return Err(ConfigError::NonFinite { field: "obstacle" });
                }
                let min = half_size.min_element();
                if !(min > 0.0) || !half_size.is_finite() {
                    return Err(ConfigError::NonPositive {
                        field: "obstacle.half_size",
                        value: min,
                    });
                }
            }
            Obstacle::Sphere { centre, radius } => {
                if !centre.is_finite() {
                    return Err(ConfigError::NonFinite { field: "obstacle" });
                }
                if !(radius > 0.0) || !radius.is_finite() {
                    return Err(ConfigError::NonPositive {
                        field: "obstacle.radius",
                        value: radius,
                    });
                }
            }
        }
        Ok(())
    }

    /// Signed distance to the surface: negative inside.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        match *self {
            Obstacle::Box {
                centre,
                half_size,
                rotation,
            } => {
                let local = rotation.inverse() * (point - centre);
                let q = local.abs() - half_size;
                q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
            }
            Obstacle::Sphere { centre, radius } => (point - centre).length() - radius,
        }
    }

    /// Surface contact for a point that has penetrated the obstacle.
    ///
    /// Boxes push out along the axis of minimum penetration, spheres along the
    /// radial direction.
    pub fn contact(&self, point: Vec3) -> Option<Contact> {
        match *self {
            Obstacle::Box {
                centre,
                half_size,
                rotation,
            } => {
                let mut local = rotation.inverse() * (point - centre);
                let penetration = half_size - local.abs();
                if penetration.min_element() <= 0.0 {
                    return None;
                }

                let axis = if penetration.x <= penetration.y && penetration.x <= penetration.z {
                    0
                } else if penetration.y <= penetration.z {
                    1
                } else {
                    2
                };
                let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
                local[axis] = half_size[axis] * sign;

                let mut normal_local = Vec3::ZERO;
                normal_local[axis] = sign;

                Some(Contact {
                    position: centre + rotation * local,
                    normal: rotation * normal_local,
                })
            }
            Obstacle::Sphere { centre, radius } => {
                let offset = point - centre;
                let dst = offset.length();
                if dst >= radius {
                    return None;
                }
                let normal = if dst > DISTANCE_EPSILON {
                    offset / dst
                } else {
                    Vec3::Y
                };
                Some(Contact {
                    position: centre + normal * radius,
                    normal,
                })
            }
        }
    }

    /// Push a penetrating particle to the surface and reflect its normal
    /// velocity, keeping `damping` of it. Returns whether a collision happened.
    pub fn resolve_collision(&self, position: &mut Vec3, velocity: &mut Vec3, damping: f32) -> bool {
        let Some(contact) = self.contact(*position) else {
            return false;
        };
        *position = contact.position;
        let normal_speed = velocity.dot(contact.normal);
        if normal_speed < 0.0 {
            *velocity -= contact.normal * normal_speed * (1.0 + damping);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Obstacle {
        Obstacle::Box {
            centre: Vec3::ZERO,
            half_size: Vec3::splat(0.5),
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn test_box_signed_distance() {
        let obstacle = unit_box();
        assert!((obstacle.signed_distance(Vec3::new(1.0, 0.0, 0.0)) - 0.5).abs() < 1e-6);
        assert!((obstacle.signed_distance(Vec3::ZERO) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_box_pushes_out_along_minimum_penetration() {
        let obstacle = unit_box();
        let mut position = Vec3::new(0.1, 0.45, 0.0);
        let mut velocity = Vec3::new(0.0, -2.0, 0.0);

        assert!(obstacle.resolve_collision(&mut position, &mut velocity, 0.5));
        assert!((position.y - 0.5).abs() < 1e-6);
        assert!((position.x - 0.1).abs() < 1e-6);
        assert!((velocity.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotated_box_normal_follows_rotation() {
        let obstacle = Obstacle::Box {
            centre: Vec3::ZERO,
            half_size: Vec3::new(0.5, 0.1, 0.5),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        };
        // Thin axis is now world X.
        let contact = obstacle.contact(Vec3::new(0.05, 0.0, 0.0)).unwrap();
        assert!((contact.normal - Vec3::X).length() < 1e-5);
        assert!((contact.position.x - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_contact_at_centre_is_defined() {
        let obstacle = Obstacle::Sphere {
            centre: Vec3::ZERO,
            radius: 1.0,
        };
        let contact = obstacle.contact(Vec3::ZERO).unwrap();
        assert_eq!(contact.normal, Vec3::Y);
        assert!(contact.position.is_finite());
    }

    #[test]
    fn test_outside_point_untouched() {
        let obstacle = unit_box();
        let mut position = Vec3::new(2.0, 0.0, 0.0);
        let mut velocity = Vec3::NEG_X;
        assert!(!obstacle.resolve_collision(&mut position, &mut velocity, 1.0));
        assert_eq!(velocity, Vec3::NEG_X);
    }
}
