//! SPH smoothing kernels with precomputed normalization.
//!
//! All kernels have compact support `[0, h)` and are zero at and beyond `h`.

use std::f32::consts::PI;

/// Kernel set for one smoothing radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphKernels {
    /// Smoothing radius
    pub h: f32,
    h2: f32,
    density_scale: f32,
    near_density_scale: f32,
    density_slope_scale: f32,
    near_density_slope_scale: f32,
    viscosity_scale: f32,
}

impl SphKernels {
    pub fn new(h: f32) -> Self {
        Self {
            h,
            h2: h * h,
            density_scale: 15.0 / (2.0 * PI * h.powi(5)),
            near_density_scale: 15.0 / (PI * h.powi(6)),
            density_slope_scale: 15.0 / (PI * h.powi(5)),
            near_density_slope_scale: 45.0 / (PI * h.powi(6)),
            viscosity_scale: 315.0 / (64.0 * PI * h.powi(9)),
        }
    }

    /// Spiky kernel of order 2, used for density.
    #[inline]
    pub fn density(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        let v = self.h - r;
        v * v * self.density_scale
    }

    /// Spiky kernel of order 3, used for near density.
    #[inline]
    pub fn near_density(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        let v = self.h - r;
        v * v * v * self.near_density_scale
    }

    /// Derivative of `density` with respect to r. Never positive.
    #[inline]
    pub fn density_derivative(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        -(self.h - r) * self.density_slope_scale
    }

    /// Derivative of `near_density` with respect to r. Never positive.
    #[inline]
    pub fn near_density_derivative(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        let v = self.h - r;
        -v * v * self.near_density_slope_scale
    }

    /// Poly6 kernel, used for viscosity and foam velocity averaging.
    #[inline]
    pub fn viscosity(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        let v = self.h2 - r * r;
        v * v * v * self.viscosity_scale
    }
}

/// 1D tent (linear hat) weight for grid transfers: `max(0, 1 - |x|)`.
#[inline]
pub fn tent(x: f32) -> f32 {
    (1.0 - x.abs()).max(0.0)
}

/// Hermite smoothstep, 0 at `edge0` and 1 at `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Midpoint-rule integral of a radial kernel over the ball of radius h.
    fn integrate_radial(h: f32, kernel: impl Fn(f32) -> f32) -> f32 {
        let steps = 20_000;
        let dr = h / steps as f32;
        (0..steps)
            .map(|i| {
                let r = (i as f32 + 0.5) * dr;
                4.0 * PI * r * r * kernel(r) * dr
            })
            .sum()
    }

    #[test]
    fn test_kernels_zero_outside_support() {
        let k = SphKernels::new(0.2);
        for r in [0.2, 0.25, 10.0] {
            assert_eq!(k.density(r), 0.0);
            assert_eq!(k.near_density(r), 0.0);
            assert_eq!(k.density_derivative(r), 0.0);
            assert_eq!(k.near_density_derivative(r), 0.0);
            assert_eq!(k.viscosity(r), 0.0);
        }
    }

    #[test]
    fn test_kernels_normalized() {
        let k = SphKernels::new(0.35);
        for (name, integral) in [
            ("density", integrate_radial(k.h, |r| k.density(r))),
            ("near_density", integrate_radial(k.h, |r| k.near_density(r))),
            ("viscosity", integrate_radial(k.h, |r| k.viscosity(r))),
        ] {
            assert!(
                (integral - 1.0).abs() < 1e-3,
                "{} kernel integrates to {}",
                name,
                integral
            );
        }
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let k = SphKernels::new(0.5);
        let eps = 1e-3;
        for r in [0.05, 0.2, 0.4] {
            let fd = (k.density(r + eps) - k.density(r - eps)) / (2.0 * eps);
            let rel = (fd - k.density_derivative(r)).abs() / k.density_derivative(r).abs();
            assert!(rel < 1e-2, "density slope at r={}: fd {} vs {}", r, fd, k.density_derivative(r));

            let fd = (k.near_density(r + eps) - k.near_density(r - eps)) / (2.0 * eps);
            let rel = (fd - k.near_density_derivative(r)).abs() / k.near_density_derivative(r).abs();
            assert!(rel < 1e-2, "near density slope at r={}", r);
        }
    }

    #[test]
    fn test_tent_partition_of_unity() {
        for frac in [0.0, 0.25, 0.5, 0.9] {
            assert!((tent(frac) + tent(frac - 1.0) - 1.0).abs() < 1e-6);
        }
        assert_eq!(tent(1.5), 0.0);
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    }
}
