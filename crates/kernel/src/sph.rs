//! SPH smoothing kernels.
//!
//! Implements the Wendland C2 kernel (support radius 2h) and the cubic
//! spline kernel in the compact form with support radius equal to its
//! parameter. Both are exposed through [`SmoothingKernel`] so the volume
//! estimator does not depend on a particular kernel.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::math::norm;
use crate::Vec3;

/// Normalization constant for the 3D Wendland C2 kernel: 21 / (16 * pi).
///
/// With q = r/h and support radius 2h, the analytically correct normalization
/// for the Wendland C2 kernel in 3D is alpha_d = 21 / (16 * pi).
const WENDLAND_C2_NORM_3D: f32 = 21.0 / (16.0 * PI);

/// Kernel evaluation used by the boundary volume estimator.
pub trait SmoothingKernel: Sync {
    /// Distance beyond which [`SmoothingKernel::w`] is zero.
    fn support_radius(&self) -> f32;

    /// Kernel value for the displacement `r = x_i - x_j`.
    fn w(&self, r: Vec3) -> f32;

    /// Kernel value at zero distance.
    fn w_zero(&self) -> f32 {
        self.w([0.0; 3])
    }
}

/// Kernel selector for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelType {
    /// [`WendlandC2`]
    WendlandC2,
    /// [`CubicSpline`]
    CubicSpline,
}

/// Wendland C2 smoothing kernel in 3D.
///
/// ```text
/// W(r, h) = (21 / (16 pi h^3)) * (1 - q/2)^4 * (1 + 2q)   for q = r/h <= 2
/// W(r, h) = 0                                                for q > 2
/// ```
///
/// # Arguments
/// * `r` - Distance between two particles (must be >= 0).
/// * `h` - Smoothing length. The support radius is 2h.
pub fn wendland_c2(r: f32, h: f32) -> f32 {
    let q = r / h;
    if q >= 2.0 {
        return 0.0;
    }
    let h3 = h * h * h;
    let one_minus_half_q = 1.0 - 0.5 * q;
    // (1 - q/2)^4
    let t = one_minus_half_q * one_minus_half_q;
    let t4 = t * t;
    WENDLAND_C2_NORM_3D / h3 * t4 * (1.0 + 2.0 * q)
}

/// Cubic spline kernel in 3D with compact support `radius`.
///
/// ```text
/// k = 8 / (pi R^3),  q = r / R
/// W = k (6q^3 - 6q^2 + 1)   for q <= 1/2
/// W = 2k (1 - q)^3          for 1/2 < q <= 1
/// W = 0                     otherwise
/// ```
pub fn cubic_spline(r: f32, radius: f32) -> f32 {
    let q = r / radius;
    if q > 1.0 {
        return 0.0;
    }
    let k = 8.0 / (PI * radius * radius * radius);
    if q <= 0.5 {
        let q2 = q * q;
        k * (6.0 * q2 * q - 6.0 * q2 + 1.0)
    } else {
        let t = 1.0 - q;
        k * 2.0 * t * t * t
    }
}

/// Wendland C2 kernel with a fixed smoothing length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WendlandC2 {
    /// Smoothing length h. Support is 2h.
    pub h: f32,
}

impl WendlandC2 {
    /// Kernel with smoothing length `h`.
    pub fn new(h: f32) -> Self {
        Self { h }
    }
}

impl SmoothingKernel for WendlandC2 {
    fn support_radius(&self) -> f32 {
        2.0 * self.h
    }

    #[inline]
    fn w(&self, r: Vec3) -> f32 {
        wendland_c2(norm(r), self.h)
    }
}

/// Cubic spline kernel with a fixed support radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSpline {
    /// Support radius.
    pub radius: f32,
}

impl CubicSpline {
    /// Kernel with compact support `radius`.
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

impl SmoothingKernel for CubicSpline {
    fn support_radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    fn w(&self, r: Vec3) -> f32 {
        cubic_spline(norm(r), self.radius)
    }
}

/// Build a boxed kernel from a selector and a support radius.
pub fn kernel_for(kind: KernelType, support_radius: f32) -> Box<dyn SmoothingKernel> {
    match kind {
        KernelType::WendlandC2 => Box::new(WendlandC2::new(0.5 * support_radius)),
        KernelType::CubicSpline => Box::new(CubicSpline::new(support_radius)),
    }
}
