//! Per-particle state for the strongly coupled rigid-fluid pressure solve
//! (Gissler et al. 2019) layered on top of Akinci boundary particles.
//!
//! Only allocated when a model enables strong coupling.

use crate::resort::gather;
use crate::Vec3;

/// Strong-coupling arrays of one boundary model plus the body-level
/// velocity responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrongCoupling {
    pub(crate) density: Vec<f32>,
    pub(crate) pressure: Vec<f32>,
    pub(crate) v_s: Vec<Vec3>,
    pub(crate) s: Vec<f32>,
    pub(crate) v_rr: Vec<Vec3>,
    pub(crate) minus_rho_div_v_rr: Vec<f32>,
    pub(crate) v_rr_body: Vec3,
    pub(crate) omega_rr_body: Vec3,
}

impl StrongCoupling {
    /// Zeroed state for `n` particles.
    pub fn new(n: usize) -> Self {
        let mut sc = Self::default();
        sc.resize(n);
        sc
    }

    /// Number of particles covered.
    pub fn len(&self) -> usize {
        self.density.len()
    }

    /// Return `true` if no particles are covered.
    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }

    pub(crate) fn resize(&mut self, n: usize) {
        self.density.resize(n, 0.0);
        self.pressure.resize(n, 0.0);
        self.v_s.resize(n, [0.0; 3]);
        self.s.resize(n, 0.0);
        self.v_rr.resize(n, [0.0; 3]);
        self.minus_rho_div_v_rr.resize(n, 0.0);
    }

    /// Zero every per-step quantity, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        self.density.fill(0.0);
        self.pressure.fill(0.0);
        self.v_s.fill([0.0; 3]);
        self.s.fill(0.0);
        self.v_rr.fill([0.0; 3]);
        self.minus_rho_div_v_rr.fill(0.0);
        self.v_rr_body = [0.0; 3];
        self.omega_rr_body = [0.0; 3];
    }

    pub(crate) fn permute(&mut self, perm: &[u32]) {
        gather(&mut self.density, perm);
        gather(&mut self.pressure, perm);
        gather(&mut self.v_s, perm);
        gather(&mut self.s, perm);
        gather(&mut self.v_rr, perm);
        gather(&mut self.minus_rho_div_v_rr, perm);
    }

    /// Density of particle `i`.
    #[inline]
    pub fn density(&self, i: usize) -> f32 {
        debug_assert!(i < self.len());
        self.density[i]
    }

    /// Set the density of particle `i`.
    #[inline]
    pub fn set_density(&mut self, i: usize, value: f32) {
        debug_assert!(i < self.len());
        self.density[i] = value;
    }

    /// Pressure of particle `i`.
    #[inline]
    pub fn pressure(&self, i: usize) -> f32 {
        debug_assert!(i < self.len());
        self.pressure[i]
    }

    /// Set the pressure of particle `i`.
    #[inline]
    pub fn set_pressure(&mut self, i: usize, value: f32) {
        debug_assert!(i < self.len());
        self.pressure[i] = value;
    }

    /// Predicted velocity `v_s` of particle `i`.
    #[inline]
    pub fn predicted_velocity(&self, i: usize) -> Vec3 {
        debug_assert!(i < self.len());
        self.v_s[i]
    }

    /// Set `v_s` of particle `i`.
    #[inline]
    pub fn set_predicted_velocity(&mut self, i: usize, value: Vec3) {
        debug_assert!(i < self.len());
        self.v_s[i] = value;
    }

    /// Source term `s` of particle `i`.
    #[inline]
    pub fn source_term(&self, i: usize) -> f32 {
        debug_assert!(i < self.len());
        self.s[i]
    }

    /// Set `s` of particle `i`.
    #[inline]
    pub fn set_source_term(&mut self, i: usize, value: f32) {
        debug_assert!(i < self.len());
        self.s[i] = value;
    }

    /// Relative velocity response `v_rr` of particle `i`.
    #[inline]
    pub fn relative_velocity_response(&self, i: usize) -> Vec3 {
        debug_assert!(i < self.len());
        self.v_rr[i]
    }

    /// Set `v_rr` of particle `i`.
    #[inline]
    pub fn set_relative_velocity_response(&mut self, i: usize, value: Vec3) {
        debug_assert!(i < self.len());
        self.v_rr[i] = value;
    }

    /// Right-hand side `-rho * div(v_rr)` of particle `i`.
    #[inline]
    pub fn neg_density_divergence_rhs(&self, i: usize) -> f32 {
        debug_assert!(i < self.len());
        self.minus_rho_div_v_rr[i]
    }

    /// Set `-rho * div(v_rr)` of particle `i`.
    #[inline]
    pub fn set_neg_density_divergence_rhs(&mut self, i: usize, value: f32) {
        debug_assert!(i < self.len());
        self.minus_rho_div_v_rr[i] = value;
    }

    /// Predicted linear velocity correction of the body.
    pub fn linear_velocity_response(&self) -> Vec3 {
        self.v_rr_body
    }

    /// Set the body linear velocity correction.
    pub fn set_linear_velocity_response(&mut self, value: Vec3) {
        self.v_rr_body = value;
    }

    /// Predicted angular velocity correction of the body.
    pub fn angular_velocity_response(&self) -> Vec3 {
        self.omega_rr_body
    }

    /// Set the body angular velocity correction.
    pub fn set_angular_velocity_response(&mut self, value: Vec3) {
        self.omega_rr_body = value;
    }

    /// Whole density array.
    pub fn densities(&self) -> &[f32] {
        &self.density
    }

    /// Whole pressure array.
    pub fn pressures(&self) -> &[f32] {
        &self.pressure
    }
}
