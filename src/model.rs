//! Damped-pendulum state-space model.
//!
//! State vector: [angle (rad), angular velocity (rad/s)]. The continuous
//! dynamics linearized about the hanging equilibrium are
//!
//!   d/dt [theta, omega] = [[0, 1], [-g/r, -c/m]] * [theta, omega]
//!
//! with no input term. Discretization is exact via the matrix exponential,
//! so trajectories follow the continuous flow at the sample instants.

use anyhow::{ensure, Result};
use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

/// Standard gravity [m/s²]
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Radius or mass below this magnitude is treated as a division hazard
const MIN_PARAM: f64 = 1e-9;

/// Physical parameters of the pendulum.
///
/// `gravity` is fixed externally; `radius`, `mass`, `damping` are the free
/// parameters the estimator fits. `damping >= 0` is expected but not enforced.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PendulumParams {
    /// Gravitational acceleration [m/s²]
    pub gravity: f64,

    /// Pendulum radius (pivot to center of mass) [m]
    pub radius: f64,

    /// Bob mass [kg]
    pub mass: f64,

    /// Viscous damping coefficient [N·m·s/rad]
    pub damping: f64,
}

impl PendulumParams {
    pub fn new(gravity: f64, radius: f64, mass: f64, damping: f64) -> Self {
        Self {
            gravity,
            radius,
            mass,
            damping,
        }
    }

    /// Check that the parameters admit a well-defined system matrix.
    ///
    /// Radius and mass are divided by, so zero, near-zero, or non-finite
    /// values are rejected up front rather than producing a NaN matrix.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.gravity.is_finite() && self.damping.is_finite(),
            "gravity and damping must be finite (gravity={}, damping={})",
            self.gravity,
            self.damping
        );
        ensure!(
            self.radius.is_finite() && self.radius.abs() > MIN_PARAM,
            "radius must be finite and non-zero, got {}",
            self.radius
        );
        ensure!(
            self.mass.is_finite() && self.mass.abs() > MIN_PARAM,
            "mass must be finite and non-zero, got {}",
            self.mass
        );
        Ok(())
    }

    /// Continuous-time system matrix A_c = [[0, 1], [-g/r, -c/m]].
    ///
    /// Caller is responsible for `validate()`; with degenerate parameters the
    /// entries are non-finite.
    pub fn continuous_matrix(&self) -> Matrix2<f64> {
        Matrix2::new(
            0.0,
            1.0,
            -self.gravity / self.radius,
            -self.damping / self.mass,
        )
    }

    /// Exact discretization A_d = exp(A_c * dt).
    ///
    /// The input matrix is zero, so the discretized input term vanishes and
    /// only the state transition matrix is needed.
    pub fn discrete_matrix(&self, sample_time: f64) -> Result<Matrix2<f64>> {
        self.validate()?;
        ensure!(
            sample_time.is_finite() && sample_time > 0.0,
            "sample_time must be positive, got {}",
            sample_time
        );
        Ok((self.continuous_matrix() * sample_time).exp())
    }

    /// Undamped natural frequency sqrt(g/r) [rad/s].
    pub fn natural_frequency(&self) -> f64 {
        (self.gravity / self.radius).sqrt()
    }
}
