//! Pendulum parameter estimation from video-derived angle data.
//!
//! Fits the physical parameters of a damped pendulum (radius, mass, damping)
//! to an observed angle time series by forward-simulating an exactly
//! discretized linear state-space model inside a Nelder-Mead search, then
//! analyzes how observable the state pair is via the observability Gramian:
//! - State-space model and exact discretization via matrix exponential
//! - Forward simulation of angle / angular-rate trajectories
//! - Derivative-free parameter fitting (sum-of-squared angle residuals)
//! - Observability ellipse geometry and optional balanced-coordinate transform
//!
//! Plotting, file loading, and CLI wiring are caller concerns; the crate
//! consumes and produces plain numeric arrays and structs.

pub mod estimate;
pub mod model;
pub mod observability;
pub mod simulate;

pub use estimate::{estimate, minimize, FitResult, MinimizeResult, NelderMeadConfig};
pub use model::{PendulumParams, STANDARD_GRAVITY};
pub use observability::{gramian, observability, observability_matrix, ObservabilityReport};
pub use simulate::{simulate, Trajectory};
