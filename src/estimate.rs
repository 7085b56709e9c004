//! Pendulum parameter fitting via derivative-free search.
//!
//! The objective wraps the simulator: for a candidate (radius, mass, damping)
//! it forward-simulates the discretized model over the observation window and
//! sums squared angle residuals; the angular-rate row is never compared.
//! A Nelder-Mead simplex drives the 3-dimensional search. Candidates that
//! produce a non-finite objective (degenerate radius/mass, numerical blowup)
//! are scored +infinity so the simplex walks away from them instead of
//! aborting; the search fails only if its best point is still non-finite.

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::model::PendulumParams;
use crate::simulate::simulate;

/// Nelder-Mead tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct NelderMeadConfig {
    /// Hard cap on objective evaluations; the search returns its best-found
    /// point when exhausted
    pub max_evaluations: usize,

    /// Convergence threshold on the spread of simplex function values
    pub f_tolerance: f64,

    /// Convergence threshold on the simplex diameter (infinity norm)
    pub x_tolerance: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 2000,
            f_tolerance: 1e-12,
            x_tolerance: 1e-10,
        }
    }
}

/// Outcome of a `minimize` run.
#[derive(Clone, Debug)]
pub struct MinimizeResult {
    /// Best point found
    pub x: Vec<f64>,

    /// Objective value at `x`
    pub fx: f64,

    /// Objective evaluations spent
    pub evaluations: usize,

    /// False when the evaluation budget ran out before the tolerances were met
    pub converged: bool,
}

/// Fitted pendulum parameters and achieved error.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FitResult {
    /// Fitted pendulum radius [m]
    pub radius: f64,

    /// Fitted bob mass [kg]
    pub mass: f64,

    /// Fitted damping coefficient [N·m·s/rad]
    pub damping: f64,

    /// Sum of squared angle residuals at the fitted parameters
    pub sse: f64,

    /// Objective evaluations spent by the search
    pub evaluations: u64,

    /// Whether the simplex met its tolerances within the budget
    pub converged: bool,
}

// Standard Nelder-Mead coefficients
const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

// Initial simplex: 5% per-coordinate perturbation, absolute step at zero
const SIMPLEX_REL_STEP: f64 = 0.05;
const SIMPLEX_ZERO_STEP: f64 = 0.00025;

fn score<F: FnMut(&[f64]) -> f64>(f: &mut F, x: &[f64], evals: &mut usize) -> f64 {
    *evals += 1;
    let fx = f(x);
    if fx.is_finite() {
        fx
    } else {
        f64::INFINITY
    }
}

/// Minimize `f` over `x0.len()` dimensions with a Nelder-Mead simplex.
///
/// Non-finite objective values are treated as +infinity. Returns the best
/// vertex when either the tolerances are met or the evaluation budget runs
/// out; errors only if the best vertex never evaluated finite.
pub fn minimize<F: FnMut(&[f64]) -> f64>(
    mut f: F,
    x0: &[f64],
    config: &NelderMeadConfig,
) -> Result<MinimizeResult> {
    let n = x0.len();
    ensure!(n >= 1, "minimize requires at least one dimension");
    ensure!(
        x0.iter().all(|v| v.is_finite()),
        "initial guess must be finite, got {:?}",
        x0
    );

    let mut evals = 0usize;

    // Build the initial simplex around x0
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut v = x0.to_vec();
        v[i] += if v[i] != 0.0 {
            SIMPLEX_REL_STEP * v[i].abs()
        } else {
            SIMPLEX_ZERO_STEP
        };
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex
        .iter()
        .map(|v| score(&mut f, v, &mut evals))
        .collect();

    let mut converged = false;
    while evals < config.max_evaluations {
        // Order vertices best to worst
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));
        let reordered: Vec<Vec<f64>> = order.iter().map(|&i| simplex[i].clone()).collect();
        let revalues: Vec<f64> = order.iter().map(|&i| values[i]).collect();
        simplex = reordered;
        values = revalues;

        let f_spread = if values[n].is_finite() {
            values[n] - values[0]
        } else {
            f64::INFINITY
        };
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| {
                v.iter()
                    .zip(simplex[0].iter())
                    .map(|(a, b)| (a - b).abs())
            })
            .fold(0.0f64, f64::max);
        if f_spread <= config.f_tolerance && x_spread <= config.x_tolerance {
            converged = true;
            break;
        }

        // Centroid of all but the worst vertex
        let mut centroid = vec![0.0; n];
        for v in &simplex[..n] {
            for (c, &vi) in centroid.iter_mut().zip(v.iter()) {
                *c += vi;
            }
        }
        for c in centroid.iter_mut() {
            *c /= n as f64;
        }

        let worst = simplex[n].clone();
        let lerp = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(worst.iter())
                .map(|(&c, &w)| c + t * (c - w))
                .collect()
        };

        let xr = lerp(REFLECT);
        let fr = score(&mut f, &xr, &mut evals);

        if fr < values[0] {
            // Best so far: try to expand further along the same direction
            let xe = lerp(EXPAND);
            let fe = score(&mut f, &xe, &mut evals);
            if fe < fr {
                simplex[n] = xe;
                values[n] = fe;
            } else {
                simplex[n] = xr;
                values[n] = fr;
            }
        } else if fr < values[n - 1] {
            simplex[n] = xr;
            values[n] = fr;
        } else if fr < values[n] {
            // Outside contraction
            let xc = lerp(CONTRACT);
            let fc = score(&mut f, &xc, &mut evals);
            if fc <= fr {
                simplex[n] = xc;
                values[n] = fc;
            } else {
                shrink(&mut simplex, &mut values, &mut f, &mut evals);
            }
        } else {
            // Inside contraction
            let xc = lerp(-CONTRACT);
            let fc = score(&mut f, &xc, &mut evals);
            if fc < values[n] {
                simplex[n] = xc;
                values[n] = fc;
            } else {
                shrink(&mut simplex, &mut values, &mut f, &mut evals);
            }
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if !values[best].is_finite() {
        bail!("objective was non-finite at every evaluated point");
    }
    if !converged {
        log::warn!(
            "simplex search stopped after {} evaluations without meeting tolerances",
            evals
        );
    }
    log::debug!(
        "simplex search finished: f = {:.6e}, {} evaluations, converged = {}",
        values[best],
        evals,
        converged
    );

    Ok(MinimizeResult {
        x: simplex[best].clone(),
        fx: values[best],
        evaluations: evals,
        converged,
    })
}

fn shrink<F: FnMut(&[f64]) -> f64>(
    simplex: &mut [Vec<f64>],
    values: &mut [f64],
    f: &mut F,
    evals: &mut usize,
) {
    let best = simplex[0].clone();
    for i in 1..simplex.len() {
        for (v, &b) in simplex[i].iter_mut().zip(best.iter()) {
            *v = b + SHRINK * (*v - b);
        }
        values[i] = score(f, &simplex[i], evals);
    }
}

/// Sum of squared angle residuals for a candidate parameter triple.
///
/// Non-finite when the candidate cannot be simulated; `estimate` relies on
/// the minimizer rejecting such candidates internally.
pub fn angle_sse(
    candidate: &[f64],
    gravity: f64,
    sample_time: f64,
    initial_state: (f64, f64),
    observed_angles: &[f64],
) -> f64 {
    let params = PendulumParams::new(gravity, candidate[0], candidate[1], candidate[2]);
    match simulate(&params, sample_time, observed_angles.len(), initial_state) {
        Ok(traj) => traj
            .angle
            .iter()
            .zip(observed_angles.iter())
            .map(|(&sim, &obs)| (sim - obs) * (sim - obs))
            .sum(),
        Err(_) => f64::INFINITY,
    }
}

/// Fit (radius, mass, damping) to an observed angle series.
///
/// The step count is the observed-series length; index 0 of the simulated
/// trajectory is pinned to `initial_state`, so `observed_angles[0]` should be
/// the initial angle. Budget exhaustion is non-fatal and reported through
/// `FitResult::converged`.
///
/// Note the model only sees the ratios g/radius and damping/mass, so mass and
/// damping are identifiable jointly (their ratio), not individually.
pub fn estimate(
    initial_guess: [f64; 3],
    gravity: f64,
    sample_time: f64,
    initial_state: (f64, f64),
    observed_angles: &[f64],
    config: &NelderMeadConfig,
) -> Result<FitResult> {
    ensure!(
        !observed_angles.is_empty(),
        "observed angle series must be non-empty"
    );
    ensure!(
        observed_angles.iter().all(|v| v.is_finite()),
        "observed angle series contains non-finite samples"
    );

    let objective = |candidate: &[f64]| {
        angle_sse(candidate, gravity, sample_time, initial_state, observed_angles)
    };
    let result = minimize(objective, &initial_guess, config)?;

    Ok(FitResult {
        radius: result.x[0],
        mass: result.x[1],
        damping: result.x[2],
        sse: result.fx,
        evaluations: result.evaluations as u64,
        converged: result.converged,
    })
}
