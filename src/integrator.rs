// ------------------------------------------------------------
// Dormand-Prince 5(4) adaptive integrator with dense output.
//
// Seven-stage explicit Runge-Kutta pair with the FSAL property: the last stage of an
// accepted step is the first stage of the next one. The fifth-order solution is
// propagated and the embedded fourth-order solution drives step-size control.
//
// Output is sampled on a uniform evaluation grid chosen up front. Grid points that
// fall inside an accepted step are filled in with the method's fourth-order
// continuous extension, so the grid never influences where the solver steps.
//
// # References
// - Dormand, J. R., & Prince, P. J. (1980). "A family of embedded Runge-Kutta
//   formulae". Journal of Computational and Applied Mathematics, 6(1), 19-26.
// - Hairer, E., Nørsett, S. P., & Wanner, G. (1993). "Solving Ordinary Differential
//   Equations I", section II.4 (starting step size) and II.6 (dense output).
// ------------------------------------------------------------

use nalgebra::SVector;
use tracing::debug;

use crate::error::{Error, Result};

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
// A rejected step is always at least halved.
const REJECT_MAX_FACTOR: f64 = 0.5;
// Exponent for the error-based rescale, 1 / (embedded order + 1).
const ERROR_EXPONENT: f64 = -1.0 / 5.0;

const C: [f64; 6] = [1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

#[rustfmt::skip]
const A: [&[f64]; 6] = [
    &[1.0/5.0],
    &[3.0/40.0, 9.0/40.0],
    &[44.0/45.0, -56.0/15.0, 32.0/9.0],
    &[19372.0/6561.0, -25360.0/2187.0, 64448.0/6561.0, -212.0/729.0],
    &[9017.0/3168.0, -355.0/33.0, 46732.0/5247.0, 49.0/176.0, -5103.0/18656.0],
    &[35.0/384.0, 0.0, 500.0/1113.0, 125.0/192.0, -2187.0/6784.0, 11.0/84.0],
];

// Difference between the fifth and fourth order weights (7th stage included).
#[rustfmt::skip]
const E: [f64; 7] = [
    -71.0/57600.0, 0.0, 71.0/16695.0, -71.0/1920.0, 17253.0/339200.0, -22.0/525.0, 1.0/40.0,
];

// Continuous extension: y(t0 + x h) = y0 + h * sum_i k_i * sum_j P[i][j] x^(j+1)
#[rustfmt::skip]
const P: [[f64; 4]; 7] = [
    [1.0, -8048581381.0/2820520608.0, 8663915743.0/2820520608.0, -12715105075.0/11282082432.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 131558114200.0/32700410799.0, -68118460800.0/10900136933.0, 87487479700.0/32700410799.0],
    [0.0, -1754552775.0/470086768.0, 14199869525.0/1410260304.0, -10690763975.0/1880347072.0],
    [0.0, 127303824393.0/49829197408.0, -318862633887.0/49829197408.0, 701980252875.0/199316789632.0],
    [0.0, -282668133.0/205662961.0, 2019193451.0/616988883.0, -1453857185.0/822651844.0],
    [0.0, 40617522.0/29380423.0, -110615467.0/29380423.0, 69997945.0/29380423.0],
];

/// Error tolerances and step bounds for [`integrate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Lower bound on the step size. The effective floor never drops below the
    /// floating-point resolution around the current time.
    pub min_step: f64,
    pub max_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
            min_step: 0.0,
            max_step: f64::INFINITY,
        }
    }
}

impl SolverOptions {
    pub fn with_tolerances(rtol: f64, atol: f64) -> Self {
        Self {
            rtol,
            atol,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.rtol > 0.0 && self.atol > 0.0 && self.rtol.is_finite() && self.atol.is_finite()) {
            return Err(Error::config(format!(
                "solver tolerances must be positive, got rtol={} atol={}",
                self.rtol, self.atol
            )));
        }
        if !(self.min_step >= 0.0) || !(self.max_step > 0.0) || self.min_step > self.max_step {
            return Err(Error::config(format!(
                "invalid step bounds: min_step={} max_step={}",
                self.min_step, self.max_step
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: usize,
}

/// States sampled on the evaluation grid.
#[derive(Debug, Clone)]
pub struct GridSolution<const D: usize> {
    pub t: Vec<f64>,
    pub y: Vec<SVector<f64, D>>,
    pub stats: IntegrationStats,
}

/// Time of grid point `k` out of `n` over `[0, t_end]`; the last point is exact.
pub fn grid_time(k: usize, n: usize, t_end: f64) -> f64 {
    if k + 1 == n {
        t_end
    } else {
        k as f64 * t_end / (n - 1) as f64
    }
}

// One accepted step, kept around long enough to interpolate inside it.
struct AcceptedStep<'a, const D: usize> {
    t_old: f64,
    h: f64,
    y_old: &'a SVector<f64, D>,
    k: &'a [SVector<f64, D>; 7],
}

impl<const D: usize> AcceptedStep<'_, D> {
    fn interpolate(&self, t: f64) -> SVector<f64, D> {
        let x = (t - self.t_old) / self.h;

        let mut q = [SVector::<f64, D>::zeros(); 4];
        for (ki, row) in self.k.iter().zip(P.iter()) {
            for (qj, &pij) in q.iter_mut().zip(row.iter()) {
                if pij != 0.0 {
                    *qj += pij * ki;
                }
            }
        }

        // Horner form of x*q0 + x^2*q1 + x^3*q2 + x^4*q3
        let poly = (q[0] + (q[1] + (q[2] + q[3] * x) * x) * x) * x;
        self.y_old + poly * self.h
    }
}

fn rms_norm<const D: usize>(v: &SVector<f64, D>) -> f64 {
    (v.norm_squared() / D as f64).sqrt()
}

// Hairer's starting step heuristic.
fn initial_step<const D: usize, F>(
    f: &mut F,
    t0: f64,
    y0: &SVector<f64, D>,
    f0: &SVector<f64, D>,
    opts: &SolverOptions,
) -> f64
where
    F: FnMut(f64, &SVector<f64, D>) -> SVector<f64, D>,
{
    let scale = y0.map(|v| opts.atol + v.abs() * opts.rtol);
    let d0 = rms_norm(&y0.component_div(&scale));
    let d1 = rms_norm(&f0.component_div(&scale));

    let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };

    let y1 = y0 + f0 * h0;
    let f1 = f(t0 + h0, &y1);
    let d2 = rms_norm(&(f1 - f0).component_div(&scale)) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(-ERROR_EXPONENT)
    };

    let h = (100.0 * h0).min(h1);
    if h.is_finite() {
        h
    } else {
        h0
    }
}

/// Integrate `dy/dt = f(t, y)` from `t = 0` to `t_end` and sample the solution at
/// `num_eval_points` uniformly spaced times (both ends included).
///
/// Fails with [`Error::NumericalDivergence`] if the step size is driven below the
/// minimum without meeting the tolerance. Nothing is returned in that case.
pub fn integrate<const D: usize, F>(
    mut f: F,
    y0: SVector<f64, D>,
    t_end: f64,
    num_eval_points: usize,
    opts: &SolverOptions,
) -> Result<GridSolution<D>>
where
    F: FnMut(f64, &SVector<f64, D>) -> SVector<f64, D>,
{
    if !(t_end > 0.0 && t_end.is_finite()) {
        return Err(Error::config(format!("integration span must be positive, got {t_end}")));
    }
    if num_eval_points < 2 {
        return Err(Error::config(format!(
            "at least 2 evaluation points are required, got {num_eval_points}"
        )));
    }
    opts.validate()?;

    let n = num_eval_points;
    let mut out_t = Vec::with_capacity(n);
    let mut out_y = Vec::with_capacity(n);
    out_t.push(0.0);
    out_y.push(y0);
    let mut next = 1;

    let mut stats = IntegrationStats::default();
    let mut t = 0.0;
    let mut y = y0;
    let mut f0 = f(t, &y);
    stats.evaluations += 1;

    let mut h = initial_step(&mut f, t, &y, &f0, opts);
    stats.evaluations += 1;

    while t < t_end {
        let min_step = opts.min_step.max(16.0 * f64::EPSILON * t.abs().max(t_end));
        let mut step = h.min(opts.max_step);
        let mut rejected = false;

        let (h_used, t_new, y_new, k, err) = loop {
            if step < min_step || !step.is_finite() {
                debug!(t, step, min_step, "step size collapsed");
                return Err(Error::NumericalDivergence { t, step, min_step });
            }

            let remaining = t_end - t;
            let (h_try, t_new) = if step >= remaining {
                (remaining, t_end)
            } else {
                (step, t + step)
            };

            let mut k = [SVector::<f64, D>::zeros(); 7];
            k[0] = f0;
            for (s, row) in A.iter().enumerate() {
                let mut incr = SVector::<f64, D>::zeros();
                for (kj, &a) in k.iter().zip(row.iter()) {
                    incr += a * kj;
                }
                let y_stage = y + incr * h_try;
                k[s + 1] = f(t + C[s] * h_try, &y_stage);
            }
            stats.evaluations += 6;

            // The sixth row of A holds the fifth-order weights, so the state fed to
            // the seventh stage is the propagated solution.
            let mut y_new = y;
            for (kj, &a) in k.iter().zip(A[5].iter()) {
                y_new += a * h_try * kj;
            }

            let mut err_vec = SVector::<f64, D>::zeros();
            for (kj, &e) in k.iter().zip(E.iter()) {
                err_vec += e * kj;
            }
            err_vec *= h_try;
            let scale = y.zip_map(&y_new, |a, b| opts.atol + a.abs().max(b.abs()) * opts.rtol);
            let err = rms_norm(&err_vec.component_div(&scale));

            if err <= 1.0 {
                break (h_try, t_new, y_new, k, err);
            }

            stats.rejected_steps += 1;
            rejected = true;
            let factor = if err.is_finite() {
                (SAFETY * err.powf(ERROR_EXPONENT)).clamp(MIN_FACTOR, REJECT_MAX_FACTOR)
            } else {
                REJECT_MAX_FACTOR
            };
            step = h_try * factor;
        };

        stats.accepted_steps += 1;

        {
            let accepted = AcceptedStep {
                t_old: t,
                h: h_used,
                y_old: &y,
                k: &k,
            };
            while next < n {
                let tk = grid_time(next, n, t_end);
                if tk > t_new {
                    break;
                }
                let yk = if tk == t_new { y_new } else { accepted.interpolate(tk) };
                out_t.push(tk);
                out_y.push(yk);
                next += 1;
            }
        }

        let mut factor = if err == 0.0 {
            MAX_FACTOR
        } else {
            (SAFETY * err.powf(ERROR_EXPONENT)).min(MAX_FACTOR)
        };
        if rejected {
            factor = factor.min(1.0);
        }

        t = t_new;
        y = y_new;
        f0 = k[6];
        h = h_used * factor;
    }

    debug!(
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        evaluations = stats.evaluations,
        "integration finished"
    );

    Ok(GridSolution {
        t: out_t,
        y: out_y,
        stats,
    })
}
