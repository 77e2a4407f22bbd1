// ------------------------------------------------------------
// Evaluated pendulum motion on the evaluation grid.
// ------------------------------------------------------------

use rayon::prelude::*;
use tracing::info;

use crate::config::{InitialState, PhysicalParams, SimulationConfig};
use crate::dynamics::{self, StateVector};
use crate::error::Result;
use crate::integrator::{integrate, IntegrationStats, SolverOptions};

/// One row of a [`Trajectory`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    pub t: f64,
    pub theta1: f64,
    pub theta1_dot: f64,
    pub theta2: f64,
    pub theta2_dot: f64,
}

impl TrajectorySample {
    pub fn state(&self) -> StateVector {
        StateVector::new(self.theta1, self.theta1_dot, self.theta2, self.theta2_dot)
    }
}

/// Column-oriented, read-only solution of one run. `t` is strictly increasing from
/// `0` to the simulated duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    t: Vec<f64>,
    theta1: Vec<f64>,
    theta1_dot: Vec<f64>,
    theta2: Vec<f64>,
    theta2_dot: Vec<f64>,
}

impl Trajectory {
    fn from_states(t: Vec<f64>, states: &[StateVector]) -> Self {
        Self {
            t,
            theta1: states.iter().map(|s| s[0]).collect(),
            theta1_dot: states.iter().map(|s| s[1]).collect(),
            theta2: states.iter().map(|s| s[2]).collect(),
            theta2_dot: states.iter().map(|s| s[3]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn theta1(&self) -> &[f64] {
        &self.theta1
    }

    pub fn theta1_dot(&self) -> &[f64] {
        &self.theta1_dot
    }

    pub fn theta2(&self) -> &[f64] {
        &self.theta2
    }

    pub fn theta2_dot(&self) -> &[f64] {
        &self.theta2_dot
    }

    pub fn sample(&self, i: usize) -> TrajectorySample {
        TrajectorySample {
            t: self.t[i],
            theta1: self.theta1[i],
            theta1_dot: self.theta1_dot[i],
            theta2: self.theta2[i],
            theta2_dot: self.theta2_dot[i],
        }
    }

    pub fn samples(&self) -> impl ExactSizeIterator<Item = TrajectorySample> + '_ {
        (0..self.len()).map(move |i| self.sample(i))
    }
}

/// Integrate the pendulum from `initial` over the configured evaluation grid.
pub fn solve(
    params: &PhysicalParams,
    initial: &InitialState,
    sim: &SimulationConfig,
    options: &SolverOptions,
) -> Result<Trajectory> {
    solve_with_stats(params, initial, sim, options).map(|(traj, _)| traj)
}

pub fn solve_with_stats(
    params: &PhysicalParams,
    initial: &InitialState,
    sim: &SimulationConfig,
    options: &SolverOptions,
) -> Result<(Trajectory, IntegrationStats)> {
    params.validate()?;
    initial.validate()?;
    sim.validate()?;

    let solution = integrate(
        |_t, y: &StateVector| dynamics::derivative(params, y),
        StateVector::from(*initial),
        sim.duration,
        sim.num_eval_points,
        options,
    )?;

    info!(
        samples = solution.t.len(),
        accepted = solution.stats.accepted_steps,
        rejected = solution.stats.rejected_steps,
        "trajectory solved"
    );

    Ok((Trajectory::from_states(solution.t, &solution.y), solution.stats))
}

/// Integrate several independent pendulums concurrently. Output order follows
/// `initials`; the first failure fails the whole ensemble.
pub fn solve_ensemble(
    params: &PhysicalParams,
    initials: &[InitialState],
    sim: &SimulationConfig,
    options: &SolverOptions,
) -> Result<Vec<Trajectory>> {
    initials
        .par_iter()
        .map(|initial| solve(params, initial, sim, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn short_run() -> (PhysicalParams, InitialState, SimulationConfig) {
        (
            PhysicalParams::new(1.0, 1.0, 1.0, 1.0),
            InitialState::at_rest_degrees(60.0, 30.0),
            SimulationConfig::new(5.0, 101),
        )
    }

    #[test]
    fn sample_zero_is_the_initial_state() {
        let (p, init, sim) = short_run();
        let traj = solve(&p, &init, &sim, &SolverOptions::default()).unwrap();
        let s0 = traj.sample(0);
        assert_eq!(s0.t, 0.0);
        assert_eq!(s0.state(), StateVector::from(init));
    }

    #[test]
    fn columns_have_equal_length() {
        let (p, init, sim) = short_run();
        let traj = solve(&p, &init, &sim, &SolverOptions::default()).unwrap();
        assert_eq!(traj.len(), 101);
        assert_eq!(traj.theta1().len(), 101);
        assert_eq!(traj.theta1_dot().len(), 101);
        assert_eq!(traj.theta2().len(), 101);
        assert_eq!(traj.theta2_dot().len(), 101);
        assert_eq!(traj.samples().len(), 101);
    }

    #[test]
    fn ensemble_matches_individual_runs() {
        let (p, _, sim) = short_run();
        let initials = [
            InitialState::at_rest_degrees(90.0, 90.0),
            InitialState::at_rest_degrees(90.0, 89.0),
        ];
        let opts = SolverOptions::default();
        let ensemble = solve_ensemble(&p, &initials, &sim, &opts).unwrap();
        assert_eq!(ensemble.len(), 2);
        for (traj, init) in ensemble.iter().zip(initials.iter()) {
            assert_eq!(traj, &solve(&p, init, &sim, &opts).unwrap());
        }
    }

    #[test]
    fn invalid_parameters_fail_before_integrating() {
        let (mut p, init, sim) = short_run();
        p.l2 = 0.0;
        assert!(matches!(
            solve(&p, &init, &sim, &SolverOptions::default()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
