// ------------------------------------------------------------
// Double pendulum equations of motion
//
// State vector layout: [theta1, theta1_dot, theta2, theta2_dot]
// Angles are measured from the downward vertical. Positions use image
// orientation (y grows downward), so the bob hangs at +y.
// ------------------------------------------------------------

use nalgebra::{Vector2, Vector4};

use crate::config::{InitialState, PhysicalParams};

pub type StateVector = Vector4<f64>;

impl From<InitialState> for StateVector {
    fn from(s: InitialState) -> Self {
        Vector4::new(s.theta1, s.theta1_dot, s.theta2, s.theta2_dot)
    }
}

// Coupled rod dynamics. The 2x2 mass matrix
//   M = [[(m1+m2) L1,      m2 L2 cos d],
//        [m2 L1 cos d,     m2 L2      ]]
// has det(M) = m2 L1 L2 (m1 + m2 sin^2 d) >= m1 m2 L1 L2 > 0,
// so Cramer's rule is well conditioned for every valid parameter set,
// including theta1 == theta2.
pub fn derivative(p: &PhysicalParams, y: &StateVector) -> StateVector {
    let (theta1, theta1_dot, theta2, theta2_dot) = (y[0], y[1], y[2], y[3]);

    let delta = theta1 - theta2;
    let (sin_d, cos_d) = delta.sin_cos();
    let m_sum = p.m1 + p.m2;

    let a11 = m_sum * p.l1;
    let a12 = p.m2 * p.l2 * cos_d;
    let a21 = p.m2 * p.l1 * cos_d;
    let a22 = p.m2 * p.l2;

    let rhs1 = -p.m2 * p.l2 * theta2_dot * theta2_dot * sin_d - m_sum * p.g * theta1.sin();
    let rhs2 = p.m2 * p.l1 * theta1_dot * theta1_dot * sin_d - p.m2 * p.g * theta2.sin();

    let det = a11 * a22 - a12 * a21;
    let theta1_ddot = (rhs1 * a22 - a12 * rhs2) / det;
    let theta2_ddot = (a11 * rhs2 - a21 * rhs1) / det;

    Vector4::new(theta1_dot, theta1_ddot, theta2_dot, theta2_ddot)
}

/// Determinant of the mass matrix for a given angle difference.
pub fn mass_matrix_determinant(p: &PhysicalParams, delta: f64) -> f64 {
    let sin_d = delta.sin();
    p.m2 * p.l1 * p.l2 * (p.m1 + p.m2 * sin_d * sin_d)
}

/// Elbow and tip offsets (meters) from the fixed hinge.
pub fn positions(p: &PhysicalParams, theta1: f64, theta2: f64) -> (Vector2<f64>, Vector2<f64>) {
    let elbow = p.l1 * Vector2::new(theta1.sin(), theta1.cos());
    let tip = elbow + p.l2 * Vector2::new(theta2.sin(), theta2.cos());
    (elbow, tip)
}

// Kinetic + potential energy, potential measured from the fixed hinge.
pub fn total_energy(p: &PhysicalParams, y: &StateVector) -> f64 {
    let (theta1, w1, theta2, w2) = (y[0], y[1], y[2], y[3]);
    let m_sum = p.m1 + p.m2;

    let kinetic = 0.5 * m_sum * p.l1 * p.l1 * w1 * w1
        + 0.5 * p.m2 * p.l2 * p.l2 * w2 * w2
        + p.m2 * p.l1 * p.l2 * w1 * w2 * (theta1 - theta2).cos();
    let potential = -m_sum * p.g * p.l1 * theta1.cos() - p.m2 * p.g * p.l2 * theta2.cos();

    kinetic + potential
}
