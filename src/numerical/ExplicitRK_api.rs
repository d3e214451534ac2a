use crate::Utils::logger::save_trajectory_to_csv;
use crate::numerical::Butcher_tableaux::{ButcherTableau, RKMethod};
use crate::numerical::Lyness_problem::{DomainViolation, IVP};
use log::debug;
use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::time::Instant;
use strum_macros::Display;

/// Errors that stop a fixed-step integration
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationError {
    InvalidStepSize(f64),
    InvalidInterval { t0: f64, t_bound: f64 },
    /// the right-hand side reported a state outside its domain
    Domain(DomainViolation),
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntegrationError::InvalidStepSize(h) => {
                write!(f, "step size must be positive and finite (got {})", h)
            }
            IntegrationError::InvalidInterval { t0, t_bound } => write!(
                f,
                "integration interval [{}, {}] is empty or not finite",
                t0, t_bound
            ),
            IntegrationError::Domain(violation) => write!(f, "{}", violation),
        }
    }
}

impl std::error::Error for IntegrationError {}

impl From<DomainViolation> for IntegrationError {
    fn from(violation: DomainViolation) -> Self {
        IntegrationError::Domain(violation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum IntegrationStatus {
    Running,
    Finished,
    Failed,
}

/// Fixed-step explicit Runge-Kutta integrator driven by a Butcher tableau.
/// The last step is shortened so the integration lands exactly on the horizon.
pub struct FixedStepRK {
    tableau: ButcherTableau,
    h_step: f64,
    t_bound: f64,
    pub t: f64,
    pub y: DVector<f64>,
    status: IntegrationStatus,
    message: Option<String>,
    store_trajectory: bool,
    t_history: Vec<f64>,
    y_history: Vec<DVector<f64>>,
    n_steps: usize,
    n_rhs_evals: usize,
    t_result: DVector<f64>,
    y_result: DMatrix<f64>,
}

impl FixedStepRK {
    pub fn new(tableau: ButcherTableau, h_step: f64) -> FixedStepRK {
        FixedStepRK {
            tableau,
            h_step,
            t_bound: 0.0,
            t: 0.0,
            y: DVector::zeros(1),
            status: IntegrationStatus::Running,
            message: None,
            store_trajectory: true,
            t_history: Vec::new(),
            y_history: Vec::new(),
            n_steps: 0,
            n_rhs_evals: 0,
            t_result: DVector::zeros(1),
            y_result: DMatrix::zeros(1, 1),
        }
    }

    pub fn from_method(method: RKMethod, h_step: f64) -> FixedStepRK {
        FixedStepRK::new(method.tableau(), h_step)
    }

    /// switch off trajectory storage when only success or failure matters
    pub fn with_trajectory(mut self, store_trajectory: bool) -> Self {
        self.store_trajectory = store_trajectory;
        self
    }

    pub fn set_step(&mut self, h_step: f64) {
        self.h_step = h_step;
    }

    pub fn tableau(&self) -> &ButcherTableau {
        &self.tableau
    }

    /// reset the state to the initial data of `ivp`
    pub fn set_initial(&mut self, ivp: &IVP) -> Result<(), IntegrationError> {
        if !(self.h_step > 0.0 && self.h_step.is_finite()) {
            return Err(IntegrationError::InvalidStepSize(self.h_step));
        }
        if !(ivp.T > ivp.t0 && ivp.T.is_finite() && ivp.t0.is_finite()) {
            return Err(IntegrationError::InvalidInterval {
                t0: ivp.t0,
                t_bound: ivp.T,
            });
        }
        self.t = ivp.t0;
        self.y = ivp.u0.clone();
        self.t_bound = ivp.T;
        self.status = IntegrationStatus::Running;
        self.message = None;
        self.n_steps = 0;
        self.n_rhs_evals = 0;
        self.t_history.clear();
        self.y_history.clear();
        if self.store_trajectory {
            self.t_history.push(self.t);
            self.y_history.push(self.y.clone());
        }
        Ok(())
    }

    /// one step of size h from (t, y); every stage value goes through the right-hand side,
    /// which is where a domain violation surfaces
    fn _step_impl(&mut self, ivp: &IVP, h: f64) -> Result<(), DomainViolation> {
        let s = self.tableau.stages;
        let t = self.t;
        let mut k: Vec<DVector<f64>> = Vec::with_capacity(s);
        for i in 0..s {
            let mut acc = DVector::zeros(self.y.len());
            for j in 0..i {
                acc += self.tableau.a[(i, j)] * &k[j];
            }
            let y_stage = &self.y + h * acc;
            self.n_rhs_evals += 1;
            k.push(ivp.rhs(t + self.tableau.c[i] * h, &y_stage)?);
        }
        let mut acc = DVector::zeros(self.y.len());
        for j in 0..s {
            acc += self.tableau.b[j] * &k[j];
        }
        self.y = &self.y + h * acc;
        self.t = t + h;
        Ok(())
    }

    pub fn step(&mut self, ivp: &IVP) -> Result<(), IntegrationError> {
        if self.t >= self.t_bound {
            self.status = IntegrationStatus::Finished;
            return Ok(());
        }
        let h = if self.t + self.h_step > self.t_bound {
            self.t_bound - self.t
        } else {
            self.h_step
        };
        match self._step_impl(ivp, h) {
            Ok(()) => {
                self.n_steps += 1;
                if self.store_trajectory {
                    self.t_history.push(self.t);
                    self.y_history.push(self.y.clone());
                }
                if self.t >= self.t_bound {
                    self.status = IntegrationStatus::Finished;
                }
                Ok(())
            }
            Err(violation) => {
                self.status = IntegrationStatus::Failed;
                self.message = Some(violation.to_string());
                Err(IntegrationError::Domain(violation))
            }
        }
    }

    pub fn main_loop(&mut self, ivp: &IVP) -> Result<(), IntegrationError> {
        let start = Instant::now();
        while self.status == IntegrationStatus::Running {
            if let Err(e) = self.step(ivp) {
                debug!(
                    "{} with h = {} failed after {} steps: {}",
                    self.tableau.name, self.h_step, self.n_steps, e
                );
                return Err(e);
            }
        }
        if self.store_trajectory {
            let rows = self.y_history.len();
            let cols = self.y.len();
            let mut flat_vec: Vec<f64> = Vec::with_capacity(rows * cols);
            for vector in self.y_history.iter() {
                flat_vec.extend(vector.iter());
            }
            self.y_result = DMatrix::from_vec(cols, rows, flat_vec).transpose();
            self.t_result = DVector::from_vec(self.t_history.clone());
        }
        debug!(
            "{} with h = {}: {} steps, {} rhs evaluations, {} us",
            self.tableau.name,
            self.h_step,
            self.n_steps,
            self.n_rhs_evals,
            start.elapsed().as_micros()
        );
        Ok(())
    }

    pub fn solve(&mut self, ivp: &IVP) -> Result<(), IntegrationError> {
        self.set_initial(ivp)?;
        self.main_loop(ivp)
    }

    pub fn status(&self) -> IntegrationStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn n_rhs_evals(&self) -> usize {
        self.n_rhs_evals
    }

    pub fn get_result(&self) -> (DVector<f64>, DMatrix<f64>) {
        (self.t_result.clone(), self.y_result.clone())
    }

    pub fn save_result(&self, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
        let headers: Vec<String> = (0..self.y_result.ncols())
            .map(|i| format!("u{}", i))
            .collect();
        save_trajectory_to_csv(&self.y_result, &headers, filename, &self.t_result, "t")?;
        Ok(())
    }
}

/// integrate `ivp` with a fixed step and return the trajectory (t, y)
pub fn integrate(
    tableau: &ButcherTableau,
    ivp: &IVP,
    h: f64,
) -> Result<(DVector<f64>, DMatrix<f64>), IntegrationError> {
    let mut solver = FixedStepRK::new(tableau.clone(), h);
    solver.solve(ivp)?;
    Ok(solver.get_result())
}
