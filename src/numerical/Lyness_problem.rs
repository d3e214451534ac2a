/// The Lyness problem: logistic growth/decay whose sign flips with sin(t)
///
///   u' = sign(sin(t)) * u * (1 - u),   t in [0, T]
///
/// Every evaluation of the right-hand side checks that the state is still inside [0, 1];
/// leaving that range is reported as an explicit `DomainViolation` value instead of a panic,
/// so callers can treat it as a signal of numerical instability.
use nalgebra::DVector;
use std::fmt;

/// slack allowed above the upper bound before the state counts as out of range
pub const UPPER_SLACK: f64 = 1e-15;
/// integration horizon of the experiment
pub const LYNESS_T: f64 = 100.0;
/// initial value stored in a freshly created problem (overwritten before every trial)
pub const LYNESS_U0: f64 = 0.49;

/// which side of [0, 1] was left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolatedBound {
    Negative,
    GreaterThanOne,
}

/// outcome of a right-hand-side evaluation that found the state out of its domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainViolation {
    pub bound: ViolatedBound,
    /// time of the offending evaluation
    pub t: f64,
    /// offending state component
    pub value: f64,
}

impl fmt::Display for DomainViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.bound {
            ViolatedBound::Negative => write!(
                f,
                "Negative value encountered (u = {:e} at t = {})",
                self.value, self.t
            ),
            ViolatedBound::GreaterThanOne => write!(
                f,
                "Value greater than 1 encountered (u = {:e} at t = {})",
                self.value, self.t
            ),
        }
    }
}

impl std::error::Error for DomainViolation {}

/// tagged outcome of a right-hand-side evaluation: derivative or out-of-domain report
pub type RhsOutcome = Result<DVector<f64>, DomainViolation>;
pub type RhsFunction = Box<dyn Fn(f64, &DVector<f64>) -> RhsOutcome>;

/// sign with sign(0) = 0 (f64::signum returns 1 for +0.0)
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// checks every component of the state against [0, 1 + UPPER_SLACK]
pub fn check_unit_interval(t: f64, u: &DVector<f64>) -> Result<(), DomainViolation> {
    for &ui in u.iter() {
        if ui < 0.0 {
            return Err(DomainViolation {
                bound: ViolatedBound::Negative,
                t,
                value: ui,
            });
        } else if ui - 1.0 > UPPER_SLACK {
            return Err(DomainViolation {
                bound: ViolatedBound::GreaterThanOne,
                t,
                value: ui,
            });
        }
    }
    Ok(())
}

/// right-hand side of the Lyness problem
pub fn lyness_rhs(t: f64, u: &DVector<f64>) -> RhsOutcome {
    check_unit_interval(t, u)?;
    let s = sign(t.sin());
    Ok(u.map(|ui| s * ui * (1.0 - ui)))
}

/// initial value problem: right-hand side, initial state, start time and horizon
pub struct IVP {
    f: RhsFunction,
    pub u0: DVector<f64>,
    pub t0: f64,
    pub T: f64,
    pub name: String,
}

impl IVP {
    pub fn new(f: RhsFunction, u0: DVector<f64>, t0: f64, T: f64, name: &str) -> IVP {
        IVP {
            f,
            u0,
            t0,
            T,
            name: name.to_string(),
        }
    }

    /// the problem every experiment runs on
    pub fn lyness() -> IVP {
        IVP::new(
            Box::new(lyness_rhs),
            DVector::from_element(1, LYNESS_U0),
            0.0,
            LYNESS_T,
            "Lyness",
        )
    }

    pub fn rhs(&self, t: f64, u: &DVector<f64>) -> RhsOutcome {
        (self.f)(t, u)
    }

    /// overwrite the (scalar) initial value before a trial
    pub fn set_u0(&mut self, u0: f64) {
        self.u0 = DVector::from_element(self.u0.len(), u0);
    }

    pub fn set_horizon(&mut self, T: f64) {
        self.T = T;
    }

    pub fn dim(&self) -> usize {
        self.u0.len()
    }
}
