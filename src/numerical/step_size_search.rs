use crate::numerical::Butcher_tableaux::{ButcherTableau, RKMethod};
use crate::numerical::ExplicitRK_api::{FixedStepRK, IntegrationError};
use crate::numerical::Lyness_problem::{DomainViolation, IVP};
use log::{debug, info, warn};
use std::fmt;

/// initial values tried by the boundedness oracle, in order
pub const BOUNDARY_INITIAL_VALUES: [f64; 2] = [1e-8, 1.0 - 1e-8];

/// Error types of the step size search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    InvalidBracket { hmin: f64, hmax: f64 },
    InvalidTolerance(f64),
    /// the lower end of the bracket already violates the invariant
    LowerBoundUnstable { hmin: f64 },
    /// the integration failed for a reason other than leaving [0, 1]
    Integration(IntegrationError),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SearchError::InvalidBracket { hmin, hmax } => write!(
                f,
                "Invalid bracket [{}, {}]: need 0 < hmin < hmax",
                hmin, hmax
            ),
            SearchError::InvalidTolerance(eps) => {
                write!(f, "Invalid tolerance {}: must be positive", eps)
            }
            SearchError::LowerBoundUnstable { hmin } => {
                write!(f, "Lower bracket bound hmin = {} is already unstable", hmin)
            }
            SearchError::Integration(e) => write!(f, "Integration failed: {}", e),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<IntegrationError> for SearchError {
    fn from(e: IntegrationError) -> Self {
        SearchError::Integration(e)
    }
}

/// which initial value broke the invariant and how
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instability {
    pub u0: f64,
    pub violation: DomainViolation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Stable,
    /// detail is None for oracles that only know the answer, not the cause
    Unstable(Option<Instability>),
}

impl Verdict {
    pub fn is_stable(&self) -> bool {
        matches!(self, Verdict::Stable)
    }
}

//////////////////////////////////TRAITS AND IMPLEMENTATIONS/////////////////////////////////
/// Trait for anything that can tell whether a step size h is stable
pub trait StabilityOracle {
    fn query(&mut self, h: f64) -> Result<Verdict, SearchError>;

    /// name reported in the search result
    fn name(&self) -> &str {
        "unnamed_oracle"
    }
}

/// Integrates the problem with a fixed step from every boundary initial value;
/// stable iff no right-hand-side evaluation left [0, 1]. Stops at the first failing initial value.
pub struct BoundednessOracle<'a> {
    name: String,
    solver: FixedStepRK,
    ivp: &'a mut IVP,
    initial_values: Vec<f64>,
    n_queries: usize,
}

impl<'a> BoundednessOracle<'a> {
    pub fn new(name: &str, tableau: ButcherTableau, ivp: &'a mut IVP) -> Self {
        Self {
            name: name.to_string(),
            // 1.0 is a placeholder, every query sets its own step
            solver: FixedStepRK::new(tableau, 1.0).with_trajectory(false),
            ivp,
            initial_values: BOUNDARY_INITIAL_VALUES.to_vec(),
            n_queries: 0,
        }
    }

    pub fn for_method(method: RKMethod, ivp: &'a mut IVP) -> Self {
        Self::new(&method.to_string(), method.tableau(), ivp)
    }

    pub fn with_initial_values(mut self, initial_values: Vec<f64>) -> Self {
        self.initial_values = initial_values;
        self
    }

    pub fn initial_values(&self) -> &[f64] {
        &self.initial_values
    }

    pub fn n_queries(&self) -> usize {
        self.n_queries
    }
}

impl<'a> StabilityOracle for BoundednessOracle<'a> {
    fn query(&mut self, h: f64) -> Result<Verdict, SearchError> {
        self.n_queries += 1;
        self.solver.set_step(h);
        for &u0 in self.initial_values.iter() {
            self.ivp.set_u0(u0);
            match self.solver.solve(self.ivp) {
                Ok(()) => {}
                Err(IntegrationError::Domain(violation)) => {
                    return Ok(Verdict::Unstable(Some(Instability { u0, violation })));
                }
                Err(e) => return Err(SearchError::Integration(e)),
            }
        }
        Ok(Verdict::Stable)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Simple oracle wrapper for closures returning true for a stable step
pub struct ClosureOracle<F>
where
    F: FnMut(f64) -> bool,
{
    func: F,
    name: String,
}

impl<F> ClosureOracle<F>
where
    F: FnMut(f64) -> bool,
{
    pub fn new(func: F, name: &str) -> Self {
        Self {
            func,
            name: name.to_string(),
        }
    }
}

impl<F> StabilityOracle for ClosureOracle<F>
where
    F: FnMut(f64) -> bool,
{
    fn query(&mut self, h: f64) -> Result<Verdict, SearchError> {
        if (self.func)(h) {
            Ok(Verdict::Stable)
        } else {
            Ok(Verdict::Unstable(None))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

///////////////////////////////////////////SETTERS AND GETTERS///////////////////////////////////////////
/// Configuration of the bisection search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub hmin: f64,
    pub hmax: f64,
    pub eps: f64,
    /// query both bracket ends before bisecting
    pub validate_bracket: bool,
    pub record_history: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hmin: 0.001,
            hmax: 7.1,
            eps: 0.001,
            validate_bracket: false,
            record_history: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketStatus {
    /// bracket ends were presumed, not queried
    Unchecked,
    Verified,
    /// hmax itself was stable; the result is hmax
    StableAtUpperBound,
}

/// one bisection iteration: the queried step and the bracket after the update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStep {
    pub iteration: usize,
    pub h: f64,
    pub stable: bool,
    pub hmin: f64,
    pub hmax: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub method: String,
    /// largest step found stable (lower end of the final bracket)
    pub h_obs: f64,
    /// upper end of the final bracket
    pub h_upper: f64,
    pub iterations: usize,
    pub bracket: BracketStatus,
    pub history: Vec<SearchStep>,
}

/// number of halvings needed to shrink the bracket below eps
pub fn iteration_bound(config: &SearchConfig) -> usize {
    let width = config.hmax - config.hmin;
    if width <= config.eps {
        return 0;
    }
    (width / config.eps).log2().ceil() as usize
}

/// Bisection search for the largest stable step size
pub struct StepSizeSearch {
    config: SearchConfig,
}

impl StepSizeSearch {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn set_bracket(&mut self, hmin: f64, hmax: f64) {
        self.config.hmin = hmin;
        self.config.hmax = hmax;
    }

    pub fn set_tolerance(&mut self, eps: f64) {
        self.config.eps = eps;
    }

    pub fn set_validate_bracket(&mut self, validate_bracket: bool) {
        self.config.validate_bracket = validate_bracket;
    }

    pub fn set_record_history(&mut self, record_history: bool) {
        self.config.record_history = record_history;
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn check_config(&self) -> Result<(), SearchError> {
        let SearchConfig {
            hmin, hmax, eps, ..
        } = self.config;
        if !(hmin > 0.0 && hmax > hmin && hmax.is_finite()) {
            return Err(SearchError::InvalidBracket { hmin, hmax });
        }
        if !(eps > 0.0 && eps.is_finite()) {
            return Err(SearchError::InvalidTolerance(eps));
        }
        Ok(())
    }

    /// shrink [hmin, hmax] by halving until it is no wider than eps; hmin is the answer
    pub fn bisection<O>(&self, oracle: &mut O) -> Result<SearchResult, SearchError>
    where
        O: StabilityOracle,
    {
        self.check_config()?;
        let mut hmin = self.config.hmin;
        let mut hmax = self.config.hmax;
        let mut bracket = BracketStatus::Unchecked;

        if self.config.validate_bracket {
            if !oracle.query(hmin)?.is_stable() {
                return Err(SearchError::LowerBoundUnstable { hmin });
            }
            if oracle.query(hmax)?.is_stable() {
                warn!(
                    "{}: upper bound hmax = {} is stable, the critical step lies beyond the bracket",
                    oracle.name(),
                    hmax
                );
                return Ok(SearchResult {
                    method: oracle.name().to_string(),
                    h_obs: hmax,
                    h_upper: hmax,
                    iterations: 0,
                    bracket: BracketStatus::StableAtUpperBound,
                    history: Vec::new(),
                });
            }
            bracket = BracketStatus::Verified;
        }

        let mut iterations = 0;
        let mut history = Vec::new();
        while hmax - hmin > self.config.eps {
            let h = (hmax + hmin) / 2.0;
            let verdict = oracle.query(h)?;
            match verdict {
                Verdict::Stable => hmin = h,
                Verdict::Unstable(_) => hmax = h,
            }
            iterations += 1;
            if let Verdict::Unstable(Some(instability)) = verdict {
                debug!(
                    "{} iteration {}: h = {} unstable from u0 = {:e} ({})",
                    oracle.name(),
                    iterations,
                    h,
                    instability.u0,
                    instability.violation
                );
            } else {
                debug!(
                    "{} iteration {}: h = {} {}, bracket = [{}, {}]",
                    oracle.name(),
                    iterations,
                    h,
                    if verdict.is_stable() { "stable" } else { "unstable" },
                    hmin,
                    hmax
                );
            }
            if self.config.record_history {
                history.push(SearchStep {
                    iteration: iterations,
                    h,
                    stable: verdict.is_stable(),
                    hmin,
                    hmax,
                });
            }
        }
        info!(
            "{}: h_obs = {} after {} iterations",
            oracle.name(),
            hmin,
            iterations
        );
        Ok(SearchResult {
            method: oracle.name().to_string(),
            h_obs: hmin,
            h_upper: hmax,
            iterations,
            bracket,
            history,
        })
    }
}

impl Default for StepSizeSearch {
    fn default() -> Self {
        Self::new()
    }
}

/// largest positivity preserving step of `tableau` on `ivp`
pub fn critical_step_size_for(
    name: &str,
    tableau: ButcherTableau,
    ivp: &mut IVP,
    config: &SearchConfig,
) -> Result<SearchResult, SearchError> {
    let mut oracle = BoundednessOracle::new(name, tableau, ivp);
    StepSizeSearch::with_config(config.clone()).bisection(&mut oracle)
}

pub fn critical_step_size(
    method: RKMethod,
    ivp: &mut IVP,
    config: &SearchConfig,
) -> Result<SearchResult, SearchError> {
    critical_step_size_for(&method.to_string(), method.tableau(), ivp, config)
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_step_size_search {
    use super::*;
    use crate::numerical::Lyness_problem::ViolatedBound;
    use approx::assert_relative_eq;

    #[test]
    fn test_iteration_bound() {
        assert_eq!(iteration_bound(&SearchConfig::default()), 13);
        let config = SearchConfig {
            hmin: 0.0,
            hmax: 1.0,
            eps: 0.25,
            ..SearchConfig::default()
        };
        assert_eq!(iteration_bound(&config), 2);
        let config = SearchConfig {
            hmin: 1.0,
            hmax: 1.0005,
            ..SearchConfig::default()
        };
        assert_eq!(iteration_bound(&config), 0);
    }

    #[test]
    fn test_bisection_with_threshold_oracle() {
        let threshold = 2.5;
        let mut oracle = ClosureOracle::new(|h| h <= threshold, "threshold");
        let mut search = StepSizeSearch::new();
        search.set_record_history(true);
        let result = search.bisection(&mut oracle).unwrap();
        assert_eq!(result.method, "threshold");
        assert_eq!(result.iterations, 13);
        assert_eq!(result.bracket, BracketStatus::Unchecked);
        assert!(result.h_obs <= threshold && threshold < result.h_upper);
        assert!(result.h_upper - result.h_obs <= 0.001);
        assert_eq!(result.history.len(), 13);
        // bracket invariant holds after every iteration
        let mut width = 7.1 - 0.001;
        for step in result.history.iter() {
            assert!(step.hmin <= threshold && threshold < step.hmax);
            assert_relative_eq!(step.hmax - step.hmin, width / 2.0, epsilon = 1e-12);
            width = step.hmax - step.hmin;
            assert_eq!(step.stable, step.h <= threshold);
        }
    }

    #[test]
    fn test_bisection_is_idempotent() {
        let search = StepSizeSearch::new();
        let first = search
            .bisection(&mut ClosureOracle::new(|h| h < 0.731, "mid"))
            .unwrap();
        let second = search
            .bisection(&mut ClosureOracle::new(|h| h < 0.731, "mid"))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_query_count_matches_iterations() {
        let mut calls = 0;
        let result = {
            let mut oracle = ClosureOracle::new(
                |h| {
                    calls += 1;
                    h < 1.0
                },
                "counted",
            );
            StepSizeSearch::new().bisection(&mut oracle).unwrap()
        };
        assert_eq!(calls, result.iterations);
        assert!(calls <= iteration_bound(&SearchConfig::default()));
    }

    #[test]
    fn test_unchecked_bracket_returns_presumed_bounds() {
        // nothing is stable: the search collapses onto the unchecked lower bound
        let result = StepSizeSearch::new()
            .bisection(&mut ClosureOracle::new(|_| false, "never"))
            .unwrap();
        assert_eq!(result.h_obs, 0.001);
        // everything is stable: the search climbs to just below hmax
        let result = StepSizeSearch::new()
            .bisection(&mut ClosureOracle::new(|_| true, "always"))
            .unwrap();
        assert_eq!(result.h_upper, 7.1);
        assert!(7.1 - result.h_obs <= 0.001);
    }

    #[test]
    fn test_validated_bracket() {
        let mut search = StepSizeSearch::new();
        search.set_validate_bracket(true);

        let result = search
            .bisection(&mut ClosureOracle::new(|h| h < 3.0, "verified"))
            .unwrap();
        assert_eq!(result.bracket, BracketStatus::Verified);
        assert!(result.h_obs < 3.0 && result.h_upper >= 3.0);

        let err = search
            .bisection(&mut ClosureOracle::new(|_| false, "never"))
            .unwrap_err();
        assert_eq!(err, SearchError::LowerBoundUnstable { hmin: 0.001 });

        let result = search
            .bisection(&mut ClosureOracle::new(|_| true, "always"))
            .unwrap();
        assert_eq!(result.bracket, BracketStatus::StableAtUpperBound);
        assert_eq!(result.h_obs, 7.1);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_invalid_configuration() {
        let mut search = StepSizeSearch::new();
        search.set_bracket(2.0, 1.0);
        let err = search
            .bisection(&mut ClosureOracle::new(|_| true, "x"))
            .unwrap_err();
        assert_eq!(err, SearchError::InvalidBracket { hmin: 2.0, hmax: 1.0 });

        let mut search = StepSizeSearch::new();
        search.set_tolerance(0.0);
        let err = search
            .bisection(&mut ClosureOracle::new(|_| true, "x"))
            .unwrap_err();
        assert_eq!(err, SearchError::InvalidTolerance(0.0));
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn test_boundedness_oracle_forward_euler() {
        let mut ivp = IVP::lyness();
        let mut oracle = BoundednessOracle::for_method(RKMethod::FE, &mut ivp);
        assert_eq!(oracle.name(), "FE");
        assert!(oracle.query(0.9).unwrap().is_stable());
        match oracle.query(1.05).unwrap() {
            Verdict::Unstable(Some(instability)) => {
                assert_eq!(instability.u0, 1e-8);
                assert_eq!(instability.violation.bound, ViolatedBound::Negative);
            }
            other => panic!("expected instability, got {:?}", other),
        }
        assert_eq!(oracle.n_queries(), 2);
        drop(oracle);
        // the failing trial was the first one; the second initial value was never tried
        assert_eq!(ivp.u0[0], 1e-8);
    }

    #[test]
    fn test_stable_query_tries_every_initial_value() {
        let mut ivp = IVP::lyness();
        {
            let mut oracle = BoundednessOracle::for_method(RKMethod::SSP33, &mut ivp);
            assert_eq!(oracle.initial_values(), &[1e-8, 1.0 - 1e-8]);
            assert!(oracle.query(0.5).unwrap().is_stable());
        }
        assert_eq!(ivp.u0[0], 1.0 - 1e-8);
    }

    #[test]
    fn test_critical_step_size_forward_euler() {
        let mut ivp = IVP::lyness();
        let result = critical_step_size(RKMethod::FE, &mut ivp, &SearchConfig::default()).unwrap();
        assert_eq!(result.method, "FE");
        assert_eq!(result.iterations, 13);
        assert!(result.h_obs >= 0.001 && result.h_obs <= 7.1);
        assert!(result.h_obs > 0.998 && result.h_obs < 1.0002);
        assert!(result.h_upper > 0.9995);
    }

    #[test]
    fn test_critical_step_size_ssp104_and_rk44() {
        let mut ivp = IVP::lyness();
        let config = SearchConfig::default();
        let ssp104 = critical_step_size(RKMethod::SSP104, &mut ivp, &config).unwrap();
        assert_relative_eq!(ssp104.h_obs, 6.0, epsilon = 1.5e-3);
        let rk44 = critical_step_size(RKMethod::RK44, &mut ivp, &config).unwrap();
        assert!(rk44.h_obs > 1.234 && rk44.h_obs < 1.238);
        // the problem instance is reusable across searches
        let again = critical_step_size(RKMethod::SSP104, &mut ivp, &config).unwrap();
        assert_eq!(ssp104, again);
    }

    #[test]
    fn test_bracket_endpoints_on_lyness() {
        let mut ivp = IVP::lyness();
        let config = SearchConfig {
            validate_bracket: true,
            ..SearchConfig::default()
        };
        let result = critical_step_size(RKMethod::Heun33, &mut ivp, &config).unwrap();
        assert_eq!(result.bracket, BracketStatus::Verified);
        assert!(result.h_obs > 0.911 && result.h_obs < 0.914);
    }
}
