/// the Lyness test problem u' = sign(sin t) u (1 - u) with its domain check
pub mod Lyness_problem;
/// Butcher tableaux of the explicit Runge-Kutta methods and the method registry
/// Example#1
/// ```
/// use RustedLyness::numerical::Butcher_tableaux::RKMethod;
/// let rk4 = RKMethod::from_name("RK44").unwrap().tableau();
/// assert_eq!(rk4.stages, 4);
/// assert!(rk4.satisfies_order(4, 1e-14));
/// ```
pub mod Butcher_tableaux;
/// fixed-step explicit Runge-Kutta integrator
/// Example#1
/// ```
/// use RustedLyness::numerical::Butcher_tableaux::RKMethod;
/// use RustedLyness::numerical::ExplicitRK_api::FixedStepRK;
/// use RustedLyness::numerical::Lyness_problem::IVP;
/// let mut ivp = IVP::lyness();
/// ivp.set_u0(0.5);
/// let mut solver = FixedStepRK::from_method(RKMethod::SSP33, 0.1);
/// solver.solve(&ivp).unwrap();
/// let (t, y) = solver.get_result();
/// assert_eq!(t[t.len() - 1], 100.0);
/// assert!(y.iter().all(|u| *u >= 0.0 && *u <= 1.0));
/// ```
pub mod ExplicitRK_api;
/// bisection search for the largest step size that keeps the solution in [0, 1]
pub mod step_size_search;
/// experiment driver: configuration, task files, report
/// Example#1
/// ```
/// use RustedLyness::numerical::Butcher_tableaux::RKMethod;
/// use RustedLyness::numerical::Lyness_experiment::{LynessExperiment, LynessExperimentConfig};
/// let config = LynessExperimentConfig {
///     methods: vec![RKMethod::FE],
///     ..LynessExperimentConfig::default()
/// };
/// let mut experiment = LynessExperiment::new(config);
/// experiment.solve().unwrap();
/// let mut out = Vec::new();
/// experiment.report(&mut out).unwrap();
/// assert!(String::from_utf8(out).unwrap().starts_with("FE\nh_obs = "));
/// ```
pub mod Lyness_experiment;
