/// The Lyness experiment: for every method in the list, bisect for the largest step size that keeps
/// the Lyness problem inside [0, 1] from both near-boundary initial values, then report
///
/// ```text
/// FE
/// h_obs = 0.999296875
///
/// ```
///
/// Settings can be read from a task file:
///
/// ```text
/// search
///   hmin: 0.001
///   hmax: 7.1
///   eps: 0.001
///   validate_bracket: false
/// problem
///   T: 100
///   u0: 1e-8, 0.99999999
/// methods
///   names: FE, RK44, SSP104
/// output
///   loglevel: info
///   log_file: auto
///   csv: lyness.csv
///   table: true
/// // replace the coefficients of a method: strictly lower entries of A row by row, then b
/// tableau_SSP22
///   a: 1
///   b: 0.5, 0.5
///   order: 2
/// ```
use crate::Utils::logger::{init_logger, parse_loglevel, timestamped_log_name};
use crate::Utils::task_parser::{TaskDocument, TaskError};
use crate::numerical::Butcher_tableaux::{
    ButcherTableau, MethodRegistry, RKMethod, TableauError, UnknownMethod,
};
use crate::numerical::Lyness_problem::{IVP, LYNESS_T};
use crate::numerical::step_size_search::{
    BOUNDARY_INITIAL_VALUES, BoundednessOracle, SearchConfig, SearchError, SearchResult,
    StepSizeSearch,
};
use csv::Writer;
use log::info;
use simplelog::LevelFilter;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use tabled::settings::Style;
use tabled::{Table, Tabled};

const SECTIONS: [&str; 4] = ["search", "problem", "methods", "output"];
const TABLEAU_PREFIX: &str = "tableau_";

#[derive(Debug)]
pub enum ExperimentError {
    Task(TaskError),
    UnknownMethod(UnknownMethod),
    Tableau { method: String, source: TableauError },
    Search(SearchError),
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExperimentError::Task(e) => write!(f, "{}", e),
            ExperimentError::UnknownMethod(e) => write!(f, "{}", e),
            ExperimentError::Tableau { method, source } => {
                write!(f, "invalid tableau for {}: {}", method, source)
            }
            ExperimentError::Search(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ExperimentError {}

impl From<TaskError> for ExperimentError {
    fn from(e: TaskError) -> Self {
        ExperimentError::Task(e)
    }
}

impl From<UnknownMethod> for ExperimentError {
    fn from(e: UnknownMethod) -> Self {
        ExperimentError::UnknownMethod(e)
    }
}

impl From<SearchError> for ExperimentError {
    fn from(e: SearchError) -> Self {
        ExperimentError::Search(e)
    }
}

#[derive(Debug, Clone)]
pub struct LynessExperimentConfig {
    pub methods: Vec<RKMethod>,
    /// tried in order for every step size
    pub initial_values: Vec<f64>,
    pub T: f64,
    pub search: SearchConfig,
    /// None keeps logging off
    pub loglevel: Option<String>,
    pub log_file: Option<String>,
    pub csv: Option<String>,
    pub table: bool,
    pub overrides: HashMap<RKMethod, ButcherTableau>,
}

impl Default for LynessExperimentConfig {
    fn default() -> Self {
        Self {
            methods: RKMethod::all(),
            initial_values: BOUNDARY_INITIAL_VALUES.to_vec(),
            T: LYNESS_T,
            search: SearchConfig::default(),
            loglevel: None,
            log_file: None,
            csv: None,
            table: false,
            overrides: HashMap::new(),
        }
    }
}

impl LynessExperimentConfig {
    pub fn from_task_file(path: &str) -> Result<Self, ExperimentError> {
        let doc = TaskDocument::from_file(path)?;
        Self::from_task_document(&doc)
    }

    pub fn from_task_str(input: &str) -> Result<Self, ExperimentError> {
        let doc = TaskDocument::parse(input)?;
        Self::from_task_document(&doc)
    }

    /// keys missing from the document keep their default values
    pub fn from_task_document(doc: &TaskDocument) -> Result<Self, ExperimentError> {
        let mut config = Self::default();
        for section in doc.section_names() {
            if !SECTIONS.contains(&section) && !section.starts_with(TABLEAU_PREFIX) {
                return Err(TaskError::UnknownSection(section.to_string()).into());
            }
        }

        doc.check_keys("search", &["hmin", "hmax", "eps", "validate_bracket"])?;
        if let Some(hmin) = doc.get_float("search", "hmin")? {
            config.search.hmin = hmin;
        }
        if let Some(hmax) = doc.get_float("search", "hmax")? {
            config.search.hmax = hmax;
        }
        if let Some(eps) = doc.get_float("search", "eps")? {
            config.search.eps = eps;
        }
        if let Some(validate) = doc.get_bool("search", "validate_bracket")? {
            config.search.validate_bracket = validate;
        }

        doc.check_keys("problem", &["T", "u0"])?;
        if let Some(T) = doc.get_float("problem", "T")? {
            config.T = T;
        }
        if let Some(u0) = doc.get_float_list("problem", "u0")? {
            if u0.is_empty() {
                return Err(TaskError::Invalid("problem.u0 needs at least one value".to_string()).into());
            }
            if let Some(bad) = u0.iter().find(|u| !(0.0..=1.0).contains(*u)) {
                return Err(TaskError::Invalid(format!(
                    "initial value {} is outside [0, 1]",
                    bad
                ))
                .into());
            }
            config.initial_values = u0;
        }

        doc.check_keys("methods", &["names"])?;
        if let Some(names) = doc.get_string_list("methods", "names") {
            if names.is_empty() {
                return Err(TaskError::Invalid("methods.names is empty".to_string()).into());
            }
            config.methods = names
                .iter()
                .map(|name| RKMethod::from_name(name))
                .collect::<Result<Vec<RKMethod>, UnknownMethod>>()?;
        }

        doc.check_keys("output", &["loglevel", "log_file", "csv", "table"])?;
        if let Some(level) = doc.get_string("output", "loglevel")? {
            parse_loglevel(&level).map_err(TaskError::Invalid)?;
            config.loglevel = Some(level);
        }
        if let Some(log_file) = doc.get_string("output", "log_file")? {
            config.log_file = Some(if log_file == "auto" {
                timestamped_log_name("lyness")
            } else {
                log_file
            });
        }
        config.csv = doc.get_string("output", "csv")?;
        if let Some(table) = doc.get_bool("output", "table")? {
            config.table = table;
        }

        for section in doc.section_names() {
            if let Some(name) = section.strip_prefix(TABLEAU_PREFIX) {
                let method = RKMethod::from_name(name)?;
                let tableau = Self::tableau_from_section(doc, section, method)?;
                config.overrides.insert(method, tableau);
            }
        }
        Ok(config)
    }

    fn tableau_from_section(
        doc: &TaskDocument,
        section: &str,
        method: RKMethod,
    ) -> Result<ButcherTableau, ExperimentError> {
        doc.check_keys(section, &["a", "b", "order"])?;
        let lower = doc.get_float_list(section, "a")?.unwrap_or_default();
        let b = doc
            .get_float_list(section, "b")?
            .ok_or_else(|| TaskError::Invalid(format!("{} needs weights b", section)))?;
        let order = match doc.get_integer(section, "order")? {
            Some(order) if order >= 1 => order as usize,
            Some(order) => {
                return Err(TaskError::Invalid(format!("{}.order = {} must be >= 1", section, order)).into());
            }
            None => method.tableau().order,
        };
        let name = format!("{} (user)", method.full_name());
        ButcherTableau::from_lower_entries(&lower, &b, order, &name).map_err(|source| {
            ExperimentError::Tableau {
                method: method.to_string(),
                source,
            }
        })
    }

    pub fn level(&self) -> LevelFilter {
        self.loglevel
            .as_deref()
            .and_then(|level| parse_loglevel(level).ok())
            .unwrap_or(LevelFilter::Off)
    }

    pub fn init_logging(&self) -> io::Result<()> {
        init_logger(self.level(), self.log_file.as_deref())
    }
}

/// outcome of one method's search together with the tableau it ran on
#[derive(Debug, Clone, PartialEq)]
pub struct MethodOutcome {
    pub method: RKMethod,
    pub stages: usize,
    pub order: usize,
    pub result: SearchResult,
}

impl MethodOutcome {
    /// step size per right-hand-side evaluation
    pub fn effective_step(&self) -> f64 {
        self.result.h_obs / self.stages as f64
    }
}

#[derive(Tabled)]
struct SummaryRow {
    method: String,
    stages: usize,
    order: usize,
    h_obs: String,
    #[tabled(rename = "h_obs / stages")]
    h_eff: String,
}

pub struct LynessExperiment {
    config: LynessExperimentConfig,
    registry: MethodRegistry,
    ivp: IVP,
    outcomes: Vec<MethodOutcome>,
}

impl LynessExperiment {
    pub fn new(config: LynessExperimentConfig) -> Self {
        let mut registry = MethodRegistry::new();
        for (method, tableau) in config.overrides.iter() {
            registry.insert_override(*method, tableau.clone());
        }
        let mut ivp = IVP::lyness();
        ivp.set_horizon(config.T);
        Self {
            config,
            registry,
            ivp,
            outcomes: Vec::new(),
        }
    }

    pub fn config(&self) -> &LynessExperimentConfig {
        &self.config
    }

    /// runs the searches one method after another on the same problem instance
    pub fn solve(&mut self) -> Result<&[MethodOutcome], ExperimentError> {
        self.outcomes.clear();
        let search = StepSizeSearch::with_config(self.config.search.clone());
        info!(
            "Lyness experiment: {} methods, T = {}, bracket [{}, {}], eps = {}",
            self.config.methods.len(),
            self.ivp.T,
            self.config.search.hmin,
            self.config.search.hmax,
            self.config.search.eps
        );
        for &method in self.config.methods.iter() {
            let tableau = self.registry.load(method);
            let (stages, order) = (tableau.stages, tableau.order);
            let mut oracle = BoundednessOracle::new(&method.to_string(), tableau, &mut self.ivp)
                .with_initial_values(self.config.initial_values.clone());
            let result = search.bisection(&mut oracle)?;
            self.outcomes.push(MethodOutcome {
                method,
                stages,
                order,
                result,
            });
        }
        Ok(&self.outcomes)
    }

    pub fn outcomes(&self) -> &[MethodOutcome] {
        &self.outcomes
    }

    /// three lines per method: name, "h_obs = <value>", blank line
    pub fn report<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for outcome in self.outcomes.iter() {
            writeln!(writer, "{}", outcome.result.method)?;
            writeln!(writer, "h_obs = {:?}", outcome.result.h_obs)?;
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn summary_table(&self) -> String {
        let rows: Vec<SummaryRow> = self
            .outcomes
            .iter()
            .map(|o| SummaryRow {
                method: o.result.method.clone(),
                stages: o.stages,
                order: o.order,
                h_obs: format!("{:.6}", o.result.h_obs),
                h_eff: format!("{:.6}", o.effective_step()),
            })
            .collect();
        let mut table = Table::new(&rows);
        table.with(Style::modern_rounded());
        table.to_string()
    }

    pub fn save_results_csv(&self, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = Writer::from_path(filename)?;
        writer.write_record([
            "method",
            "stages",
            "order",
            "h_obs",
            "h_upper",
            "iterations",
            "bracket",
        ])?;
        for o in self.outcomes.iter() {
            writer.write_record(&[
                o.result.method.clone(),
                o.stages.to_string(),
                o.order.to_string(),
                o.result.h_obs.to_string(),
                o.result.h_upper.to_string(),
                o.result.iterations.to_string(),
                format!("{:?}", o.result.bracket),
            ])?;
        }
        writer.flush()?;
        info!("results saved to {}", filename);
        Ok(())
    }
}

impl Default for LynessExperiment {
    fn default() -> Self {
        Self::new(LynessExperimentConfig::default())
    }
}
