use RustedLyness::numerical::Lyness_experiment::{LynessExperiment, LynessExperimentConfig};
use std::env;
use std::error::Error;
use std::io::{self, Write};
use std::process;

/// usage: RustedLyness [task_file]
fn run() -> Result<(), Box<dyn Error>> {
    let config = match env::args().nth(1) {
        Some(path) => LynessExperimentConfig::from_task_file(&path)?,
        None => LynessExperimentConfig::default(),
    };
    config.init_logging()?;
    let mut experiment = LynessExperiment::new(config);
    experiment.solve()?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    experiment.report(&mut handle)?;
    if experiment.config().table {
        writeln!(handle, "{}", experiment.summary_table())?;
    }
    handle.flush()?;
    if let Some(ref csv) = experiment.config().csv {
        experiment.save_results_csv(csv)?;
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
