use chrono::Local;
use csv::Writer;
use nalgebra::{DMatrix, DVector};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;
use std::io;

/// maps "off"/"none", "error", "warn", "info", "debug" to a level filter
pub fn parse_loglevel(level: &str) -> Result<LevelFilter, String> {
    match level.trim().to_lowercase().as_str() {
        "off" | "none" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        other => Err(format!(
            "loglevel must be off, none, error, warn, info or debug (got {})",
            other
        )),
    }
}

/// "<prefix>_YYYY-MM-DD_HH-MM-SS.log"
pub fn timestamped_log_name(prefix: &str) -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("{}_{}.log", prefix, date_and_time)
}

/// Terminal logger on stderr (stdout carries the report) plus an optional file logger.
/// A log file that cannot be created is an error; a second successful call is a no-op
/// since the global logger can only be set once.
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) -> io::Result<()> {
    if level == LevelFilter::Off {
        return Ok(());
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));
    if let Some(filename) = log_file {
        let file = File::create(filename).map_err(|e| {
            io::Error::new(e.kind(), format!("cannot create log file {}: {}", filename, e))
        })?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    let _ = CombinedLogger::init(loggers);
    Ok(())
}

/// writes `arg` column followed by one column per matrix column
pub fn save_trajectory_to_csv(
    matrix: &DMatrix<f64>,
    headers: &[String],
    filename: &str,
    x_mesh: &DVector<f64>,
    arg: &str,
) -> io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);

    let mut headers_with_x = Vec::with_capacity(headers.len() + 1);
    headers_with_x.push(arg.to_string());
    headers_with_x.extend(headers.iter().cloned());
    writer.write_record(&headers_with_x)?;

    for (i, row) in matrix.row_iter().enumerate() {
        let mut row_data = Vec::with_capacity(row.len() + 1);
        row_data.push(x_mesh[i].to_string());
        row_data.extend(row.iter().map(|&val| val.to_string()));
        writer.write_record(&row_data)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests_logger {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_loglevel() {
        assert_eq!(parse_loglevel("debug"), Ok(LevelFilter::Debug));
        assert_eq!(parse_loglevel(" Info "), Ok(LevelFilter::Info));
        assert_eq!(parse_loglevel("none"), Ok(LevelFilter::Off));
        assert_eq!(parse_loglevel("off"), Ok(LevelFilter::Off));
        assert!(parse_loglevel("verbose").is_err());
    }

    #[test]
    fn test_timestamped_log_name() {
        let name = timestamped_log_name("lyness");
        assert!(name.starts_with("lyness_"));
        assert!(name.ends_with(".log"));
        // lyness_YYYY-MM-DD_HH-MM-SS.log
        assert_eq!(name.len(), "lyness_".len() + 19 + ".log".len());
    }

    #[test]
    fn test_init_logger_reports_unwritable_log_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("lyness.log");
        let err = init_logger(LevelFilter::Info, path.to_str()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().starts_with("cannot create log file"));
        assert!(!path.exists());
        // logging switched off never touches the file system
        assert!(init_logger(LevelFilter::Off, path.to_str()).is_ok());
    }

    #[test]
    fn test_save_trajectory_to_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traj.csv");
        let t = DVector::from_vec(vec![0.0, 0.5, 1.0]);
        let y = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 1.5, 2.5, 2.0, 3.0]);
        let headers = vec!["a".to_string(), "b".to_string()];
        save_trajectory_to_csv(&y, &headers, path.to_str().unwrap(), &t, "t").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["t,a,b", "0,1,2", "0.5,1.5,2.5", "1,2,3"]);
    }
}
