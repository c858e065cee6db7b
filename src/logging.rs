//! File sink for the `log` facade. The terminal belongs to the game, so logs go to a file or nowhere.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("cannot open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("logger already installed: {0}")]
    Install(#[from] log::SetLoggerError),
}

pub struct FileLogger {
    out: Mutex<BufWriter<File>>,
    level: LevelFilter,
    start: Instant,
}

impl FileLogger {
    pub fn create(path: &Path, level: LevelFilter) -> Result<Self, LogError> {
        let file = File::create(path)?;
        Ok(Self {
            out: Mutex::new(BufWriter::new(file)),
            level,
            start: Instant::now(),
        })
    }
}

fn format_line(elapsed_ms: u128, record: &Record) -> String {
    format!(
        "{:>8}ms {:<5} {}: {}",
        elapsed_ms,
        record.level(),
        record.target(),
        record.args()
    )
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(self.start.elapsed().as_millis(), record);
        // Write and flush failures are dropped: there is no other channel to report them on.
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
        }
    }

    fn flush(&self) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.flush();
        }
    }
}

/// Install the file logger as the global logger.
pub fn init(path: &Path, level: LevelFilter) -> Result<(), LogError> {
    let logger = FileLogger::create(path, level)?;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn line_format() {
        let line = format_line(
            42,
            &Record::builder()
                .args(format_args!("cleared {} line(s)", 2))
                .level(Level::Debug)
                .target("johnnymino::game")
                .build(),
        );
        assert_eq!(line, "      42ms DEBUG johnnymino::game: cleared 2 line(s)");
    }

    #[test]
    fn writes_enabled_records_only() {
        let path = std::env::temp_dir().join(format!("johnnymino-log-{}.txt", std::process::id()));
        let logger = FileLogger::create(&path, LevelFilter::Info).unwrap();
        logger.log(&Record::builder().args(format_args!("kept")).level(Level::Info).target("t").build());
        logger.log(&Record::builder().args(format_args!("dropped")).level(Level::Trace).target("t").build());
        logger.flush();

        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(text.contains("INFO  t: kept"));
        assert!(!text.contains("dropped"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let path = std::env::temp_dir().join("johnnymino-no-such-dir").join("log.txt");
        assert!(matches!(FileLogger::create(&path, LevelFilter::Info), Err(LogError::Io(_))));
    }
}
