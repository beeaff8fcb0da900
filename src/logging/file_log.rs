use std::{
    fs::File,
    io::{self, Write},
    path::Path,
    sync::Mutex,
};

use log::{LevelFilter, Log, Metadata, Record};

use super::LogEntry;

/// Writes every accepted record as a JSON line to a file.
///
/// The file is truncated on creation. When it cannot be created the logger
/// stays disabled and the command still runs.
pub struct FileLog {
    target: Option<Mutex<File>>,
    max_level: LevelFilter,
}

impl FileLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let target = match File::create(path.as_ref()) {
            Ok(file) => Some(Mutex::new(file)),
            Err(err) => {
                eprintln!(
                    "Logging setup error: failed to create log file '{}': {err}",
                    path.as_ref().display()
                );
                None
            }
        };

        Self {
            target,
            max_level: LevelFilter::Trace,
        }
    }

    pub fn with_max_level(self, max_level: LevelFilter) -> Self {
        Self { max_level, ..self }
    }

    pub fn into_logger(self) -> Box<dyn Log> {
        Box::new(self)
    }

    fn write_entry(&self, record: &Record) -> Result<(), io::Error> {
        let Some(file) = self.target.as_ref() else {
            return Ok(());
        };

        let mut line = serde_json::to_string(&LogEntry::from(record))?;
        line.push('\n');

        let mut file = file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        file.write_all(line.as_bytes())
    }
}

impl Log for FileLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.target.is_some() && metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        // Best effort, a broken log file must not fail the command.
        let _ = self.write_entry(record);
    }

    fn flush(&self) {
        if let Some(Ok(mut file)) = self.target.as_ref().map(Mutex::lock) {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use log::Level;
    use tempfile::tempdir;

    use super::{super::Level as EntryLevel, *};

    #[test]
    fn test_max_level() {
        let dir = tempdir().unwrap();
        let logger = FileLog::new(dir.path().join("diskplan.log"))
            .with_max_level(LevelFilter::Info)
            .into_logger();

        assert!(logger.enabled(&Metadata::builder().level(Level::Info).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Debug).build()));
    }

    #[test]
    fn test_unwritable_target() {
        let dir = tempdir().unwrap();

        // A directory cannot be opened as a log file.
        let log = FileLog::new(dir.path());
        assert!(log.target.is_none());
        assert!(!log.enabled(&Metadata::builder().level(Level::Error).build()));

        let log = FileLog::new(dir.path().join("missing/dir/diskplan.log"));
        assert!(log.target.is_none());

        // Logging into a disabled target is a no-op.
        log.log(&Record::builder().args(format_args!("dropped")).build());
    }

    #[test]
    fn test_truncates_previous_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diskplan.log");
        fs::write(&path, "previous run\n").unwrap();

        let logger = FileLog::new(&path).into_logger();
        logger.log(
            &Record::builder()
                .args(format_args!("new run"))
                .level(Level::Info)
                .build(),
        );
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("previous run"));
        assert!(contents.contains("new run"));
    }

    #[test]
    fn test_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diskplan.log");
        let logger = FileLog::new(&path).into_logger();

        for (level, message) in [(Level::Info, "Resolving layout"), (Level::Warn, "No match")] {
            logger.log(
                &Record::builder()
                    .args(format_args!("{message}"))
                    .level(level)
                    .target("diskplan::resolver")
                    .module_path(Some("diskplan::resolver"))
                    .file(Some(file!()))
                    .line(Some(7))
                    .build(),
            );
        }
        logger.flush();

        let entries: Vec<LogEntry> = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(
            entries,
            vec![
                LogEntry {
                    level: EntryLevel::Info,
                    message: "Resolving layout".into(),
                    target: "diskplan::resolver".into(),
                    module: "diskplan::resolver".into(),
                    file: file!().into(),
                    line: 7,
                },
                LogEntry {
                    level: EntryLevel::Warn,
                    message: "No match".into(),
                    target: "diskplan::resolver".into(),
                    module: "diskplan::resolver".into(),
                    file: file!().into(),
                    line: 7,
                },
            ]
        );
    }
}
