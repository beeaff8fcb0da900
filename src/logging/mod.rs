use serde::{Deserialize, Serialize};

pub(super) mod file_log;
pub(super) mod multilog;

/// One line of the JSON log file written with `--log-file`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct LogEntry {
    pub level: Level,
    pub message: String,
    pub target: String,
    pub module: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl From<log::Level> for Level {
    fn from(value: log::Level) -> Self {
        match value {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl From<&log::Record<'_>> for LogEntry {
    fn from(record: &log::Record) -> Self {
        Self {
            level: record.level().into(),
            message: record.args().to_string(),
            target: record.target().to_owned(),
            module: record.module_path().unwrap_or_default().to_owned(),
            file: record.file().unwrap_or_default().to_owned(),
            line: record.line().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_log_entry() {
        let entry = LogEntry::from(
            &log::Record::builder()
                .args(format_args!("Search for drive #{} matched {} device(s)", 0, 2))
                .level(log::Level::Debug)
                .target("diskplan::resolver")
                .module_path(Some("diskplan::resolver::search"))
                .file(Some("src/resolver/search.rs"))
                .line(Some(12))
                .build(),
        );

        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "level": "debug",
                "message": "Search for drive #0 matched 2 device(s)",
                "target": "diskplan::resolver",
                "module": "diskplan::resolver::search",
                "file": "src/resolver/search.rs",
                "line": 12
            })
        );
    }

    #[test]
    fn test_log_entry_without_location() {
        let entry = LogEntry::from(
            &log::Record::builder()
                .args(format_args!("no location"))
                .level(log::Level::Warn)
                .build(),
        );

        assert_eq!(entry.level, Level::Warn);
        assert_eq!(entry.module, "");
        assert_eq!(entry.file, "");
        assert_eq!(entry.line, 0);
    }
}
