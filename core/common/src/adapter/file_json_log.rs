//! Log 実装: JSONL ファイル追記・stderr・何もしない
//!
//! ファイルログは利用者向けの通知とは別チャネル。stderr 版は -v 指定時の調査用。

use crate::error::Error;
use crate::ports::outbound::{Log, LogLevel, LogRecord};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// ファイルへ JSONL を追記する Log 実装
pub struct FileJsonLog {
    path: PathBuf,
    // 同一プロセス内の書き込みを 1 行単位で直列化する
    lock: Mutex<()>,
}

impl FileJsonLog {
    /// 親ディレクトリが無ければ初回書き込み時に作成する。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Log for FileJsonLog {
    fn log(&self, record: &LogRecord) -> Result<(), Error> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::io_msg("log lock poisoned"))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// stderr に 1 行ずつ人間向けに出す Log 実装
#[derive(Debug, Clone)]
pub struct StderrLog {
    max_level: LogLevel,
}

impl StderrLog {
    /// `max_level` より詳細なレコードは捨てる
    pub fn new(max_level: LogLevel) -> Self {
        Self { max_level }
    }
}

/// stderr 用の 1 行表現
pub fn format_human(record: &LogRecord) -> String {
    let mut line = format!("[{}] {}", record.level.as_str(), record.message);
    if let Some(fields) = &record.fields {
        for (k, v) in fields {
            match v {
                serde_json::Value::String(s) => line.push_str(&format!(" {}={}", k, s)),
                other => line.push_str(&format!(" {}={}", k, other)),
            }
        }
    }
    line
}

impl Log for StderrLog {
    fn log(&self, record: &LogRecord) -> Result<(), Error> {
        if record.level <= self.max_level {
            eprintln!("{}", format_human(record));
        }
        Ok(())
    }
}

/// 複数の Log に同じレコードを流す。個々の失敗は無視する。
pub struct TeeLog {
    sinks: Vec<Box<dyn Log>>,
}

impl TeeLog {
    pub fn new(sinks: Vec<Box<dyn Log>>) -> Self {
        Self { sinks }
    }
}

impl Log for TeeLog {
    fn log(&self, record: &LogRecord) -> Result<(), Error> {
        for sink in &self.sinks {
            let _ = sink.log(record);
        }
        Ok(())
    }
}

/// 何も出力しない Log 実装
#[derive(Debug, Clone, Default)]
pub struct NoopLog;

impl Log for NoopLog {
    fn log(&self, _record: &LogRecord) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_noop_log() {
        assert!(NoopLog.log(&LogRecord::new(LogLevel::Info, "test")).is_ok());
    }

    #[test]
    fn test_file_json_log_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/chatterbox.jsonl");
        let log = FileJsonLog::new(&path);
        log.log(&LogRecord::new(LogLevel::Info, "session created").layer("session"))
            .unwrap();
        log.log(&LogRecord::new(LogLevel::Warn, "backend call failed").field("status", 400))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["message"], "session created");
        assert_eq!(first["layer"], "session");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["level"], "warn");
        assert_eq!(second["fields"]["status"], 400);
    }

    #[test]
    fn test_format_human() {
        let rec = LogRecord::new(LogLevel::Info, "backend selected")
            .field("backend", "phi3")
            .field("usable", true);
        assert_eq!(
            format_human(&rec),
            "[info] backend selected backend=phi3 usable=true"
        );
    }

    #[test]
    fn test_tee_log_ignores_failing_sink() {
        struct Failing;
        impl Log for Failing {
            fn log(&self, _record: &LogRecord) -> Result<(), Error> {
                Err(Error::io_msg("disk full"))
            }
        }
        let tee = TeeLog::new(vec![Box::new(Failing), Box::new(NoopLog)]);
        assert!(tee.log(&LogRecord::new(LogLevel::Error, "x")).is_ok());
    }
}
