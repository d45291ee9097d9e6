use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON-lines event log for one batch. Writes to `path` when set, stderr otherwise.
/// Logging failures never surface to the caller.
#[derive(Debug, Clone, Default)]
pub struct BatchLog {
    path: Option<PathBuf>,
}

impl BatchLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn to_file(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, event: &str, message: &str) {
        self.append("info", event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        self.append("warn", event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        self.append("error", event, message);
    }

    fn append(&self, level: &str, event: &str, message: &str) {
        let payload = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": level,
            "event": event,
            "message": message,
        });
        let Ok(line) = serde_json::to_string(&payload) else {
            return;
        };

        let Some(path) = &self.path else {
            eprintln!("{line}");
            return;
        };
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}
