use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn wizard_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/wizard.log")
}

pub fn append_wizard_log(path: &Path, level: &str, event: &str, message: &str) {
    let payload = serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "level": level,
        "event": event,
        "message": message,
    });

    let Ok(line) = serde_json::to_string(&payload) else {
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

/// Best-effort JSON-lines log; a `None` path discards everything.
#[derive(Debug, Clone, Default)]
pub struct WizardLog {
    path: Option<PathBuf>,
}

impl WizardLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn debug(&self, event: &str, message: &str) {
        self.write("debug", event, message);
    }

    pub fn info(&self, event: &str, message: &str) {
        self.write("info", event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        self.write("error", event, message);
    }

    fn write(&self, level: &str, event: &str, message: &str) {
        if let Some(path) = &self.path {
            append_wizard_log(path, level, event, message);
        }
    }
}
