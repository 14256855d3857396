use crate::config::RendererMode;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Toggles that survive restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppPrefs {
    pub show_hud: bool,
    pub glow: bool,
    pub renderer: Option<RendererMode>,
}

impl Default for AppPrefs {
    fn default() -> Self {
        Self {
            show_hud: true,
            glow: true,
            renderer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefsError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl AppPrefs {
    /// Missing path or missing file yields defaults; unknown keys are skipped.
    pub fn load(path: Option<&Path>) -> Result<Self, PrefsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(PrefsError::Io(err.to_string())),
        };
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, PrefsError> {
        let mut prefs = Self::default();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(PrefsError::Parse {
                    line: line_no,
                    message: "expected <key>=<value>".to_string(),
                });
            };
            let value = value.trim();
            let bad_bool = |key: &str| PrefsError::Parse {
                line: line_no,
                message: format!("{key} must be true/false"),
            };
            match key.trim() {
                "show_hud" => prefs.show_hud = parse_bool(value).ok_or_else(|| bad_bool("show_hud"))?,
                "glow" => prefs.glow = parse_bool(value).ok_or_else(|| bad_bool("glow"))?,
                "renderer" => {
                    prefs.renderer =
                        Some(RendererMode::parse_label(value).ok_or_else(|| PrefsError::Parse {
                            line: line_no,
                            message: format!("unknown renderer '{value}'"),
                        })?);
                }
                _ => {}
            }
        }
        Ok(prefs)
    }

    pub fn to_text(&self) -> String {
        let mut body = format!(
            "# moodviz runtime prefs v1\nshow_hud={}\nglow={}\n",
            self.show_hud, self.glow
        );
        if let Some(mode) = self.renderer {
            body.push_str(&format!("renderer={}\n", mode.label()));
        }
        body
    }

    /// Writes through a temp file so a crash never leaves a half-written file.
    pub fn save(&self, path: Option<&Path>) -> Result<(), PrefsError> {
        let Some(path) = path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PrefsError::Io(e.to_string()))?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_text()).map_err(|e| PrefsError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| PrefsError::Io(e.to_string()))
    }
}

pub fn prefs_storage_path() -> Option<PathBuf> {
    app_dir("XDG_CONFIG_HOME", ".config").map(|dir| dir.join("prefs.txt"))
}

/// `$<xdg_var>/moodviz`, falling back to `$HOME/<home_rel>/moodviz`.
pub(crate) fn app_dir(xdg_var: &str, home_rel: &str) -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var(xdg_var) {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("moodviz"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(home_rel).join("moodviz"))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
