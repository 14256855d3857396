//! Thin clients for the places mood and playback data come from.

use crate::mood::MoodSnapshot;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<ureq::Error> for BackendError {
    fn from(err: ureq::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Body of `/api/now`. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NowPlaying {
    pub playing: bool,
    pub is_playing: bool,
    pub track_name: Option<String>,
    pub artists: Option<String>,
    pub album: Option<String>,
    pub album_art: Option<String>,
    pub duration_ms: Option<u64>,
    pub progress_ms: Option<u64>,
    pub track_id: Option<String>,
}

impl NowPlaying {
    /// A track is shown only when the backend reports one with a name.
    pub fn has_track(&self) -> bool {
        self.playing
            && self
                .track_name
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty())
    }

    /// Progress in `[0, 1]`, or `None` when either duration is missing or zero.
    pub fn progress(&self) -> Option<f32> {
        match (self.progress_ms, self.duration_ms) {
            (Some(p), Some(d)) if p > 0 && d > 0 => Some((p as f32 / d as f32).min(1.0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Play,
    Pause,
    Next,
    Previous,
}

impl Transport {
    pub fn path(self) -> &'static str {
        match self {
            Self::Play => "/api/play",
            Self::Pause => "/api/pause",
            Self::Next => "/api/next",
            Self::Previous => "/api/previous",
        }
    }
}

pub trait MoodSource: Send + Sync {
    fn name(&self) -> &str;
    /// `Ok(None)` means the source answered but has no mood yet.
    fn fetch_mood(&self) -> Result<Option<MoodSnapshot>, BackendError>;
    fn fetch_now_playing(&self) -> Result<NowPlaying, BackendError>;
    /// Returns the `success` flag reported for the command.
    fn transport(&self, cmd: Transport) -> Result<bool, BackendError>;
}

pub struct HttpBackend {
    base: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            base: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn get(&self, path: &str) -> Result<(u16, String), BackendError> {
        let mut resp = self.agent.get(&self.url(path)).call()?;
        let status = resp.status().as_u16();
        let body = resp.body_mut().read_to_string()?;
        Ok((status, body))
    }

    fn post(&self, path: &str) -> Result<(u16, String), BackendError> {
        let mut resp = self.agent.post(&self.url(path)).send_empty()?;
        let status = resp.status().as_u16();
        let body = resp.body_mut().read_to_string()?;
        Ok((status, body))
    }
}

impl MoodSource for HttpBackend {
    fn name(&self) -> &str {
        &self.base
    }

    fn fetch_mood(&self) -> Result<Option<MoodSnapshot>, BackendError> {
        let (status, body) = self.get("/api/mood")?;
        parse_mood(status, &body)
    }

    fn fetch_now_playing(&self) -> Result<NowPlaying, BackendError> {
        let (status, body) = self.get("/api/now")?;
        parse_now_playing(status, &body)
    }

    fn transport(&self, cmd: Transport) -> Result<bool, BackendError> {
        let (status, body) = self.post(cmd.path())?;
        parse_success(status, &body)
    }
}

fn api_error(status: u16, body: &str) -> BackendError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| "no error message".to_string());
    BackendError::Api { status, message }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

pub fn parse_mood(status: u16, body: &str) -> Result<Option<MoodSnapshot>, BackendError> {
    if !is_success(status) {
        return Err(api_error(status, body));
    }
    let value: serde_json::Value = serde_json::from_str(body)?;
    let has_mood = value
        .get("mood")
        .and_then(|m| m.as_str())
        .is_some_and(|m| !m.is_empty());
    if !has_mood {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

pub fn parse_now_playing(status: u16, body: &str) -> Result<NowPlaying, BackendError> {
    if !is_success(status) {
        return Err(api_error(status, body));
    }
    Ok(serde_json::from_str(body)?)
}

pub fn parse_success(status: u16, body: &str) -> Result<bool, BackendError> {
    if !is_success(status) {
        return Err(api_error(status, body));
    }
    let value: serde_json::Value = serde_json::from_str(body)?;
    Ok(value.get("success").and_then(|s| s.as_bool()).unwrap_or(false))
}

/// Reads a [`MoodSnapshot`] JSON document from disk on every fetch.
pub struct FileMoodSource {
    path: PathBuf,
    label: String,
}

impl FileMoodSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MoodSource for FileMoodSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch_mood(&self) -> Result<Option<MoodSnapshot>, BackendError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(BackendError::Io(err.to_string())),
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn fetch_now_playing(&self) -> Result<NowPlaying, BackendError> {
        Ok(NowPlaying::default())
    }

    fn transport(&self, _cmd: Transport) -> Result<bool, BackendError> {
        Ok(false)
    }
}
