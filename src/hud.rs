use crate::backend::NowPlaying;
use crate::mood::{mood_glyph, MoodSnapshot};
use std::fmt::Write as _;

const STAT_BAR_WIDTH: usize = 8;
const PROGRESS_BAR_WIDTH: usize = 16;

/// Two status lines: playback on top, mood stats below.
pub fn compose(
    now: Option<&NowPlaying>,
    mood: Option<&MoodSnapshot>,
    fps: f32,
    width: usize,
) -> String {
    let top = playback_line(now);
    let bottom = mood_line(mood, fps);
    format!("{}\n{}", clip(&top, width), clip(&bottom, width))
}

pub fn playback_line(now: Option<&NowPlaying>) -> String {
    let Some(now) = now else {
        return "Waiting for backend...".to_string();
    };
    if !now.has_track() {
        return "No track playing".to_string();
    }

    let mut line = String::new();
    line.push_str(if now.is_playing { "▶ " } else { "⏸ " });
    line.push_str(now.track_name.as_deref().unwrap_or_default());
    if let Some(artists) = now.artists.as_deref().filter(|a| !a.is_empty()) {
        let _ = write!(line, " - {artists}");
    }
    if let Some(album) = now.album.as_deref().filter(|a| !a.is_empty()) {
        let _ = write!(line, " ({album})");
    }
    if let (Some(progress), Some(p_ms), Some(d_ms)) = (now.progress(), now.progress_ms, now.duration_ms) {
        let _ = write!(
            line,
            "  {}/{} {}",
            format_ms(p_ms),
            format_ms(d_ms),
            meter(progress, PROGRESS_BAR_WIDTH)
        );
    }
    line
}

pub fn mood_line(mood: Option<&MoodSnapshot>, fps: f32) -> String {
    let Some(m) = mood else {
        return format!("🎵 Mood: loading | {fps:.0} fps");
    };
    let label = m.label();
    let tempo = m.tempo_norm();
    format!(
        "{} {} | energy {} {} | valence {} {} | dance {} {} | tempo {} {:.0} BPM | {:.0} fps",
        mood_glyph(label),
        label,
        meter(m.energy, STAT_BAR_WIDTH),
        percent(m.energy),
        meter(m.valence, STAT_BAR_WIDTH),
        percent(m.valence),
        meter(m.danceability, STAT_BAR_WIDTH),
        percent(m.danceability),
        meter(tempo, STAT_BAR_WIDTH),
        tempo * 200.0,
        fps
    )
}

pub fn percent(v: f32) -> String {
    format!("{:.0}%", v * 100.0)
}

/// `[####----]` style meter; values outside `[0, 1]` are pinned.
pub fn meter(v: f32, width: usize) -> String {
    let filled = ((v.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn format_ms(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn clip(line: &str, width: usize) -> String {
    line.chars().take(width).collect()
}
