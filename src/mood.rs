use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Audio-feature summary for the current listening session, as served by `/api/mood`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSnapshot {
    #[serde(default)]
    pub mood: Option<String>,
    pub energy: f32,
    pub valence: f32,
    pub danceability: f32,
    #[serde(default)]
    pub tempo: f32,
}

impl MoodSnapshot {
    pub fn new(energy: f32, valence: f32, danceability: f32, tempo: f32) -> Self {
        Self {
            mood: None,
            energy,
            valence,
            danceability,
            tempo,
        }
    }

    /// Backend label when present, otherwise the label the backend would have chosen.
    pub fn label(&self) -> &str {
        match self.mood.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => classify_mood(self.energy, self.valence, self.danceability),
        }
    }

    /// Tempo mapped onto `[0, 1]` against a 200 BPM ceiling.
    pub fn tempo_norm(&self) -> f32 {
        (self.tempo / 200.0).clamp(0.0, 1.0)
    }
}

/// The three values the visualizer reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodInputs {
    pub energy: f32,
    pub danceability: f32,
    pub valence: f32,
}

impl MoodInputs {
    pub const NEUTRAL: Self = Self {
        energy: 0.5,
        danceability: 0.5,
        valence: 0.5,
    };

    pub const ZERO: Self = Self {
        energy: 0.0,
        danceability: 0.0,
        valence: 0.0,
    };

    pub fn from_snapshot(snapshot: Option<&MoodSnapshot>) -> Self {
        match snapshot {
            Some(s) => Self {
                energy: s.energy,
                danceability: s.danceability,
                valence: s.valence,
            },
            None => Self::NEUTRAL,
        }
    }
}

impl Default for MoodInputs {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Latest mood snapshot, replaced wholesale by the poller and read once per frame.
#[derive(Debug, Default)]
pub struct SharedMood {
    latest: ArcSwapOption<MoodSnapshot>,
}

impl SharedMood {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: MoodSnapshot) -> Self {
        let shared = Self::new();
        shared.store(snapshot);
        shared
    }

    pub fn store(&self, snapshot: MoodSnapshot) {
        self.latest.store(Some(Arc::new(snapshot)));
    }

    pub fn load(&self) -> Option<Arc<MoodSnapshot>> {
        self.latest.load_full()
    }

    pub fn inputs(&self) -> MoodInputs {
        let guard = self.latest.load();
        MoodInputs::from_snapshot(guard.as_deref())
    }
}

/// Mood label rules used by the backend; first match wins.
pub fn classify_mood(energy: f32, valence: f32, danceability: f32) -> &'static str {
    if energy > 0.7 && valence > 0.6 {
        "Energetic & Happy"
    } else if energy > 0.7 && danceability > 0.7 {
        "Dance/Party"
    } else if energy > 0.6 && valence < 0.4 {
        "Intense"
    } else if energy < 0.4 && valence < 0.4 {
        "Sad/Melancholic"
    } else if energy < 0.5 && valence > 0.5 {
        "Calm & Happy"
    } else if energy < 0.4 {
        "Calm/Chill"
    } else if valence > 0.6 {
        "Happy"
    } else if valence < 0.4 {
        "Sad"
    } else {
        "Balanced"
    }
}

pub fn mood_glyph(label: &str) -> &'static str {
    match label {
        "Energetic & Happy" => "🎉",
        "Dance/Party" => "💃",
        "Intense" => "🔥",
        "Sad/Melancholic" => "😢",
        "Calm & Happy" => "😊",
        "Calm/Chill" => "😌",
        "Happy" => "😄",
        "Sad" => "😔",
        "Balanced" => "⚖️",
        _ => "🎵",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_snapshot_uses_neutral_inputs() {
        let shared = SharedMood::new();
        assert!(shared.load().is_none());
        assert_eq!(shared.inputs(), MoodInputs::NEUTRAL);
    }

    #[test]
    fn store_replaces_the_whole_snapshot() {
        let shared = SharedMood::with_snapshot(MoodSnapshot::new(0.9, 0.8, 0.1, 128.0));
        shared.store(MoodSnapshot::new(0.2, 0.3, 0.4, 90.0));
        let s = shared.load().expect("snapshot");
        assert_eq!(s.energy, 0.2);
        assert_eq!(s.tempo, 90.0);
        assert_eq!(
            shared.inputs(),
            MoodInputs {
                energy: 0.2,
                danceability: 0.4,
                valence: 0.3
            }
        );
    }

    #[test]
    fn classification_follows_rule_order() {
        assert_eq!(classify_mood(0.8, 0.7, 0.9), "Energetic & Happy");
        assert_eq!(classify_mood(0.8, 0.5, 0.8), "Dance/Party");
        assert_eq!(classify_mood(0.65, 0.3, 0.2), "Intense");
        assert_eq!(classify_mood(0.3, 0.3, 0.5), "Sad/Melancholic");
        assert_eq!(classify_mood(0.45, 0.55, 0.5), "Calm & Happy");
        assert_eq!(classify_mood(0.35, 0.5, 0.5), "Calm/Chill");
        assert_eq!(classify_mood(0.55, 0.65, 0.5), "Happy");
        assert_eq!(classify_mood(0.55, 0.35, 0.5), "Sad");
        assert_eq!(classify_mood(0.5, 0.5, 0.5), "Balanced");
    }

    #[test]
    fn label_prefers_backend_value() {
        let mut s = MoodSnapshot::new(0.5, 0.5, 0.5, 120.0);
        assert_eq!(s.label(), "Balanced");
        s.mood = Some("Happy".to_string());
        assert_eq!(s.label(), "Happy");
        assert_eq!(mood_glyph(s.label()), "😄");
        assert_eq!(mood_glyph("unknown"), "🎵");
    }

    #[test]
    fn tempo_norm_caps_at_200_bpm() {
        assert_eq!(MoodSnapshot::new(0.5, 0.5, 0.5, 100.0).tempo_norm(), 0.5);
        assert_eq!(MoodSnapshot::new(0.5, 0.5, 0.5, 260.0).tempo_norm(), 1.0);
    }
}
