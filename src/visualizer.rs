//! Mood-reactive bar spectrum.
//!
//! Every frame fades the previous picture, recomputes a target height for each
//! bar from three summed waves (plus an occasional random spike), eases the bars
//! toward those targets and paints them bottom-aligned. Nothing here listens to
//! audio: the picture is driven by wall time and the latest [`MoodInputs`].

use crate::canvas::{Hsl, Rect, Rgba};
use crate::mood::{MoodInputs, SharedMood};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const BAR_COUNT: usize = 64;
pub const SMOOTHING: f32 = 0.1;
pub const FADE: Rgba = Rgba::new(25, 20, 20, 0.3);
pub const HEIGHT_SCALE: f32 = 0.8;
pub const BAR_GUTTER: f32 = 2.0;
pub const SPIKE_CHANCE: f32 = 0.02;
pub const SPIKE_MAX: f32 = 0.3;

/// Everything needed to paint one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarPaint {
    pub rect: Rect,
    pub fill: Hsl,
    pub glow_blur: f32,
    pub glow: Hsl,
}

/// A fixed-size 2D drawing target.
pub trait Surface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    /// Source-over composite of `color` across the whole surface.
    fn composite_overlay(&mut self, color: Rgba);
    fn fill_bar(&mut self, paint: &BarPaint);
}

/// Owns the surface and decides when the next frame may start.
pub trait FrameHost {
    fn surface(&mut self) -> &mut dyn Surface;
    /// Show what was drawn and wait for the next frame slot.
    fn present(&mut self) -> anyhow::Result<()>;
}

pub trait Clock {
    fn now_secs(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Wave sum for bar `i` at time `t`, mapped around 0.5.
///
/// The result is not clamped: high energy pushes it slightly below 0 or above 1.
pub fn wave_target(t: f64, i: usize, mood: MoodInputs) -> f32 {
    let energy = mood.energy as f64;
    let i = i as f64;
    let speed = 1.0 + energy * 2.0;
    let amplitude = 0.3 + energy * 0.5;

    let wave1 = (t * speed + i * 0.1).sin() * amplitude;
    let wave2 = (t * speed * 1.5 - i * 0.15).sin() * amplitude * 0.5;
    let wave3 = (t * speed * 0.8 + i * 0.2).cos() * amplitude * 0.3;

    ((wave1 + wave2 + wave3 + 1.0) / 2.0) as f32
}

pub fn spike_probability(danceability: f32) -> f32 {
    danceability * SPIKE_CHANCE
}

/// Draws once from `rng`; on a hit, bumps `target` by up to [`SPIKE_MAX`] and caps it at 1.
pub fn maybe_spike(target: f32, danceability: f32, rng: &mut fastrand::Rng) -> f32 {
    if rng.f32() < spike_probability(danceability) {
        (target + rng.f32() * SPIKE_MAX).min(1.0)
    } else {
        target
    }
}

#[inline]
pub fn smooth(bar: f32, target: f32) -> f32 {
    bar + (target - bar) * SMOOTHING
}

pub fn bar_paint(i: usize, bar: f32, mood: MoodInputs, width: f32, height: f32) -> BarPaint {
    let slot = width / BAR_COUNT as f32;
    let bar_h = bar * height * HEIGHT_SCALE;
    let hue = 120.0 + mood.valence * 60.0;

    BarPaint {
        rect: Rect {
            x: i as f32 * slot,
            y: height - bar_h,
            w: slot - BAR_GUTTER,
            h: bar_h,
        },
        fill: Hsl {
            h: hue,
            s: 70.0 + mood.energy * 30.0,
            l: 40.0 + bar * 30.0,
        },
        glow_blur: 10.0 + bar * 20.0,
        glow: Hsl {
            h: hue,
            s: 100.0,
            l: 50.0,
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarState {
    bars: [f32; BAR_COUNT],
    targets: [f32; BAR_COUNT],
}

impl BarState {
    pub fn new() -> Self {
        Self {
            bars: [0.0; BAR_COUNT],
            targets: [0.0; BAR_COUNT],
        }
    }

    pub fn bars(&self) -> &[f32; BAR_COUNT] {
        &self.bars
    }

    pub fn targets(&self) -> &[f32; BAR_COUNT] {
        &self.targets
    }

    pub fn retarget(&mut self, t: f64, mood: MoodInputs, rng: &mut fastrand::Rng) {
        for (i, target) in self.targets.iter_mut().enumerate() {
            *target = maybe_spike(wave_target(t, i, mood), mood.danceability, rng);
        }
    }

    pub fn settle(&mut self) {
        for (bar, &target) in self.bars.iter_mut().zip(self.targets.iter()) {
            *bar = smooth(*bar, target);
        }
    }
}

impl Default for BarState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Visualizer {
    mood: Arc<SharedMood>,
    rng: fastrand::Rng,
    state: BarState,
    frames: u64,
}

impl Visualizer {
    pub fn new(mood: Arc<SharedMood>, rng: fastrand::Rng) -> Self {
        Self {
            mood,
            rng,
            state: BarState::new(),
            frames: 0,
        }
    }

    pub fn seeded(mood: Arc<SharedMood>, seed: u64) -> Self {
        Self::new(mood, fastrand::Rng::with_seed(seed))
    }

    pub fn state(&self) -> &BarState {
        &self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draws a single frame for time `t` (seconds on a monotonic clock).
    pub fn frame(&mut self, t: f64, surface: &mut dyn Surface) {
        surface.composite_overlay(FADE);

        let mood = self.mood.inputs();
        self.state.retarget(t, mood, &mut self.rng);
        self.state.settle();

        let (w, h) = (surface.width(), surface.height());
        for (i, &bar) in self.state.bars.iter().enumerate() {
            surface.fill_bar(&bar_paint(i, bar, mood, w, h));
        }
        self.frames += 1;
    }

    /// Renders until `stop` is set, checking it once before each frame.
    ///
    /// Without a host nothing is drawn and `Ok(0)` is returned.
    pub fn run(
        &mut self,
        host: Option<&mut dyn FrameHost>,
        clock: &dyn Clock,
        stop: &AtomicBool,
    ) -> anyhow::Result<u64> {
        let Some(host) = host else {
            tracing::debug!("no drawing surface; visualizer idle");
            return Ok(0);
        };

        let mut rendered = 0u64;
        while !stop.load(Ordering::Relaxed) {
            let t = clock.now_secs();
            self.frame(t, host.surface());
            host.present()?;
            rendered += 1;
        }
        tracing::debug!(frames = rendered, "visualizer stopped");
        Ok(rendered)
    }
}
