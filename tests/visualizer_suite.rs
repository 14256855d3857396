use moodviz::canvas::{PixelCanvas, Rgba};
use moodviz::mood::{MoodInputs, MoodSnapshot, SharedMood};
use moodviz::visualizer::{
    bar_paint, maybe_spike, smooth, spike_probability, wave_target, BarPaint, Clock, FrameHost,
    Surface, Visualizer, BAR_COUNT, FADE,
};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Surface that keeps every draw call.
struct RecordingSurface {
    w: f32,
    h: f32,
    overlays: Vec<Rgba>,
    bars: Vec<BarPaint>,
}

impl RecordingSurface {
    fn new(w: f32, h: f32) -> Self {
        Self {
            w,
            h,
            overlays: Vec::new(),
            bars: Vec::new(),
        }
    }

    fn last_frame(&self) -> &[BarPaint] {
        &self.bars[self.bars.len() - BAR_COUNT..]
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> f32 {
        self.w
    }

    fn height(&self) -> f32 {
        self.h
    }

    fn composite_overlay(&mut self, color: Rgba) {
        self.overlays.push(color);
    }

    fn fill_bar(&mut self, paint: &BarPaint) {
        self.bars.push(*paint);
    }
}

struct StepClock {
    t: Cell<f64>,
    step: f64,
}

impl StepClock {
    fn new(step: f64) -> Self {
        Self {
            t: Cell::new(0.0),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now_secs(&self) -> f64 {
        let t = self.t.get();
        self.t.set(t + self.step);
        t
    }
}

/// Presents nothing; raises the stop flag after `limit` frames.
struct BoundedHost<'a, S: Surface> {
    surface: S,
    limit: u64,
    presented: u64,
    stop: &'a AtomicBool,
}

impl<S: Surface> FrameHost for BoundedHost<'_, S> {
    fn surface(&mut self) -> &mut dyn Surface {
        &mut self.surface
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.presented += 1;
        if self.presented >= self.limit {
            self.stop.store(true, Ordering::Relaxed);
        }
        Ok(())
    }
}

fn mood(energy: f32, valence: f32, danceability: f32) -> Arc<SharedMood> {
    Arc::new(SharedMood::with_snapshot(MoodSnapshot::new(
        energy,
        valence,
        danceability,
        120.0,
    )))
}

#[test]
fn smoothing_is_monotone_toward_target() {
    let mut rng = fastrand::Rng::with_seed(11);
    for _ in 0..10_000 {
        let prev = rng.f32() * 3.0 - 1.0;
        let target = rng.f32() * 3.0 - 1.0;
        let next = smooth(prev, target);
        assert!(next >= prev.min(target) - 1e-6 && next <= prev.max(target) + 1e-6);
    }
}

#[test]
fn frames_keep_bars_between_previous_and_target() {
    let mut viz = Visualizer::seeded(mood(0.9, 0.4, 1.0), 3);
    let mut surface = RecordingSurface::new(640.0, 480.0);
    for step in 0..200 {
        let prev = *viz.state().bars();
        viz.frame(step as f64 / 60.0, &mut surface);
        let bars = viz.state().bars();
        let targets = viz.state().targets();
        for i in 0..BAR_COUNT {
            let lo = prev[i].min(targets[i]) - 1e-6;
            let hi = prev[i].max(targets[i]) + 1e-6;
            assert!(bars[i] >= lo && bars[i] <= hi, "bar {i} escaped at step {step}");
        }
    }
}

#[test]
fn colours_and_widths_stay_in_range() {
    let steps = [0.0f32, 0.25, 0.5, 0.75, 1.0];
    for &energy in &steps {
        for &valence in &steps {
            for &danceability in &steps {
                let inputs = MoodInputs {
                    energy,
                    danceability,
                    valence,
                };
                for i in 0..BAR_COUNT {
                    let p = bar_paint(i, 0.5, inputs, 1000.0, 300.0);
                    assert!((120.0..=180.0).contains(&p.fill.h));
                    assert!((70.0..=100.0).contains(&p.fill.s));
                    assert_eq!(p.rect.w, 1000.0 / 64.0 - 2.0);
                }
            }
        }
    }
}

#[test]
fn zero_mood_targets_are_deterministic() {
    let shared = Arc::new(SharedMood::with_snapshot(MoodSnapshot::new(0.0, 0.0, 0.0, 0.0)));
    let mut a = Visualizer::seeded(Arc::clone(&shared), 1);
    let mut b = Visualizer::seeded(Arc::clone(&shared), 999);
    let mut sa = RecordingSurface::new(640.0, 480.0);
    let mut sb = RecordingSurface::new(640.0, 480.0);
    for step in 0..50 {
        let t = 12.5 + step as f64 * 0.016;
        a.frame(t, &mut sa);
        b.frame(t, &mut sb);
        assert_eq!(a.state().targets(), b.state().targets());
        for i in 0..BAR_COUNT {
            assert_eq!(a.state().targets()[i], wave_target(t, i, MoodInputs::ZERO));
        }
    }
}

#[test]
fn no_spikes_without_danceability() {
    let mut rng = fastrand::Rng::with_seed(5);
    assert_eq!(spike_probability(0.0), 0.0);
    for _ in 0..100_000 {
        assert_eq!(maybe_spike(0.25, 0.0, &mut rng), 0.25);
    }
}

#[test]
fn full_danceability_spikes_two_percent_of_the_time() {
    assert_eq!(spike_probability(1.0), 0.02);
    let mut rng = fastrand::Rng::with_seed(42);
    let trials = 200_000;
    let hits = (0..trials)
        .filter(|_| maybe_spike(0.0, 1.0, &mut rng) != 0.0)
        .count();
    let rate = hits as f64 / trials as f64;
    assert!((rate - 0.02).abs() < 0.002, "spike rate {rate}");
}

#[test]
fn bars_on_a_640_px_surface_are_8_px_wide() {
    let p = bar_paint(3, 0.5, MoodInputs::NEUTRAL, 640.0, 400.0);
    assert_eq!(p.rect.w, 8.0);
    assert_eq!(p.rect.x, 30.0);
    assert_eq!(p.rect.h, 0.5 * 400.0 * 0.8);
    assert_eq!(p.rect.y + p.rect.h, 400.0);
}

#[test]
fn missing_snapshot_uses_neutral_colour() {
    let mut viz = Visualizer::seeded(Arc::new(SharedMood::new()), 8);
    let mut surface = RecordingSurface::new(640.0, 480.0);
    viz.frame(1.0, &mut surface);
    for p in surface.last_frame() {
        assert_eq!(p.fill.h, 150.0);
        assert_eq!(p.fill.s, 85.0);
        assert_eq!(p.glow.h, 150.0);
        assert_eq!((p.glow.s, p.glow.l), (100.0, 50.0));
    }
}

#[test]
fn full_bar_at_full_energy() {
    let inputs = MoodInputs {
        energy: 1.0,
        danceability: 0.0,
        valence: 0.0,
    };
    let p = bar_paint(0, 1.0, inputs, 640.0, 480.0);
    assert_eq!(p.fill.l, 70.0);
    assert_eq!(p.glow_blur, 30.0);
    assert_eq!(p.fill.s, 100.0);
    assert_eq!(p.rect.y, 480.0 - 384.0);
}

#[test]
fn each_frame_fades_before_drawing() {
    let mut viz = Visualizer::seeded(mood(0.5, 0.5, 0.5), 1);
    let mut surface = RecordingSurface::new(320.0, 200.0);
    viz.frame(0.0, &mut surface);
    viz.frame(0.016, &mut surface);
    assert_eq!(surface.overlays, vec![FADE, FADE]);
    assert_eq!(surface.bars.len(), 2 * BAR_COUNT);
    assert_eq!(FADE, Rgba::new(25, 20, 20, 0.3));
}

#[test]
fn run_without_surface_is_a_no_op() {
    let mut viz = Visualizer::seeded(mood(0.5, 0.5, 0.5), 1);
    let stop = AtomicBool::new(false);
    let frames = viz
        .run(None, &StepClock::new(0.016), &stop)
        .expect("run without surface");
    assert_eq!(frames, 0);
    assert_eq!(viz.frames(), 0);
    assert!(viz.state().bars().iter().all(|&b| b == 0.0));
}

#[test]
fn stop_flag_bounds_the_loop() {
    let mut viz = Visualizer::seeded(mood(0.7, 0.2, 0.9), 1);
    let stop = AtomicBool::new(false);
    let mut host = BoundedHost {
        surface: RecordingSurface::new(640.0, 480.0),
        limit: 5,
        presented: 0,
        stop: &stop,
    };
    let frames = viz
        .run(Some(&mut host), &StepClock::new(0.016), &stop)
        .expect("bounded run");
    assert_eq!(frames, 5);
    assert_eq!(host.presented, 5);
    assert_eq!(host.surface.overlays.len(), 5);
    assert_eq!(host.surface.bars.len(), 5 * BAR_COUNT);
}

#[test]
fn preset_stop_flag_renders_nothing() {
    let mut viz = Visualizer::seeded(mood(0.5, 0.5, 0.5), 1);
    let stop = AtomicBool::new(true);
    let mut host = BoundedHost {
        surface: RecordingSurface::new(640.0, 480.0),
        limit: 10,
        presented: 0,
        stop: &stop,
    };
    let frames = viz
        .run(Some(&mut host), &StepClock::new(0.016), &stop)
        .expect("stopped run");
    assert_eq!(frames, 0);
    assert!(host.surface.overlays.is_empty());
}

#[test]
fn same_seed_same_frames() {
    let shared = mood(0.8, 0.6, 1.0);
    let mut a = Visualizer::seeded(Arc::clone(&shared), 77);
    let mut b = Visualizer::seeded(Arc::clone(&shared), 77);
    let mut sa = RecordingSurface::new(640.0, 480.0);
    let mut sb = RecordingSurface::new(640.0, 480.0);
    for step in 0..300 {
        let t = step as f64 / 60.0;
        a.frame(t, &mut sa);
        b.frame(t, &mut sb);
    }
    assert_eq!(a.state(), b.state());
    assert_eq!(sa.bars, sb.bars);
}

#[test]
fn mood_swaps_are_picked_up_next_frame() {
    let shared = mood(0.0, 0.0, 0.0);
    let mut viz = Visualizer::seeded(Arc::clone(&shared), 2);
    let mut surface = RecordingSurface::new(640.0, 480.0);
    viz.frame(0.0, &mut surface);
    assert_eq!(surface.last_frame()[0].fill.h, 120.0);

    shared.store(MoodSnapshot::new(1.0, 1.0, 0.0, 140.0));
    viz.frame(0.016, &mut surface);
    assert_eq!(surface.last_frame()[0].fill.h, 180.0);
    assert_eq!(surface.last_frame()[0].fill.s, 100.0);
}

#[test]
fn trails_fade_toward_the_background() {
    let mut canvas = PixelCanvas::new(640, 50);
    canvas.set_glow(false);
    canvas.fill_rect(
        moodviz::canvas::Rect {
            x: 0.0,
            y: 0.0,
            w: 640.0,
            h: 50.0,
        },
        (255, 255, 255),
    );
    let stop = AtomicBool::new(false);
    let mut host = BoundedHost {
        surface: canvas,
        limit: 40,
        presented: 0,
        stop: &stop,
    };
    let mut viz = Visualizer::seeded(mood(0.5, 0.5, 0.0), 4);
    viz.run(Some(&mut host), &StepClock::new(0.016), &stop)
        .expect("canvas run");

    // Bars never reach the top row, so only the fade touches it.
    for x in (0..640).step_by(7) {
        let px = host.surface.pixel(x, 0).expect("pixel");
        assert!(px[0].abs_diff(25) <= 2, "red {} at x {x}", px[0]);
        assert!(px[1].abs_diff(20) <= 2);
        assert!(px[2].abs_diff(20) <= 2);
    }
    // Something green was painted near the bottom.
    let bottom = host.surface.pixel(4, 49).expect("pixel");
    assert!(bottom[1] > bottom[0]);
}
