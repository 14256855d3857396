use crate::backend::{FileMoodSource, HttpBackend, MoodSource};
use crate::canvas::PixelCanvas;
use crate::config::{Config, RendererMode};
use crate::hud;
use crate::logging;
use crate::mood::SharedMood;
use crate::poller::{Command, Poller, PollerConfig, SharedNowPlaying};
use crate::prefs::{prefs_storage_path, AppPrefs};
use crate::render::{renderer_for, Frame, Renderer};
use crate::terminal::TerminalGuard;
use crate::visualizer::{FrameHost, MonotonicClock, Surface, Visualizer};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::{BufWriter, Stdout};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Glow radii are tuned for a 640 px wide surface.
const REFERENCE_WIDTH: f32 = 640.0;
/// Narrowest canvas that still leaves every bar at least one pixel after its gutter.
pub const MIN_CANVAS_WIDTH: usize = 192;
const HUD_ROWS: u16 = 2;

const HELP_TEXT: &str = "moodviz keys
space   play / pause
n / p   next / previous track
h       toggle HUD
g       toggle glow
r       cycle renderer
?       close this help
q, Esc  quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Transport(Command),
    ToggleHud,
    ToggleGlow,
    CycleRenderer,
    ToggleHelp,
}

fn action_for_key(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyAction> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(KeyAction::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char(' ') => Some(KeyAction::Transport(Command::TogglePlayPause)),
        KeyCode::Char('n') | KeyCode::Right => Some(KeyAction::Transport(Command::Next)),
        KeyCode::Char('p') | KeyCode::Left => Some(KeyAction::Transport(Command::Previous)),
        KeyCode::Char('h') => Some(KeyAction::ToggleHud),
        KeyCode::Char('g') => Some(KeyAction::ToggleGlow),
        KeyCode::Char('r') => Some(KeyAction::CycleRenderer),
        KeyCode::Char('?') => Some(KeyAction::ToggleHelp),
        _ => None,
    }
}

fn hud_rows_for_size(rows: u16, show_hud: bool) -> u16 {
    if !show_hud || rows <= 1 {
        return 0;
    }
    (rows - 1).min(HUD_ROWS)
}

fn secs(v: f32) -> Duration {
    Duration::from_secs_f32(v.min(86_400.0))
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let _log = logging::init(cfg.log_file.as_deref(), &cfg.log_level)?;

    let prefs_path = prefs_storage_path();
    let prefs = AppPrefs::load(prefs_path.as_deref()).unwrap_or_else(|err| {
        tracing::warn!("ignoring prefs: {err}");
        AppPrefs::default()
    });
    let mode = cfg
        .renderer
        .or(prefs.renderer)
        .unwrap_or(RendererMode::HalfBlock);

    let mood = Arc::new(SharedMood::new());
    let now_playing = Arc::new(SharedNowPlaying::new());
    let source: Arc<dyn MoodSource> = match &cfg.mood_file {
        Some(path) => Arc::new(FileMoodSource::new(path)),
        None => Arc::new(HttpBackend::new(&cfg.backend, secs(cfg.http_timeout_secs))),
    };
    let poller = Poller::spawn(
        source,
        Arc::clone(&mood),
        Arc::clone(&now_playing),
        PollerConfig {
            mood_interval: secs(cfg.mood_interval_secs),
            now_interval: secs(cfg.now_interval_secs),
            ..PollerConfig::default()
        },
    )?;

    let rng = match cfg.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let mut visualizer = Visualizer::new(Arc::clone(&mood), rng);
    let stop = Arc::new(AtomicBool::new(false));

    let _term = TerminalGuard::new()?;
    let mut host = match TerminalGuard::size() {
        Ok(size) => Some(TerminalHost::new(
            &cfg,
            mode,
            prefs,
            prefs_path,
            size,
            &poller,
            Arc::clone(&mood),
            now_playing,
            Arc::clone(&stop),
        )),
        Err(err) => {
            tracing::warn!("{err:#}");
            None
        }
    };

    tracing::info!(renderer = mode.label(), fps = cfg.fps, "visualizer starting");
    let clock = MonotonicClock::new();
    let frames = visualizer.run(
        host.as_mut().map(|h| h as &mut dyn FrameHost),
        &clock,
        &stop,
    )?;
    tracing::info!(frames, "visualizer finished");
    Ok(())
}

struct TerminalHost<'a> {
    out: BufWriter<Stdout>,
    renderer: Box<dyn Renderer>,
    mode: RendererMode,
    canvas: PixelCanvas,
    supersample: usize,
    size: (u16, u16),
    hud_rows: u16,
    prefs: AppPrefs,
    prefs_path: Option<PathBuf>,
    show_help: bool,
    sync_updates: bool,
    poller: &'a Poller,
    mood: Arc<SharedMood>,
    now_playing: Arc<SharedNowPlaying>,
    stop: Arc<AtomicBool>,
    fps: FpsCounter,
    frame_budget: Duration,
    frame_start: Instant,
    frames: u64,
    frame_limit: Option<u64>,
}

impl<'a> TerminalHost<'a> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        cfg: &Config,
        mode: RendererMode,
        prefs: AppPrefs,
        prefs_path: Option<PathBuf>,
        size: (u16, u16),
        poller: &'a Poller,
        mood: Arc<SharedMood>,
        now_playing: Arc<SharedNowPlaying>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let renderer = renderer_for(mode);
        let hud_rows = hud_rows_for_size(size.1, prefs.show_hud);
        let (canvas, supersample) = allocate_canvas(&*renderer, size, hud_rows, prefs.glow);
        Self {
            out: BufWriter::new(TerminalGuard::stdout()),
            renderer,
            mode,
            canvas,
            supersample,
            size,
            hud_rows,
            prefs,
            prefs_path,
            show_help: false,
            sync_updates: cfg.sync_updates,
            poller,
            mood,
            now_playing,
            stop,
            fps: FpsCounter::new(),
            frame_budget: cfg.frame_budget(),
            frame_start: Instant::now(),
            frames: 0,
            frame_limit: cfg.frames,
        }
    }

    fn relayout(&mut self) {
        self.hud_rows = hud_rows_for_size(self.size.1, self.prefs.show_hud);
        let (canvas, supersample) =
            allocate_canvas(&*self.renderer, self.size, self.hud_rows, self.prefs.glow);
        self.canvas = canvas;
        self.supersample = supersample;
        tracing::debug!(
            cols = self.size.0,
            rows = self.size.1,
            width = self.canvas.width_px(),
            height = self.canvas.height_px(),
            supersample = self.supersample,
            "canvas reallocated"
        );
    }

    fn save_prefs(&self) {
        if let Err(err) = self.prefs.save(self.prefs_path.as_deref()) {
            tracing::warn!("saving prefs failed: {err}");
        }
    }

    fn draw(&mut self) -> anyhow::Result<()> {
        let hud_text = if self.hud_rows > 0 {
            let now = self.now_playing.load();
            let mood = self.mood.load();
            hud::compose(
                now.as_deref(),
                mood.as_deref(),
                self.fps.fps(),
                self.size.0 as usize,
            )
        } else {
            String::new()
        };

        let frame = Frame {
            term_cols: self.size.0,
            term_rows: self.size.1,
            visual_rows: self.size.1.saturating_sub(self.hud_rows).max(1),
            pixel_width: self.canvas.width_px(),
            pixel_height: self.canvas.height_px(),
            pixels_rgba: self.canvas.pixels(),
            supersample: self.supersample,
            hud: &hud_text,
            hud_rows: self.hud_rows,
            overlay: self.show_help.then_some(HELP_TEXT),
            sync_updates: self.sync_updates,
        };
        self.renderer
            .render(&frame, &mut self.out)
            .with_context(|| format!("render frame ({})", self.renderer.name()))
    }

    fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::Quit => self.stop.store(true, Ordering::Relaxed),
            KeyAction::Transport(cmd) => self.poller.send(cmd),
            KeyAction::ToggleHud => {
                self.prefs.show_hud = !self.prefs.show_hud;
                self.relayout();
                self.save_prefs();
            }
            KeyAction::ToggleGlow => {
                self.prefs.glow = !self.prefs.glow;
                self.canvas.set_glow(self.prefs.glow);
                self.save_prefs();
            }
            KeyAction::CycleRenderer => {
                self.mode = self.mode.next();
                self.renderer = renderer_for(self.mode);
                self.prefs.renderer = Some(self.mode);
                self.relayout();
                self.save_prefs();
                tracing::info!(renderer = self.mode.label(), "renderer switched");
            }
            KeyAction::ToggleHelp => self.show_help = !self.show_help,
        }
    }

    fn drain_events(&mut self) -> anyhow::Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if let Some(action) = action_for_key(k.code, k.modifiers) {
                        self.apply(action);
                    }
                }
                Event::Resize(c, r) => {
                    self.size = (c.max(1), r.max(1));
                    self.relayout();
                }
                _ => {}
            }
        }

        // Resize events can be missed in some terminals.
        let sz = crossterm::terminal::size()?;
        if sz != self.size {
            self.size = (sz.0.max(1), sz.1.max(1));
            self.relayout();
        }
        Ok(())
    }
}

impl FrameHost for TerminalHost<'_> {
    fn surface(&mut self) -> &mut dyn Surface {
        &mut self.canvas
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.draw()?;
        self.fps.tick();
        self.frames += 1;
        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
            self.stop.store(true, Ordering::Relaxed);
        }

        self.drain_events()?;

        let elapsed = self.frame_start.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
        self.frame_start = Instant::now();
        Ok(())
    }
}

/// Integer factor that lifts a `grid_width` pixel wide cell grid to at least [`MIN_CANVAS_WIDTH`].
pub fn supersample_factor(grid_width: usize) -> usize {
    MIN_CANVAS_WIDTH.div_ceil(grid_width.max(1)).max(1)
}

/// Canvas for the visual area of a `size` terminal, plus its supersample factor.
pub fn allocate_canvas(
    renderer: &dyn Renderer,
    size: (u16, u16),
    hud_rows: u16,
    glow: bool,
) -> (PixelCanvas, usize) {
    let (cell_w, cell_h) = renderer.cell_size();
    let visual_rows = size.1.saturating_sub(hud_rows).max(1) as usize;
    let grid_w = (size.0.max(1) as usize).saturating_mul(cell_w);
    let grid_h = visual_rows.saturating_mul(cell_h);
    let k = supersample_factor(grid_w);

    let w = grid_w.saturating_mul(k);
    let h = grid_h.saturating_mul(k);
    let mut canvas = PixelCanvas::new(w, h).with_glow_scale(w as f32 / REFERENCE_WIDTH);
    canvas.set_glow(glow);
    (canvas, k)
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = self.frames as f32 / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
