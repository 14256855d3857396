use crate::backend::{MoodSource, NowPlaying, Transport};
use crate::mood::SharedMood;
use anyhow::Context;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePlayPause,
    Next,
    Previous,
}

#[derive(Debug, Default)]
pub struct SharedNowPlaying {
    latest: ArcSwapOption<NowPlaying>,
}

impl SharedNowPlaying {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, now: NowPlaying) {
        self.latest.store(Some(Arc::new(now)));
    }

    pub fn load(&self) -> Option<Arc<NowPlaying>> {
        self.latest.load_full()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub mood_interval: Duration,
    pub now_interval: Duration,
    /// Delay before re-reading now-playing after a successful command.
    pub refresh_delay: Duration,
    /// Longest the thread sleeps between checks.
    pub tick: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            mood_interval: Duration::from_secs(10),
            now_interval: Duration::from_millis(3500),
            refresh_delay: Duration::from_millis(500),
            tick: Duration::from_millis(50),
        }
    }
}

/// Schedule and side effects of the poller, driven by explicit timestamps.
pub struct PollState {
    source: Arc<dyn MoodSource>,
    mood: Arc<SharedMood>,
    now_playing: Arc<SharedNowPlaying>,
    cfg: PollerConfig,
    next_mood: Instant,
    next_now: Instant,
    is_playing: bool,
}

impl PollState {
    pub fn new(
        source: Arc<dyn MoodSource>,
        mood: Arc<SharedMood>,
        now_playing: Arc<SharedNowPlaying>,
        cfg: PollerConfig,
        start: Instant,
    ) -> Self {
        Self {
            source,
            mood,
            now_playing,
            cfg,
            next_mood: start,
            next_now: start,
            is_playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn next_mood_due(&self) -> Instant {
        self.next_mood
    }

    pub fn next_now_due(&self) -> Instant {
        self.next_now
    }

    /// Runs whichever fetches are due at `now`.
    pub fn tick(&mut self, now: Instant) {
        if now >= self.next_mood {
            self.refresh_mood();
            self.next_mood = now + self.cfg.mood_interval;
        }
        if now >= self.next_now {
            self.refresh_now_playing();
            self.next_now = now + self.cfg.now_interval;
        }
    }

    fn refresh_mood(&mut self) {
        match self.source.fetch_mood() {
            Ok(Some(snapshot)) => {
                tracing::debug!(
                    energy = snapshot.energy,
                    valence = snapshot.valence,
                    danceability = snapshot.danceability,
                    tempo = snapshot.tempo,
                    "mood updated"
                );
                self.mood.store(snapshot);
            }
            Ok(None) => tracing::debug!(source = self.source.name(), "no mood data yet"),
            Err(err) => tracing::warn!(source = self.source.name(), "mood fetch failed: {err}"),
        }
    }

    fn refresh_now_playing(&mut self) {
        match self.source.fetch_now_playing() {
            Ok(now) => {
                if now.has_track() {
                    self.is_playing = now.is_playing;
                }
                self.now_playing.store(now);
            }
            Err(err) => tracing::warn!(source = self.source.name(), "now-playing fetch failed: {err}"),
        }
    }

    pub fn handle(&mut self, cmd: Command, now: Instant) {
        let transport = match cmd {
            Command::TogglePlayPause if self.is_playing => Transport::Pause,
            Command::TogglePlayPause => Transport::Play,
            Command::Next => Transport::Next,
            Command::Previous => Transport::Previous,
        };

        match self.source.transport(transport) {
            Ok(true) => {
                tracing::info!(?transport, "transport command accepted");
                if cmd == Command::TogglePlayPause {
                    self.is_playing = !self.is_playing;
                    if let Some(current) = self.now_playing.load() {
                        let mut updated = NowPlaying::clone(&current);
                        updated.is_playing = self.is_playing;
                        self.now_playing.store(updated);
                    }
                }
                self.next_now = self.next_now.min(now + self.cfg.refresh_delay);
            }
            Ok(false) => tracing::warn!(?transport, "transport command rejected"),
            Err(err) => tracing::warn!(?transport, "transport command failed: {err}"),
        }
    }
}

/// Background thread that keeps the shared mood and now-playing snapshots fresh.
pub struct Poller {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    commands: Sender<Command>,
}

impl Poller {
    pub fn spawn(
        source: Arc<dyn MoodSource>,
        mood: Arc<SharedMood>,
        now_playing: Arc<SharedNowPlaying>,
        cfg: PollerConfig,
    ) -> anyhow::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let (tx, rx) = mpsc::channel::<Command>();
        let name = source.name().to_string();

        let handle = thread::Builder::new()
            .name("moodviz-poller".to_string())
            .spawn(move || {
                let mut state = PollState::new(source, mood, now_playing, cfg, Instant::now());
                while !stop_for_thread.load(Ordering::Relaxed) {
                    state.tick(Instant::now());
                    match rx.recv_timeout(cfg.tick) {
                        Ok(cmd) => state.handle(cmd, Instant::now()),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .context("spawn poller thread")?;
        tracing::info!(source = %name, "poller started");

        Ok(Self {
            stop,
            handle: Some(handle),
            commands: tx,
        })
    }

    pub fn send(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            tracing::warn!(?cmd, "poller is gone; command dropped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}
