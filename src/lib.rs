pub mod app;
pub mod backend;
pub mod canvas;
pub mod config;
pub mod hud;
pub mod logging;
pub mod mood;
pub mod poller;
pub mod prefs;
pub mod render;
pub mod terminal;
pub mod visualizer;
