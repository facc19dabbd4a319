//! Ratatui TUI 界面

pub mod app;
pub mod event;
pub mod render;

pub use app::run_app;
