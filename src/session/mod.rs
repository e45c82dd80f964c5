//! Orchestration layer: the app state machine, its log and its text view.

pub mod app;
pub mod log;
pub mod state;
pub mod view;
