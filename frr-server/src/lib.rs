//! F1 Race Replay Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod config;
pub mod playback;
pub mod state;
