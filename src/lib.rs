//! Circlebot - turns regular Telegram videos into round video notes.
//!
//! Hexagonal architecture:
//! - domain/: pure business logic (media limits, transcode parameters)
//! - ports/: trait definitions
//! - adapters/: concrete implementations (Telegram, ffmpeg, liveness HTTP)
//! - application/: the per-message conversion pipeline
//! - config: environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod context;
pub mod domain;
pub mod ports;
