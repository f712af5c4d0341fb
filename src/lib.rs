//! Video Caption Audit
//!
//! Samples a video into frames and an audio track, reads on-screen text with a
//! vision model, transcribes speech with Whisper, and reports spelling errors
//! and how closely the captions follow what is said.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
