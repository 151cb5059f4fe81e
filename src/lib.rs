pub mod audio;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod merger;
pub mod orchestrator;
pub mod transcriber;
pub mod vad;
