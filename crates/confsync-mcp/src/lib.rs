//! Synchronizes a canonical AI-model catalog into the configuration files of
//! third-party coding assistants without disturbing entries the user owns.

pub mod adapter;
pub mod backup;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod merge;
pub mod model;
pub mod persist;
pub mod probe;
pub mod service;
pub mod session;
pub mod synth;
pub mod target;

pub use error::{Result, SyncError};
