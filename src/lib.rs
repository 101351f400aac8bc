//! Sysinternals Sync Library
//!
//! Downloads the Sysinternals Suite archive and keeps a local tools directory
//! in step with it, replacing only files the archive has newer copies of.

pub mod commands;
pub mod core;
pub mod error;
pub mod utils;
