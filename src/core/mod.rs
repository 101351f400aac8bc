pub mod config;
pub mod download;
pub mod downloads;
pub mod sync;
pub mod version_info;
