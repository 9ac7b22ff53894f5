//! Medzeal Assist: voice-guided facial skin check-up.

pub mod analysis;
pub mod assistant;
pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod live;
pub mod media;
pub mod model;
pub mod phase;
pub mod prompts;
pub mod session;
pub mod slots;
