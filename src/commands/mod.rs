//! The frontend boundary. Every command takes the [`AppState`](crate::AppState)
//! and reports failures as display strings.

pub mod entries;
pub mod export;
pub mod prompts;
pub mod sessions;
pub mod settings;
pub mod table;
pub mod training;
