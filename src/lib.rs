//! Game Log Monitor - live session statistics from a game's log file.
//!
//! The [`watcher`] tails the log across rotation, the [`parser`] turns lines
//! into events, [`stats`] folds them into a session aggregate and the
//! [`monitor`] drives the three and publishes snapshots.

pub mod config;
pub mod display;
pub mod monitor;
pub mod parser;
pub mod stats;
pub mod watcher;
