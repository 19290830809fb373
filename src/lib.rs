// Core modules
pub mod alerts;
pub mod backtest;
pub mod broker;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod models;
pub mod monitor;
pub mod phases;
pub mod positions;
pub mod risk;
pub mod scheduler;
pub mod screening;
pub mod signal;
pub mod strategy;

// Re-export commonly used types
pub use config::Settings;
pub use models::*;
pub use phases::PhaseManager;
pub use strategy::Strategy;
