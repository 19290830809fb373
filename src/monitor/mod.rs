// Intraday position monitoring: exit evaluation and GTT maintenance
pub mod exit_manager;
pub mod gtt;

pub use exit_manager::{ExitInstruction, ExitManager, ExitReason};
pub use gtt::GttManager;
