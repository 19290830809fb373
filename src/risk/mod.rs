// Risk management module
pub mod assessor;
pub mod engine;

pub use assessor::{RiskAction, RiskAssessment, SwingRiskAssessor};
pub use engine::RiskEngine;
