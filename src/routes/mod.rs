pub mod correlation;
pub mod dataset;
pub mod health;
pub mod incidents;
