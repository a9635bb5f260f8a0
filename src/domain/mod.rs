//! Core domain types and logic.

pub mod error;
pub mod price;
pub mod alignment;
pub mod correlation;
pub mod portfolio;
pub mod metrics;
pub mod breakdown;
pub mod scoring;
pub mod analysis;
pub mod random;
pub mod simulation;
pub mod accumulation;
pub mod decumulation;
pub mod plan;
pub mod config_validation;
