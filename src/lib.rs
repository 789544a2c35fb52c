pub mod agent;
pub mod config;
pub mod control_system;
pub mod error;
pub mod global_variables;
pub mod monitoring;
pub mod render;
pub mod simulation_engine;
pub mod state;
pub mod training;
