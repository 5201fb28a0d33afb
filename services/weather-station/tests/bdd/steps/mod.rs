//! BDD step definitions for the weather station service

pub mod insight_steps;
pub mod pulse_steps;
pub mod wind_direction_steps;
