//! Controllers del sistema

pub mod auth_controller;
pub mod trip_controller;
