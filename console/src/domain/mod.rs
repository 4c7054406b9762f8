//! Domain models

pub mod container;
pub mod settings;
pub mod user;
