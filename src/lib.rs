// src/lib.rs

pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod initial_states;
pub mod maps;
pub mod odt;
pub mod odt_views;
pub mod ovf;
pub mod snapshot;
pub mod topology;
pub mod vec3;
pub mod vector_field;
pub mod views;
pub mod visualisation;

pub use error::{Result, ViewError};
