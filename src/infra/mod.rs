// src/infra/mod.rs — Infrastructure: config, errors, logging

pub mod config;
pub mod errors;
pub mod logger;
