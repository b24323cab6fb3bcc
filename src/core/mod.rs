// src/core/mod.rs — Scoring engine

pub mod aggregate;
pub mod decompose;
pub mod matcher;
pub mod scheduler;
pub mod scorer;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;
