// src/lib.rs — Library root for revbench

pub mod cli;
pub mod core;
pub mod corpus;
pub mod infra;
pub mod judge;
pub mod report;
