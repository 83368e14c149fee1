// src/lib.rs — Library root for koibench

pub mod cli;
pub mod core;
pub mod evaluator;
pub mod infra;
pub mod problems;
pub mod provider;
pub mod util;
