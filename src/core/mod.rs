// src/core/mod.rs — Benchmark execution pipeline

pub mod cost;
pub mod extractor;
pub mod feedback;
pub mod orchestrator;
pub mod types;
