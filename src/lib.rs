//! Solver benchmarking service.
//!
//! Upload an MPS or LP model, run it through several mathematical-programming
//! solvers one after another, and compare their runtime and result quality in
//! a single table, a bar chart and the solvers' own console output.

pub mod capture;
pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod report;
pub mod routes;
pub mod state;
