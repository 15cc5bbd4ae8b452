//! CLI command implementations.

pub mod common;
pub mod monitor;
pub mod ports;
pub mod process;
pub mod routes;
pub mod run;
