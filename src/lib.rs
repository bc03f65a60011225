pub mod axiom;
pub mod cli;
pub mod config;
pub mod gate;
pub mod heuristics;
pub mod logging;
pub mod mind;
pub mod observability;
pub mod session;
pub mod tool;
