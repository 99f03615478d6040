//! Model AI coding agent configuration: a registry of known agents and their
//! artifacts, a workspace detector, a structural markdown parser, and a
//! documentation evidence pipeline.

pub mod config;
pub mod detect;
pub mod docs;
pub mod logging;
pub mod parser;
pub mod registry;
