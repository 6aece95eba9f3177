//! Command-line interface for the node

pub mod commands;
