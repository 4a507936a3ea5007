//! policychat is a terminal client for an HR policy assistant service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the wire payloads, the backend traits the stores talk
//!   through, and the reqwest implementation of those traits.
//! - [`core`] owns session state: the conversation engine that streams
//!   replies into the transcript, the uploaded-file list, and configuration.
//! - [`cli`] parses arguments and drives the stores from the terminal.
//! - [`utils`] holds URL building, auth headers, and logging helpers.
//!
//! The binary (`src/main.rs`) routes straight into [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
