//! Palaver is a terminal client for a streaming chat backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation: the transcript state machine, the
//!   streaming line decoder and event parser, cancellation, the bounded
//!   history snapshot and the session controller that drives them.
//! - [`api`] defines the request and stream payloads exchanged with the
//!   chat endpoint.
//! - [`cli`] parses arguments and runs the interactive and one-shot
//!   surfaces on top of [`core::session::SessionController`].
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
