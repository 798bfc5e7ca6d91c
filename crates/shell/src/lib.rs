// SPDX-License-Identifier: MIT
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Command-string parsing and optional static validation for shell commands
//! submitted as task payloads.
//!
//! This crate never spawns anything itself — it only answers "is this
//! syntactically well-formed" and, optionally, "does this look dangerous".
//! The actual child process is spawned by `ote-engine`'s supervisor via
//! `bash -c`.

mod parser;
mod validator;

pub use parser::{parse_command, ParseError};
pub use validator::{validate_command, Finding, Severity};
