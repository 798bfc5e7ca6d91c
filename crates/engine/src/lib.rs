// SPDX-License-Identifier: MIT
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ote-engine: the task lifecycle core — Supervisor, Log Writer, Log
//! Reader, Job Executor, Task Manager, Event Hub.

mod error;
mod event_hub;
mod executor;
mod job;
mod log_reader;
mod log_writer;
mod manager;
mod supervisor;

pub use error::EngineError;
pub use event_hub::{EventHub, HubMessage, Subscription};
pub use executor::TaskUpdate;
pub use log_reader::LogReader;
pub use log_writer::{log_file_path, LogInitError, LogWriter};
pub use manager::Manager;
pub use supervisor::{SpawnError, Supervisor, SupervisorStreams};
