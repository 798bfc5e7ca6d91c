// SPDX-License-Identifier: MIT

pub mod logs;
pub mod sse;
pub mod tasks;
