// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::sync::Arc;

use ote_engine::Manager;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<Manager>,
    pub task_logger_dir_path: PathBuf,
}
