//! Reading the tracking client's local run logs
//!
//! Layout under the log root:
//!
//! ```text
//! <log_root>/wandb/latest-run/            (usually a symlink)
//!     run-<token>.wandb
//!     files/wandb-summary.json
//! ```

pub mod extract;
pub mod summary;

pub use extract::{extract_new_run_id, extract_run_id, extract_run_id_from, parse_run_file_name};
pub use summary::{check_loss, read_summary, summary_path, LossCheck};

use std::path::{Path, PathBuf};

/// Directory the tracking client writes under the log root
pub const TRACKER_DIR: &str = "wandb";

/// Pointer to the most recent run's directory
pub const LATEST_RUN_DIR: &str = "latest-run";

/// `<log_root>/wandb/latest-run`
pub fn latest_run_dir(log_root: &Path) -> PathBuf {
    log_root.join(TRACKER_DIR).join(LATEST_RUN_DIR)
}
