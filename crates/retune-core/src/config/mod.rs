//! Session persistence - state struct, YAML I/O, default path

use std::path::PathBuf;

mod io;
mod state;

pub use io::{load_config, save_config};
pub use state::SessionState;

/// Default location of the persisted session state
///
/// `$XDG_CONFIG_HOME/retune/state.yaml` (or the platform equivalent),
/// falling back to the working directory if no config dir is known.
pub fn default_state_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retune")
        .join("state.yaml")
}
