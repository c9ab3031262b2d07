//! Live configuration
//!
//! This module handles:
//! - Locating and parsing the settings file
//! - Sharing one atomically swappable snapshot across all requests
//! - Reloading the file when it changes on disk

mod live;
mod settings;
mod watcher;

pub use live::LiveConfig;
pub use settings::{find_config_file, Settings};
pub use watcher::ConfigWatcher;
