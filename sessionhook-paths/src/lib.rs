//! XDG Base Directory paths for sessionhook.
//!
//! The CLI reads its user-level configuration from the XDG config
//! directory on every platform, so a config written on Linux works
//! unchanged on macOS.

use std::path::PathBuf;

/// Name of the directory created under the XDG base directories.
const APP_DIR: &str = "sessionhook";

/// File name of the configuration file inside [`config_dir`].
pub const CONFIG_FILE: &str = "config.toml";

/// Get the sessionhook config directory.
///
/// Returns `$XDG_CONFIG_HOME/sessionhook` if set, otherwise
/// `~/.config/sessionhook`.
///
/// # Examples
///
/// ```
/// use sessionhook_paths::config_dir;
///
/// let config = config_dir();
/// assert!(config.ends_with("sessionhook"));
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join(APP_DIR)
    } else {
        PathBuf::from(".config").join(APP_DIR)
    }
}

/// Path of the user-level configuration file.
pub fn user_config_file() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}
