use std::path::PathBuf;

/// File name searched for in the working directory and in the home directory
pub const CONFIG_FILE: &str = ".unistore.toml";

/// Load config file content from CWD first, then home directory
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file() -> Option<String> {
    if let Ok(content) = std::fs::read_to_string(CONFIG_FILE) {
        log::debug!("Loaded config from {}", CONFIG_FILE);
        return Some(content);
    }

    let home_config = home_config_path()?;
    match std::fs::read_to_string(&home_config) {
        Ok(content) => {
            log::debug!("Loaded config from {}", home_config.display());
            Some(content)
        }
        Err(_) => None,
    }
}

/// Path of the config file in the home directory (~/.unistore.toml)
fn home_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE))
}
