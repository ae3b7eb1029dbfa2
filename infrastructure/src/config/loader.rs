//! Settings discovery and merging.
//!
//! Settings come from up to four places. Later sources win, key by key:
//! built-in defaults, the per-user file under the platform config directory,
//! a project file in the working directory, and an explicit path handed in
//! by the caller. Every file uses the same flat section schema as
//! [`FileConfig`]; there is no profile nesting.

use super::file_config::FileConfig;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use std::path::{Path, PathBuf};

/// File names recognized in the working directory; the first hit is used.
const PROJECT_FILE_NAMES: &[&str] = &["council.toml", ".council.toml"];

/// Merge settings from every available source, weakest first.
///
/// Missing files are simply skipped; only a file that exists but fails to
/// parse produces an error.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
    let mut merged = Figment::from(Serialized::defaults(FileConfig::default()));
    if let Some(user) = user_file().filter(|path| path.exists()) {
        merged = merged.merge(Toml::file(user));
    }
    if let Some(project) = project_file() {
        merged = merged.merge(Toml::file(project));
    }
    if let Some(path) = explicit {
        merged = merged.merge(Toml::file(path));
    }
    merged.extract().map_err(Box::new)
}

/// Per-user settings path, `<platform config dir>/council/config.toml`,
/// whether or not the file exists.
pub fn user_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("council").join("config.toml"))
}

/// The first recognized settings file in the working directory, if any.
pub fn project_file() -> Option<PathBuf> {
    PROJECT_FILE_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Describe which sources `load` would consult, for the `config` subcommand.
pub fn describe_sources() -> String {
    let mut lines = vec![
        "Settings sources, weakest to strongest:".to_string(),
        "  defaults   built in".to_string(),
    ];
    match user_file() {
        Some(path) if path.exists() => {
            lines.push(format!("  user       {} (present)", path.display()));
        }
        Some(path) => lines.push(format!("  user       {} (absent)", path.display())),
        None => lines.push("  user       no platform config directory".to_string()),
    }
    match project_file() {
        Some(path) => lines.push(format!("  project    {} (present)", path.display())),
        None => lines.push(format!(
            "  project    {} or {} (absent)",
            PROJECT_FILE_NAMES[0], PROJECT_FILE_NAMES[1]
        )),
    }
    lines.join("\n")
}
