//! # XDG
//!
//! Locations where a `kilorc` configuration file may live, following the XDG
//! Base Directory Specification:
//! <https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html>

use std::env;
use std::path::PathBuf;

/// Candidate configuration directories, most specific first: the user
/// directory (`$XDG_CONFIG_HOME`, falling back to `$HOME/.config`), then the
/// entries of `$XDG_CONFIG_DIRS` (defaulting to `/etc/xdg:/etc`). Every
/// candidate gets a `kilo` subdirectory appended.
pub fn conf_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    match env::var_os("XDG_CONFIG_HOME") {
        Some(user_dir) => dirs.push(PathBuf::from(user_dir)),
        None =>
            if let Some(home) = env::var_os("HOME") {
                dirs.push(PathBuf::from(home).join(".config"));
            },
    }
    let system_dirs = env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc/xdg:/etc".to_string());
    dirs.extend(system_dirs.split(':').filter(|dir| !dir.is_empty()).map(PathBuf::from));
    dirs.into_iter().map(|dir| dir.join("kilo")).collect()
}
