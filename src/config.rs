//! # Configuration
//!
//! Utilities to configure the text editor.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::sys;

/// The global Kilo configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The number of columns a tab character occupies. Must be > 0.
    pub(crate) tab_stop: usize,
    /// The number of confirmations needed before quitting, when changes have
    /// been made since the file was last saved.
    pub(crate) quit_times: usize,
}

impl Default for Config {
    fn default() -> Self { Self { tab_stop: 8, quit_times: 3 } }
}

impl Config {
    /// Load the configuration, potentially overridden using `kilorc` files
    /// that can be located in the XDG configuration directories (e.g.
    /// `/etc/kilo/kilorc` or `$XDG_CONFIG_HOME/kilo/kilorc`).
    ///
    /// Unknown keys, malformed lines and unreadable files are ignored.
    pub fn load() -> Self {
        let mut conf = Self::default();
        for conf_dir in sys::conf_dirs() {
            let path = conf_dir.join("kilorc");
            if path.is_file() {
                let _ = apply_config_file(&path, &mut conf);
            }
        }
        conf
    }
}

/// Apply the key-value pairs of a configuration file to `conf`.
///
/// The file is line-based: `#` introduces a comment line and other lines have
/// the form `<key> <value>`. Lines that are not recognized are skipped.
fn apply_config_file(path: &Path, conf: &mut Config) -> io::Result<()> {
    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("tabstop"), Some(value)) =>
                if let Ok(tab_stop) = value.parse() {
                    if tab_stop > 0 {
                        conf.tab_stop = tab_stop;
                    }
                },
            (Some("quittimes"), Some(value)) =>
                if let Ok(quit_times) = value.parse() {
                    conf.quit_times = quit_times;
                },
            _ => (),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn parse(content: &str) -> Config {
        let tmp_dir = TempDir::new().expect("Could not create temporary directory");
        let path = tmp_dir.path().join("kilorc");
        fs::write(&path, content).expect("Could not write configuration file");
        let mut conf = Config::default();
        apply_config_file(&path, &mut conf).expect("Could not read configuration file");
        conf
    }

    #[test]
    fn config_keys() {
        let conf = parse("tabstop 4\nquittimes 2\n");
        assert_eq!(conf.tab_stop, 4);
        assert_eq!(conf.quit_times, 2);
    }

    #[test]
    fn comments_and_blank_lines() {
        let conf = parse("# a comment\n\n   \n# tabstop 2\nquittimes 5\n");
        assert_eq!(conf.tab_stop, 8);
        assert_eq!(conf.quit_times, 5);
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let conf = parse("tabstop\nquittimes twelve\nnonsense 3\ntabstop 4 trailing\n");
        // `tabstop 4 trailing` still sets the first value; the rest is noise
        assert_eq!(conf.tab_stop, 4);
        assert_eq!(conf.quit_times, 3);
    }

    #[test]
    fn zero_tab_stop_is_rejected() {
        let conf = parse("tabstop 0\n");
        assert_eq!(conf.tab_stop, 8);
    }

    #[test]
    fn quit_times_can_be_zero() {
        let conf = parse("quittimes 0\n");
        assert_eq!(conf.quit_times, 0);
    }
}
