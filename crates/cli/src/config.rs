use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_ENV: &str = "GCJ_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "gcj.toml";

///
/// Config
///
/// Contents of `gcj.toml`. Every key is optional.
///

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_path: String,
    pub seed_reference_data: bool,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "gCodeJournal.db".to_string(),
            seed_reference_data: true,
            log_filter: "gcj=info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("cannot parse configuration")
    }

    /// Loads the configuration named on the command line, else the one in
    /// `GCJ_CONFIG`, else `./gcj.toml`. Only the last may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match named {
            Some(path) => Self::read(&path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::read(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// The database path with environment references expanded.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(expand_vars(&self.database_path, |name| std::env::var(name).ok()))
    }
}

/// Replaces `$NAME` and `${NAME}` with `lookup(NAME)`. Unknown names are
/// left as written.
pub fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        let written = &rest[pos..pos + 1 + consumed];
        match lookup(name) {
            Some(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(if consumed == 0 { "$" } else { written }),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/home/ada".to_string()),
            "DATA" => Some("/srv/data".to_string()),
            _ => None,
        }
    }

    #[test]
    fn empty_file_means_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn keys_override_defaults() {
        let config = Config::from_toml(
            r#"
            database_path = "/tmp/journal.db"
            seed_reference_data = false
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path, "/tmp/journal.db");
        assert!(!config.seed_reference_data);
        assert_eq!(config.log_filter, "gcj=info");
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(Config::from_toml("database = \"x.db\"").is_err());
    }

    #[test]
    fn expands_plain_and_braced_references() {
        assert_eq!(expand_vars("$HOME/gcj.db", env), "/home/ada/gcj.db");
        assert_eq!(expand_vars("${DATA}_gcj.db", env), "/srv/data_gcj.db");
        assert_eq!(expand_vars("$HOME${DATA}", env), "/home/ada/srv/data");
    }

    #[test]
    fn leaves_unknown_or_malformed_references() {
        assert_eq!(expand_vars("$NOPE/gcj.db", env), "$NOPE/gcj.db");
        assert_eq!(expand_vars("${HOME", env), "${HOME");
        assert_eq!(expand_vars("cost$", env), "cost$");
        assert_eq!(expand_vars("a$/b", env), "a$/b");
    }

    #[test]
    fn reads_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcj.toml");
        std::fs::write(&path, "log_filter = \"gcj=debug\"\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.log_filter, "gcj=debug");
        assert!(config.seed_reference_data);
    }

    #[test]
    fn missing_named_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }
}
