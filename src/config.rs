//! Layered TOML configuration shared across toolkit consumers.
//!
//! Projects using the toolkit keep `ems.toml` files next to their data:
//! machine-wide defaults in the home directory, per-project overrides in the
//! working directory or any of its ancestors, and an optional `instance/`
//! directory for deployment-local settings. [`Config::load`] finds every
//! candidate, merges them with the nearest file winning, and exposes typed
//! access to the merged tree.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use toml::{Table, Value};

/// File name searched for in every candidate directory.
pub const CONFIG_FILE_NAME: &str = "ems.toml";

/// Errors raised while loading or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A candidate file exists but could not be read.
    #[error("cannot read config \"{path}\": {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// A candidate file is not valid TOML.
    #[error("invalid config \"{path}\": {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// A section exists but does not deserialize into the requested type.
    #[error("config section `{section}` has unexpected shape: {source}")]
    Section {
        section: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Logging settings read from the `[logging]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directives in `env_logger` syntax, e.g. `"info,ems_toolkit=debug"`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Merged configuration tree plus the files that contributed to it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    root: Table,
    sources: Vec<PathBuf>,
}

impl Config {
    /// Loads configuration for the current process.
    ///
    /// Candidates come from [`candidate_paths`] using the current working
    /// directory and `$HOME`; missing candidates are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an existing candidate cannot be read or
    /// parsed. Discovery itself never fails: with no working directory and
    /// no home, the result is simply empty.
    pub fn load() -> Result<Self, ConfigError> {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let home = env::var_os("HOME").map(PathBuf::from);
        Self::load_from(&cwd, home.as_deref())
    }

    /// Loads configuration rooted at an explicit directory and home.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Config::load`].
    pub fn load_from(cwd: &Path, home: Option<&Path>) -> Result<Self, ConfigError> {
        let candidates = candidate_paths(cwd, home);
        let mut root = Table::new();
        let mut sources = Vec::new();

        // Candidates are ordered nearest-first; apply them furthest-first so
        // that each nearer file overrides what came before it.
        for path in candidates.iter().rev() {
            if !path.is_file() {
                continue;
            }
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let table: Table = toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
            debug!("merging config from {}", path.display());
            merge_table(&mut root, table);
            sources.push(path.clone());
        }

        Ok(Self { root, sources })
    }

    /// The merged configuration tree.
    pub fn root(&self) -> &Table {
        &self.root
    }

    /// Files that contributed to the merge, lowest precedence first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Looks a value up by dotted path, e.g. `"datasources.influx.host"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// Deserializes the subtree at `path` into `T`.
    ///
    /// Returns `Ok(None)` if the path is absent; an absent section is a
    /// normal condition, a malformed one is not.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Section`] if the subtree exists but does not
    /// match `T`.
    pub fn section<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ConfigError> {
        match self.get(path) {
            None => Ok(None),
            Some(value) => value
                .clone()
                .try_into()
                .map(Some)
                .map_err(|source| ConfigError::Section {
                    section: path.to_string(),
                    source,
                }),
        }
    }

    /// Initializes the global logger from the `[logging]` table.
    ///
    /// Returns `true` if a logging section was present and applied. Safe to
    /// call more than once; a logger that is already installed stays in
    /// place.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Section`] if the `[logging]` table is
    /// malformed.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        let Some(logging) = self.section::<LoggingConfig>("logging")? else {
            return Ok(false);
        };
        let _ = env_logger::Builder::new()
            .parse_filters(&logging.filter)
            .try_init();
        Ok(true)
    }
}

/// Candidate config file locations for a working directory and home,
/// nearest (highest precedence) first:
///
/// - `<cwd>/instance/ems.toml`
/// - `<cwd>/ems.toml`, then the same in each ancestor of `<cwd>`
/// - `<home>/ems.toml`
/// - `<home>/.ems.toml`
pub fn candidate_paths(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join("instance").join(CONFIG_FILE_NAME)];
    let mut dir = Some(cwd);
    while let Some(d) = dir {
        paths.push(d.join(CONFIG_FILE_NAME));
        dir = d.parent();
    }
    if let Some(home) = home {
        paths.push(home.join(CONFIG_FILE_NAME));
        paths.push(home.join(format!(".{CONFIG_FILE_NAME}")));
    }
    paths
}

/// Merges `overlay` into `base`. Tables merge key-by-key recursively; any
/// other value in the overlay replaces the base value outright.
fn merge_table(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_table(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(path, content).expect("write config");
    }

    #[test]
    fn candidates_are_ordered_nearest_first() {
        let paths = candidate_paths(Path::new("/data/projects/webike"), Some(Path::new("/home/u")));
        let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "/data/projects/webike/instance/ems.toml",
                "/data/projects/webike/ems.toml",
                "/data/projects/ems.toml",
                "/data/ems.toml",
                "/ems.toml",
                "/home/u/ems.toml",
                "/home/u/.ems.toml",
            ]
        );
    }

    #[test]
    fn no_files_found_yields_empty_config() {
        let dir = tempdir().expect("tempdir");
        let config = Config::load_from(dir.path(), None).expect("load");
        assert!(config.is_empty());
        assert!(config.sources().is_empty());
    }

    #[test]
    fn nearer_file_overrides_further_file() {
        let dir = tempdir().expect("tempdir");
        let project = dir.path().join("project");
        write(
            &dir.path().join("ems.toml"),
            "[datasources.influx]\nhost = \"shared-host\"\nport = 8086\n",
        );
        write(
            &project.join("ems.toml"),
            "[datasources.influx]\nhost = \"local-host\"\n",
        );

        let config = Config::load_from(&project, None).expect("load");
        assert_eq!(
            config.get("datasources.influx.host").and_then(Value::as_str),
            Some("local-host")
        );
        // Keys absent from the nearer file survive from the further one.
        assert_eq!(
            config
                .get("datasources.influx.port")
                .and_then(Value::as_integer),
            Some(8086)
        );
        assert_eq!(config.sources().len(), 2);
    }

    #[test]
    fn instance_dir_takes_precedence_over_project_file() {
        let dir = tempdir().expect("tempdir");
        write(&dir.path().join("ems.toml"), "run = \"project\"\n");
        write(
            &dir.path().join("instance").join("ems.toml"),
            "run = \"instance\"\n",
        );

        let config = Config::load_from(dir.path(), None).expect("load");
        assert_eq!(config.get("run").and_then(Value::as_str), Some("instance"));
    }

    #[test]
    fn home_files_have_lowest_precedence() {
        let dir = tempdir().expect("tempdir");
        let home = dir.path().join("home");
        let project = dir.path().join("project");
        write(&home.join("ems.toml"), "source = \"home\"\ndefaults = true\n");
        write(&project.join("ems.toml"), "source = \"project\"\n");

        let config = Config::load_from(&project, Some(&home)).expect("load");
        assert_eq!(config.get("source").and_then(Value::as_str), Some("project"));
        assert_eq!(config.get("defaults").and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn section_deserializes_typed_settings() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Influx {
            host: String,
            db: String,
        }

        let dir = tempdir().expect("tempdir");
        write(
            &dir.path().join("ems.toml"),
            "[webike.influx]\nhost = \"sd959\"\ndb = \"webike\"\n",
        );

        let config = Config::load_from(dir.path(), None).expect("load");
        let influx: Option<Influx> = config.section("webike.influx").expect("well-formed");
        assert_eq!(
            influx,
            Some(Influx {
                host: "sd959".to_string(),
                db: "webike".to_string(),
            })
        );
    }

    #[test]
    fn absent_section_is_none() {
        let config = Config::default();
        let missing: Option<LoggingConfig> = config.section("logging").expect("absent is fine");
        assert!(missing.is_none());
    }

    #[test]
    fn malformed_section_reports_path() {
        let dir = tempdir().expect("tempdir");
        write(&dir.path().join("ems.toml"), "[logging]\nfilter = 42\n");

        let config = Config::load_from(dir.path(), None).expect("load");
        let err = config.section::<LoggingConfig>("logging").unwrap_err();
        assert!(err.to_string().contains("logging"));
    }

    #[test]
    fn invalid_toml_reports_file() {
        let dir = tempdir().expect("tempdir");
        write(&dir.path().join("ems.toml"), "not valid = = toml\n");

        let err = Config::load_from(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("ems.toml"));
    }

    #[test]
    fn init_logging_without_section_is_noop() {
        let config = Config::default();
        assert!(!config.init_logging().expect("no section"));
    }

    #[test]
    fn init_logging_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        write(&dir.path().join("ems.toml"), "[logging]\nfilter = \"debug\"\n");
        let config = Config::load_from(dir.path(), None).expect("load");
        assert!(config.init_logging().expect("apply"));
        assert!(config.init_logging().expect("second apply"));
    }
}
