//! Optional JSON configuration for the CLI
//!
//! ```json
//! { "lists": ["waf.sigs"], "nocase": true, "match_all": false, "chunk_size": 4096 }
//! ```
//!
//! Values given on the command line take precedence over the file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use sm_compiler::CompileOptions;

pub const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub lists: Vec<String>,
    pub nocase: bool,
    pub match_all: bool,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lists: Vec::new(),
            nocase: false,
            match_all: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Flags collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub lists: Vec<String>,
    pub nocase: bool,
    pub match_all: bool,
    pub chunk_size: Option<usize>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {}", path.display(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("Invalid config '{}': {}", path.display(), e))
    }

    /// Load `path` if given, then apply command-line overrides.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self, String> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if !overrides.lists.is_empty() {
            config.lists = overrides.lists;
        }
        config.nocase |= overrides.nocase;
        config.match_all |= overrides.match_all;
        if let Some(chunk_size) = overrides.chunk_size {
            config.chunk_size = chunk_size;
        }

        if config.chunk_size == 0 {
            return Err("chunk_size must be greater than zero".to_string());
        }
        if config.lists.is_empty() {
            return Err("No input files specified".to_string());
        }
        Ok(config)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            nocase: self.nocase,
            match_all: self.match_all,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(json.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(
            r#"{"lists": ["a.sigs", "b.sigs"], "nocase": true, "match_all": true, "chunk_size": 512}"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.lists, vec!["a.sigs", "b.sigs"]);
        assert!(config.nocase);
        assert!(config.match_all);
        assert_eq!(config.chunk_size, 512);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let file = write_config(r#"{"lists": ["a.sigs"]}"#);
        let config = Config::load(file.path()).unwrap();
        assert!(!config.nocase);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn rejects_unknown_fields() {
        let file = write_config(r#"{"lists": [], "case_fold": true}"#);
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.contains("case_fold"), "{err}");
    }

    #[test]
    fn flags_override_file() {
        let file = write_config(r#"{"lists": ["file.sigs"], "chunk_size": 100}"#);
        let config = Config::resolve(
            Some(file.path()),
            Overrides {
                lists: vec!["cli.sigs".to_string()],
                nocase: true,
                match_all: false,
                chunk_size: Some(8),
            },
        )
        .unwrap();
        assert_eq!(config.lists, vec!["cli.sigs"]);
        assert!(config.nocase);
        assert_eq!(config.chunk_size, 8);
        assert_eq!(
            config.compile_options(),
            CompileOptions {
                nocase: true,
                match_all: false
            }
        );
    }

    #[test]
    fn requires_lists_and_positive_chunk() {
        assert!(Config::resolve(None, Overrides::default()).is_err());
        let err = Config::resolve(
            None,
            Overrides {
                lists: vec!["x".to_string()],
                chunk_size: Some(0),
                ..Overrides::default()
            },
        )
        .unwrap_err();
        assert!(err.contains("chunk_size"));
    }
}
