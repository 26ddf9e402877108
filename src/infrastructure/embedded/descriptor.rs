//! Store descriptor parsing
//!
//! Accepted forms:
//! - `memory:` / `memory` / `mem:`: volatile in-process store
//! - `file:<path>` / `file://<path>`: TOML forest file
//! - `<path>.toml`: shorthand for `file:<path>.toml`
//!
//! Paths go through `~` and `$VAR` expansion.

use std::path::PathBuf;
use std::str::FromStr;

use crate::infrastructure::error::StorageError;
use crate::util::path::expand_env_vars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreDescriptor {
    Memory,
    TomlFile(PathBuf),
}

impl FromStr for StoreDescriptor {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(StorageError::InvalidDescriptor(s.to_string()));
        }

        if matches!(raw, "memory" | "memory:" | "mem:") {
            return Ok(Self::Memory);
        }

        let path = if let Some(rest) = raw.strip_prefix("file:") {
            rest.strip_prefix("//").unwrap_or(rest)
        } else if raw.ends_with(".toml") {
            raw
        } else {
            return Err(StorageError::InvalidDescriptor(s.to_string()));
        };

        if path.trim().is_empty() {
            return Err(StorageError::InvalidDescriptor(s.to_string()));
        }
        Ok(Self::TomlFile(PathBuf::from(expand_env_vars(path.trim()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("memory:")]
    #[case("memory")]
    #[case(" mem: ")]
    fn given_memory_forms_when_parsing_then_memory(#[case] input: &str) {
        assert_eq!(input.parse::<StoreDescriptor>().unwrap(), StoreDescriptor::Memory);
    }

    #[rstest]
    #[case("file:/tmp/forest.toml", "/tmp/forest.toml")]
    #[case("file:///tmp/forest.toml", "/tmp/forest.toml")]
    #[case("data/forest.toml", "data/forest.toml")]
    fn given_file_forms_when_parsing_then_toml_file(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            input.parse::<StoreDescriptor>().unwrap(),
            StoreDescriptor::TomlFile(PathBuf::from(expected))
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("file:")]
    #[case("postgres://localhost/forest")]
    fn given_unusable_descriptor_when_parsing_then_invalid(#[case] input: &str) {
        assert!(matches!(
            input.parse::<StoreDescriptor>(),
            Err(StorageError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn given_tilde_when_parsing_then_expands_home() {
        let home = std::env::var("HOME").expect("HOME should be set");
        let StoreDescriptor::TomlFile(path) = "file:~/forest.toml".parse().unwrap() else {
            panic!("expected file descriptor");
        };
        assert!(path.starts_with(&home), "{}", path.display());
    }
}
