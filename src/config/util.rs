//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`
///
/// Walks up parent directories until finding `config_name`.
/// Returns the path to the config file if found
///
/// # Example
/// ```text
/// /home/user/talks/rust-intro/    ← deck directory
/// /home/user/talks/lectern.toml   ← found!
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None, // Reached filesystem root
        }
    }
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_next_to_start() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("lectern.toml"), "").unwrap();

        let found = find_config_file(dir.path(), Path::new("lectern.toml"));
        assert_eq!(found, Some(dir.path().join("lectern.toml")));
    }

    #[test]
    fn test_find_in_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("talks/intro");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("lectern.toml"), "").unwrap();

        let found = find_config_file(&nested, Path::new("lectern.toml"));
        assert_eq!(found, Some(dir.path().join("lectern.toml")));
    }

    #[test]
    fn test_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let found = find_config_file(dir.path(), Path::new("lectern-test-missing.toml"));
        assert_eq!(found, None);
    }
}
