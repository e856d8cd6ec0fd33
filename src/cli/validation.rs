//! CLI argument validation functions
//!
//! Value parsers for clap that reject bad input before any configuration is
//! loaded or any connection is opened.

use std::fs;
use std::path::PathBuf;

use crate::cache::validate_identifier;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate an entry identifier
pub fn validate_identifier_arg(value: &str) -> Result<String, String> {
    validate_identifier("entry identifier", value)
        .map(|_| value.to_string())
        .map_err(|e| format!("{}. Use 1-250 characters from a-z, A-Z, 0-9, _, %, -, &", e))
}

/// Validate a tag
pub fn validate_tag_arg(value: &str) -> Result<String, String> {
    validate_identifier("tag", value)
        .map(|_| value.to_string())
        .map_err(|e| format!("{}. Use 1-250 characters from a-z, A-Z, 0-9, _, %, -, &", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_config_file_path_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[cache]\nenabled = true").unwrap();

        let path_str = temp_file.path().to_str().unwrap();
        assert_eq!(
            validate_config_file_path(path_str).unwrap(),
            PathBuf::from(path_str)
        );
    }

    #[test]
    fn test_validate_config_file_path_nonexistent() {
        let err = validate_config_file_path("/nonexistent/config.toml").unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_validate_config_file_path_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = validate_config_file_path(temp_dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.contains("is not a file"));
    }

    #[test]
    fn test_validate_identifier_arg() {
        assert_eq!(validate_identifier_arg("user_42").unwrap(), "user_42");
        assert!(validate_identifier_arg("a%b&c-d").is_ok());
        assert!(validate_identifier_arg("").is_err());
        assert!(validate_identifier_arg("a.b").is_err());
        assert!(validate_identifier_arg(&"x".repeat(251)).is_err());
    }

    #[test]
    fn test_validate_tag_arg_mentions_tag() {
        let err = validate_tag_arg("bad tag").unwrap_err();
        assert!(err.contains("tag"));
    }
}
