use std::env;
use std::fs;
use std::io;
use std::path::Path;

/// Returns the value of the environment variable `key`.
/// If the variable is not set, returns the provided fallback value or an empty string if no fallback is provided.
pub fn get_env(key: &str, fallback: Option<&str>) -> String {
    env::var(key).unwrap_or_else(|_| fallback.unwrap_or("").to_string())
}

/// Creates a folder (and any necessary parent directories) at `folder_path`.
pub fn create_folder(folder_path: &Path) -> io::Result<()> {
    fs::create_dir_all(folder_path)
}

/// Creates the parent directory of `file_path` if it has one and it is missing.
pub fn create_parent_folder(file_path: &Path) -> io::Result<()> {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_fallback() {
        assert_eq!(get_env("ADC_STREAM_SURELY_UNSET_VAR", Some("x")), "x");
        assert_eq!(get_env("ADC_STREAM_SURELY_UNSET_VAR", None), "");
    }

    #[test]
    fn test_create_parent_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("log.csv");
        create_parent_folder(&nested).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
        create_parent_folder(Path::new("log.csv")).unwrap();
        create_folder(&dir.path().join("series")).unwrap();
        assert!(dir.path().join("series").is_dir());
    }
}
