// src/infra/paths.rs — Config and output path management
//
// All paths respect the KOIBENCH_HOME environment variable for isolation.
// When KOIBENCH_HOME is set, config lives under that directory.
// When unset, config uses ~/.koibench/.

use std::path::PathBuf;

/// Returns the KOIBENCH_HOME override, if set.
fn koibench_home() -> Option<PathBuf> {
    std::env::var_os("KOIBENCH_HOME").map(PathBuf::from)
}

/// Home directory, or the working directory when none can be determined.
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $KOIBENCH_HOME/ or ~/.koibench/
pub fn config_dir() -> PathBuf {
    if let Some(home) = koibench_home() {
        return home;
    }
    dirs_home().join(".koibench")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default root for sandbox workspaces, relative to the working directory.
pub fn default_output_dir() -> PathBuf {
    PathBuf::from("bench_output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_under_config_dir() {
        let path = config_file_path();
        assert!(path.starts_with(config_dir()));
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }

    #[test]
    fn test_default_output_dir_is_relative() {
        assert!(default_output_dir().is_relative());
    }
}
