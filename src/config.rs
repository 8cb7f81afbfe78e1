// Runtime configuration shared by the `sen` and `sen-server` binaries

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the records database
pub const DATABASE_ENV: &str = "SEN_DATABASE";

/// Database file used when neither the flag nor the environment names one
pub const DEFAULT_DATABASE: &str = "sen.db";

/// Log filter used when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "sen_records=info";

/// Header rows skipped per file unless `--skip` says otherwise
pub const DEFAULT_SKIP: usize = 1;

/// Pick the database path.
///
/// Priority: command-line flag, then environment value, then `sen.db`.
/// Blank values count as unset.
pub fn resolve_database_path(cli_arg: Option<&str>, env_value: Option<&str>) -> PathBuf {
    if let Some(path) = cli_arg.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }

    if let Some(path) = env_value.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_DATABASE)
}

/// Database path for this process, reading `SEN_DATABASE`
pub fn database_path(cli_arg: Option<&str>) -> PathBuf {
    let env_value = std::env::var(DATABASE_ENV).ok();
    resolve_database_path(cli_arg, env_value.as_deref())
}

/// Install the fmt subscriber on stderr; stdout is reserved for row diagnostics
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins() {
        let path = resolve_database_path(Some("cli.db"), Some("env.db"));
        assert_eq!(path, PathBuf::from("cli.db"));
    }

    #[test]
    fn test_env_before_default() {
        assert_eq!(resolve_database_path(None, Some("env.db")), PathBuf::from("env.db"));
        assert_eq!(resolve_database_path(None, None), PathBuf::from(DEFAULT_DATABASE));
    }

    #[test]
    fn test_blank_values_are_unset() {
        assert_eq!(
            resolve_database_path(Some("  "), Some("")),
            PathBuf::from(DEFAULT_DATABASE)
        );
    }
}
