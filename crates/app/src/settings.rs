//! Layered configuration loading.

use config::{Config, ConfigError, Environment, File};
use tic_core::config::AppConfig;

/// Default location of the TOML file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/tic.toml";

/// # Summary
/// Loads [`AppConfig`] from the TOML file and the environment.
///
/// # Logic
/// 1. Built-in defaults (`#[serde(default)]` on every section).
/// 2. The TOML file at `path`, if it exists.
/// 3. `TIC__<SECTION>__<KEY>` environment variables, e.g.
///    `TIC__SERVER__PORT=9000` or `TIC__ADMIN__EMAILS=a@x.com,b@x.com`.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("TIC")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("admin.emails")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.data_dir, "data");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tic.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100
jwt_secret = "s3cret"

[admin]
emails = ["ops@ticgloballtd.com"]
token_ttl_secs = 3600
"#
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.jwt_secret, "s3cret");
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.admin.is_allowed("ops@ticgloballtd.com"));
        assert_eq!(config.admin.token_ttl_secs, 3600);
        assert!(config.notify.email.is_none());
    }
}
