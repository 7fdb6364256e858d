//! Configuration resolution tests
//!
//! Uses serial_test to prevent ENV variable race conditions: tests that touch
//! MOTHRA_CONFIG or MOTHRA_PUBLIC_FILES are marked #[serial].

use mothra_common::config::{MothraConfig, CONFIG_ENV_VAR, PUBLIC_FILES_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

#[test]
#[serial]
fn test_cli_path_takes_precedence_over_env() {
    let cli = write_config("bind_address = \"127.0.0.1:1111\"\n");
    let from_env = write_config("bind_address = \"127.0.0.1:2222\"\n");
    env::set_var(CONFIG_ENV_VAR, from_env.path());
    env::remove_var(PUBLIC_FILES_ENV_VAR);

    let config = MothraConfig::resolve(Some(cli.path()));
    assert_eq!(config.bind_address, "127.0.0.1:1111");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_config_file() {
    let from_env = write_config("[sdm]\nendpoint = \"http://localhost:8097\"\n");
    env::set_var(CONFIG_ENV_VAR, from_env.path());
    env::remove_var(PUBLIC_FILES_ENV_VAR);

    let config = MothraConfig::resolve(None);
    assert_eq!(config.sdm.endpoint, "http://localhost:8097");
    assert_eq!(config.sdm.timeout_secs, 3600);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(PUBLIC_FILES_ENV_VAR);

    let config = MothraConfig::resolve(Some(&PathBuf::from("/nonexistent/mothra.toml")));
    assert_eq!(config, MothraConfig::default());
}

#[test]
#[serial]
fn test_public_files_env_override() {
    let cli = write_config("public_files_root = \"/srv/from-file\"\n");
    env::set_var(PUBLIC_FILES_ENV_VAR, "/srv/from-env");

    let config = MothraConfig::resolve(Some(cli.path()));
    assert_eq!(config.public_files_root, PathBuf::from("/srv/from-env"));

    env::remove_var(PUBLIC_FILES_ENV_VAR);
}
