use pagescore::options::ConfigFile;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

/// Test 1: ConfigFile deserialization from a valid TOML string.
#[test]
fn test_config_file_deserialization_valid_toml() {
    let toml_str = r#"
api_key = "abc123"
input_file = "~/urls.txt"
concurrency_limit = 10
report_path = "/tmp/lighthouse_reports.json"
response_path = "/tmp/response.json"
endpoint = "http://localhost:9999/runPagespeed"
user_agent = "MyBot/1.0"
"#;

    let config: ConfigFile = toml::from_str(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.api_key.as_deref(), Some("abc123"));
    assert_eq!(config.input_file.as_deref(), Some("~/urls.txt"));
    assert_eq!(config.concurrency_limit, Some(10));
    assert_eq!(
        config.report_path.as_deref(),
        Some("/tmp/lighthouse_reports.json")
    );
    assert_eq!(config.response_path.as_deref(), Some("/tmp/response.json"));
    assert_eq!(
        config.endpoint.as_deref(),
        Some("http://localhost:9999/runPagespeed")
    );
    assert_eq!(config.user_agent.as_deref(), Some("MyBot/1.0"));
}

/// Test 2: Unknown keys are rejected instead of silently ignored.
#[test]
fn test_config_file_rejects_unknown_keys() {
    let result: Result<ConfigFile, _> = toml::from_str("retries = 3\n");
    assert!(result.is_err());
}

/// Test 3: ConfigFile::load() with an explicit path that exists.
#[test]
fn test_config_file_load_existing_path() {
    let mut tmp = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        tmp,
        r#"
concurrency_limit = 20
api_key = "from-config"
"#
    )
    .expect("Failed to write temp file");

    let path = tmp.path().to_path_buf();
    let config = ConfigFile::load(Some(&path)).expect("Failed to load config");

    assert_eq!(config.concurrency_limit, Some(20));
    assert_eq!(config.api_key.as_deref(), Some("from-config"));
    assert!(config.user_agent.is_none());
}

/// Test 4: ConfigFile::load() with an explicit path that does not exist should error.
#[test]
fn test_config_file_load_nonexistent_path() {
    let path = PathBuf::from("/tmp/nonexistent_pagescore_config_12345.toml");
    let result = ConfigFile::load(Some(&path));

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(
        err.contains("not found"),
        "Error should mention 'not found', got: {}",
        err
    );
}

/// Test 5: Invalid TOML produces a readable error naming the file.
#[test]
fn test_config_file_load_invalid_toml() {
    let mut tmp = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(tmp, "concurrency_limit = \"many\"").unwrap();

    let path = tmp.path().to_path_buf();
    let err = ConfigFile::load(Some(&path)).unwrap_err();
    assert!(err.starts_with("Invalid config file"), "got: {}", err);
}

/// Test 6: Discovering a config in a directory without .pagescore.toml
/// should return a default (all-None) config.
#[test]
fn test_config_file_discover_without_default_file() {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let config = ConfigFile::discover(tmp_dir.path()).expect("Should return default config");
    assert!(config.api_key.is_none());
    assert!(config.concurrency_limit.is_none());
    assert!(config.report_path.is_none());
    assert!(config.endpoint.is_none());
}

/// Test 6b: A .pagescore.toml inside the directory is picked up.
#[test]
fn test_config_file_discover_reads_default_file() {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(
        tmp_dir.path().join(".pagescore.toml"),
        "api_key = \"from-dir\"\nconcurrency_limit = 7\n",
    )
    .unwrap();

    let config = ConfigFile::discover(tmp_dir.path()).expect("Config should load");
    assert_eq!(config.api_key.as_deref(), Some("from-dir"));
    assert_eq!(config.concurrency_limit, Some(7));
}

/// Test 7: CLI --config with a nonexistent path should produce an error.
#[test]
fn test_cli_config_nonexistent_path_errors() {
    let output = Command::new("cargo")
        .args([
            "run",
            "--quiet",
            "--",
            "https://example.com",
            "--config",
            "/tmp/nonexistent_pagescore_99999.toml",
        ])
        .output()
        .expect("Failed to execute pagescore binary");

    assert!(
        !output.status.success(),
        "Should fail with nonexistent config path"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("not found") || stderr.contains("invalid value"),
        "Error should mention missing config file, got: {}",
        stderr
    );
}

/// Test 8: Config values fill in options not given on the command line.
/// apply_config() checks std::env::args() for explicit flags, which the test
/// harness never passes, so every config value takes effect here.
#[test]
fn test_config_values_apply_over_defaults() {
    use clap::Parser;
    use pagescore::options::Cli;

    let mut tmp = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        tmp,
        r#"
concurrency_limit = 10
api_key = "from-config"
report_path = "/tmp/pagescore/out.json"
endpoint = "http://localhost:9999/run"
"#
    )
    .unwrap();

    let path = tmp.path().to_path_buf();
    let config = ConfigFile::load(Some(&path)).expect("Failed to load config");

    let mut cli = Cli::parse_from(["pagescore", "https://example.com"]);

    // Before applying config, values are the defaults.
    assert_eq!(cli.concurrency_limit, 30);
    assert_eq!(cli.report_path, PathBuf::from("lighthouse_reports.json"));

    let env_key = cli.api_key.clone();
    cli.apply_config(&config).expect("Config should apply");

    assert_eq!(cli.concurrency_limit, 10);
    assert_eq!(cli.report_path, PathBuf::from("/tmp/pagescore/out.json"));
    assert_eq!(cli.endpoint.as_str(), "http://localhost:9999/run");
    // A key from the environment wins over the config file.
    let expected_key = env_key.unwrap_or_else(|| "from-config".to_string());
    assert_eq!(cli.api_key.as_deref(), Some(expected_key.as_str()));
}

/// Test 9: An out of range concurrency limit in the config is rejected.
#[test]
fn test_config_concurrency_limit_out_of_range() {
    use clap::Parser;
    use pagescore::options::Cli;

    let config: ConfigFile = toml::from_str("concurrency_limit = 0").unwrap();
    let mut cli = Cli::parse_from(["pagescore"]);
    let err = cli.apply_config(&config).unwrap_err();
    assert!(err.contains("between 1 and 100"), "got: {}", err);
}
