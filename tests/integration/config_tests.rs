use figment::providers::Serialized;
use std::fs;
use tempfile::tempdir;
use ua::config::{ConfigError, ConfigOverrides, RunConfig};
use ua::duplicates::DuplicateFinder;
use ua::scanner::HashAlgorithm;

#[test]
fn test_config_defaults_without_sources() {
    let figment = figment::Figment::from(Serialized::defaults(RunConfig::default()));
    let config = RunConfig::from_figment(&figment).unwrap();
    assert_eq!(config, RunConfig::default());
    assert_eq!(config.algorithm, HashAlgorithm::Md5);
    assert_eq!(config.buffer_size, 1024);
    assert!(config.milestone);
    assert!(config.group_by_size);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
algorithm = "xxhash64"
ignore_case = true
byte_budget = 4096
two_stage = true
buffer_size = 8192
threads = 3
milestone = false
"#,
    )
    .unwrap();

    let figment = RunConfig::figment(Some(&config_path), "UA_IT_TOML_").unwrap();
    let config = RunConfig::from_figment(&figment).unwrap();

    assert_eq!(config.algorithm, HashAlgorithm::Xxh64);
    assert!(config.ignore_case);
    assert!(!config.ignore_whitespace);
    assert_eq!(config.byte_budget, 4096);
    assert!(config.two_stage);
    assert_eq!(config.buffer_size, 8192);
    assert_eq!(config.threads, 3);
    assert!(!config.milestone);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_env_overrides_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "algorithm = \"sha1\"\nthreads = 2\n").unwrap();

    std::env::set_var("UA_IT_ENV_ALGORITHM", "b3");
    std::env::set_var("UA_IT_ENV_IGNORE_WHITESPACE", "true");

    let figment = RunConfig::figment(Some(&config_path), "UA_IT_ENV_").unwrap();
    let config = RunConfig::from_figment(&figment).unwrap();

    assert_eq!(config.algorithm, HashAlgorithm::Blake3);
    assert!(config.ignore_whitespace);
    assert_eq!(config.threads, 2);

    std::env::remove_var("UA_IT_ENV_ALGORITHM");
    std::env::remove_var("UA_IT_ENV_IGNORE_WHITESPACE");
}

#[test]
fn test_config_cli_overrides_win() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "algorithm = \"sha1\"\nignore_case = true\n").unwrap();

    std::env::set_var("UA_IT_CLI_ALGORITHM", "sha256");

    let overrides = ConfigOverrides {
        algorithm: Some("md5".to_string()),
        buffer_size: Some(512),
        ..ConfigOverrides::default()
    };
    let figment = RunConfig::figment(Some(&config_path), "UA_IT_CLI_")
        .unwrap()
        .merge(Serialized::defaults(&overrides));
    let config = RunConfig::from_figment(&figment).unwrap();

    assert_eq!(config.algorithm, HashAlgorithm::Md5);
    assert_eq!(config.buffer_size, 512);
    assert!(config.ignore_case);

    std::env::remove_var("UA_IT_CLI_ALGORITHM");
}

#[test]
fn test_config_unknown_algorithm_is_reported() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "algorithm = \"sha265\"\n").unwrap();

    let figment = RunConfig::figment(Some(&config_path), "UA_IT_TYPO_").unwrap();
    let err = RunConfig::from_figment(&figment).unwrap_err();

    assert_eq!(
        err,
        ConfigError::UnknownAlgorithm {
            name: "sha265".to_string(),
            suggestion: Some("sha256"),
        }
    );
    assert!(err.to_string().contains("did you mean 'sha256'"));
}

#[test]
fn test_config_malformed_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "threads = \"many\"\n").unwrap();

    let figment = RunConfig::figment(Some(&config_path), "UA_IT_MALFORMED_").unwrap();
    assert!(matches!(
        RunConfig::from_figment(&figment),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_config_load_validates() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "two_stage = true\n").unwrap();

    let err = RunConfig::load(Some(&config_path), &ConfigOverrides::default()).unwrap_err();
    assert_eq!(err, ConfigError::TwoStageWithoutBudget);

    let overrides = ConfigOverrides {
        byte_budget: Some(64),
        ..ConfigOverrides::default()
    };
    let config = RunConfig::load(Some(&config_path), &overrides).unwrap();
    assert!(config.two_stage);
    assert_eq!(config.byte_budget, 64);
}

#[test]
fn test_config_missing_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("absent.toml");

    let err = RunConfig::load(Some(&config_path), &ConfigOverrides::default()).unwrap_err();
    assert_eq!(err, ConfigError::MissingFile(config_path));
}

#[test]
fn test_config_zero_buffer_rejected_before_run() {
    let overrides = ConfigOverrides {
        buffer_size: Some(0),
        ..ConfigOverrides::default()
    };
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let err = RunConfig::load(Some(&config_path), &overrides).unwrap_err();
    assert_eq!(err, ConfigError::ZeroBufferSize);
    let finder = DuplicateFinder::try_new(RunConfig::default().with_buffer_size(0));
    assert!(finder.is_err());
}
