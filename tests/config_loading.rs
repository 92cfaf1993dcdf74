// tests/config_loading.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder, WatchRuleBuilder};

use std::fs;

use taskwatch::config::{load_and_validate, load_from_path, ConfigFile};
use taskwatch::errors::TaskwatchError;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn loads_a_config_file_from_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Taskwatch.toml");
    fs::write(
        &path,
        r#"
        [options]
        ignore_initial = true

        [task.fmt]
        cmd = "cargo fmt"

        [task.build]
        cmd = "cargo build"
        after = ["fmt"]

        [task.ci]
        after = ["build"]

        [[watch]]
        pattern = ["src/**/*.rs", "Cargo.toml"]
        options = { depth = 8 }
        tasks = ["build"]
        "#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.task.len(), 3);
    assert!(cfg.task["ci"].cmd.is_none());
    assert_eq!(cfg.watch[0].tasks, vec!["build".to_string()]);

    let settings = cfg.options.merged(cfg.watch[0].options.as_ref().unwrap()).resolve()?;
    assert!(settings.ignore_initial);
    assert_eq!(settings.depth, Some(8));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_from_path("/definitely/not/here/Taskwatch.toml").unwrap_err();
    assert!(matches!(err, TaskwatchError::IoError(_)));
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Taskwatch.toml");
    fs::write(&path, "[task.a\ncmd = ")?;

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, TaskwatchError::TomlError(_)));
    Ok(())
}

#[test]
fn unknown_dependency_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::new("true").after("ghost").build())
        .build_raw();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("unknown dependency 'ghost'"));
}

#[test]
fn self_dependency_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::new("true").after("a").build())
        .build_raw();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("cannot depend on itself"));
}

#[test]
fn invalid_default_options_are_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_option("depth", "deep")
        .with_task("a", TaskConfigBuilder::new("true").build())
        .build_raw();

    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(TaskwatchError::ConfigError(_))
    ));
}

#[test]
fn builder_configs_validate() {
    let cfg = ConfigFileBuilder::new()
        .with_option("ignore_initial", true)
        .with_task("lint", TaskConfigBuilder::new("true").build())
        .with_task("all", TaskConfigBuilder::group().after("lint").build())
        .with_watch(
            WatchRuleBuilder::new(["src/**/*.rs"])
                .option("depth", 2)
                .task("all")
                .build(),
        )
        .build();

    assert_eq!(cfg.watch.len(), 1);
    assert!(cfg.task["all"].cmd.is_none());
}
