// tests/error_handling.rs

mod common;

use std::io::Write;

use benchdag::config::load_and_validate;
use benchdag::errors::BenchError;
use benchdag::types::ItemSource;
use benchdag::workload::WorkloadRoot;
use common::ConfigFileBuilder;
use tempfile::NamedTempFile;

fn config_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{body}").unwrap();
    file
}

#[test]
fn full_config_parses_with_overrides_of_defaults() {
    let file = config_file(
        r#"
[config]
result_dir = "out/results"
concurrency = 4
max_items = 2
mode = "val"
label = "baseline"

[solver]
kind = "random"
seed = 9
actions = ["north", "south"]

[[workload]]
path = "envs/grid_a"

[[workload]]
path = "envs/grid_b"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.config.concurrency, 4);
    assert_eq!(cfg.config.max_items, Some(2));
    assert_eq!(cfg.config.mode, ItemSource::Val);
    assert_eq!(cfg.config.label, "baseline");
    assert_eq!(cfg.solver.seed, 9);
    assert_eq!(cfg.workload.len(), 2);
    assert_eq!(WorkloadRoot::real(&cfg.workload[1].path).name(), "grid_b");
}

#[test]
fn minimal_config_gets_defaults() {
    let file = config_file("[[workload]]\npath = \"envs/only\"\n");

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.config.concurrency, 1);
    assert_eq!(cfg.config.max_items, Some(5));
    assert_eq!(cfg.config.mode, ItemSource::Test);
    assert_eq!(cfg.config.result_dir.to_str(), Some("workspace/logs/results"));
    assert_eq!(cfg.solver.kind, "random");
    assert_eq!(cfg.solver.actions.len(), 4);
}

#[test]
fn config_without_workloads_is_rejected() {
    let file = config_file("[config]\nconcurrency = 2\n");

    match load_and_validate(file.path()) {
        Err(BenchError::ConfigError(msg)) => assert!(msg.contains("[[workload]]")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn bad_mode_is_a_toml_error() {
    let file = config_file("[config]\nmode = \"train\"\n\n[[workload]]\npath = \"w\"\n");

    assert!(matches!(
        load_and_validate(file.path()),
        Err(BenchError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Bench.toml"),
        Err(BenchError::IoError(_))
    ));
}

#[test]
fn builder_validation_catches_bad_values() {
    let cases = [
        (ConfigFileBuilder::new(), "at least one"),
        (
            ConfigFileBuilder::new().with_workload("w").with_concurrency(0),
            "concurrency",
        ),
        (
            ConfigFileBuilder::new().with_workload("w").with_max_items(Some(0)),
            "max_items",
        ),
        (
            ConfigFileBuilder::new().with_workload("w").with_workload("w"),
            "more than once",
        ),
        (
            ConfigFileBuilder::new().with_workload("w").with_solver_kind("oracle"),
            "unknown [solver].kind",
        ),
        (
            ConfigFileBuilder::new().with_workload("w").with_actions(&[]),
            "at least one action",
        ),
    ];

    for (builder, needle) in cases {
        match builder.try_build() {
            Err(BenchError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "'{msg}' should mention '{needle}'")
            }
            other => panic!("expected ConfigError mentioning '{needle}', got {other:?}"),
        }
    }

    let ok = ConfigFileBuilder::new()
        .with_workload("w")
        .with_max_items(None)
        .with_mode(ItemSource::Val)
        .build();
    assert_eq!(ok.config.max_items, None);
}

#[test]
fn resolution_errors_are_classified() {
    let resolution = BenchError::MissingResource {
        workload: "w".into(),
        item: "x".into(),
    };
    let runtime = BenchError::Other(anyhow::anyhow!("solver crashed"));
    let cycle = BenchError::CycleDetected("a".into());

    assert!(resolution.is_workload_resolution());
    assert!(!runtime.is_workload_resolution());
    assert!(!cycle.is_workload_resolution());
}
