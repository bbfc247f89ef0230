//! Integration tests for trueno-apsp
//!
//! End-to-end runs of each substrate against the 8×8 reference fixture, plus
//! the `apsp` binary's observable behavior.

use std::process::Command;
use std::thread;
use trueno_apsp::cluster::{world, Topology};
use trueno_apsp::{
    emulated_floyd_warshall, floyd_warshall, reference_fixture, run_cluster, BandSplit,
    ClusterConfig, ClusterError, LaunchConfig, PivotScope, WeightMatrix,
};

/// Shortest-path distances of the reference fixture
const FIXTURE_DISTANCES: [[i32; 8]; 8] = [
    [0, 2, 6, 3, 7, 5, 4, 5],
    [2, 0, 4, 1, 5, 5, 3, 4],
    [6, 4, 0, 5, 2, 5, 6, 7],
    [3, 1, 5, 0, 4, 6, 4, 5],
    [7, 5, 2, 4, 0, 3, 5, 6],
    [5, 5, 5, 6, 3, 0, 2, 3],
    [4, 3, 6, 4, 5, 2, 0, 1],
    [5, 4, 7, 5, 6, 3, 1, 0],
];

fn fixture_distances() -> WeightMatrix<i32> {
    WeightMatrix::from_rows(&FIXTURE_DISTANCES).unwrap()
}

#[test]
fn test_reference_fixture_distances() {
    let result = floyd_warshall(&reference_fixture::<i32>());
    assert_eq!(result, fixture_distances());
    assert!(result.satisfies_triangle_inequality());
}

#[test]
fn test_cluster_fixture_for_unit_counts() {
    for units in 2..=9 {
        let run = run_cluster(&reference_fixture::<i32>(), &ClusterConfig::with_units(units))
            .unwrap();
        assert_eq!(run.result, fixture_distances(), "units = {units}");
        assert!(run.replicas_consistent(), "units = {units}");
        assert_eq!(run.replicas.len(), units);
    }
}

#[test]
fn test_every_split_and_scope_agree() {
    // Row k is broadcast from whichever unit the scope names; every
    // combination must settle on the same distances.
    let seed = reference_fixture::<i32>();
    for split in [BandSplit::DomainHalves, BandSplit::PerUnit] {
        for scope in [PivotScope::IntraDomain, PivotScope::Global] {
            let config = ClusterConfig::with_units(5)
                .band_split(split)
                .pivot_scope(scope);
            let run = run_cluster(&seed, &config).unwrap();
            assert_eq!(run.result, fixture_distances(), "{split:?} / {scope:?}");
        }
    }
}

#[test]
fn test_cluster_history_is_monotone() {
    let config = ClusterConfig::with_units(4).record_history(true);
    let run = run_cluster(&reference_fixture::<i32>(), &config).unwrap();

    assert_eq!(run.history.len(), 8);
    assert!(run.history[0].is_pointwise_le(&run.initial));
    for pair in run.history.windows(2) {
        assert!(pair[1].is_pointwise_le(&pair[0]));
    }
    assert_eq!(run.history[7], run.result);
}

#[test]
fn test_minimum_unit_guard() {
    let err = run_cluster(&reference_fixture::<i32>(), &ClusterConfig::with_units(1)).unwrap_err();
    assert!(matches!(err, ClusterError::InsufficientUnits { found: 1 }));
}

#[test]
fn test_domains_are_isolated() {
    let size = 5;
    let values: Vec<i32> = thread::scope(|scope| {
        let handles: Vec<_> = world::<i32>(size)
            .into_iter()
            .map(|mut comm| {
                scope.spawn(move || {
                    let topology = Topology::build(&mut comm).unwrap();
                    #[allow(clippy::cast_possible_wrap)]
                    let mut buf = [topology.world_rank() as i32];
                    if let Some(local) = topology.local().handle() {
                        local.broadcast(&mut buf, 0).unwrap();
                    }
                    topology.release();
                    buf[0]
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Even units hear world rank 0, odd units hear world rank 1
    assert_eq!(values, vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_device_fixture() {
    let mut m = reference_fixture::<f32>();
    let report = emulated_floyd_warshall(&mut m, &LaunchConfig::with_lanes(4)).unwrap();
    assert_eq!(report.launches, 8);
    assert_eq!(m, fixture_distances().map(|w| w as f32));
}

#[test]
fn test_cli_cluster_prints_both_matrices() {
    let output = Command::new(env!("CARGO_BIN_EXE_apsp"))
        .args(["cluster", "--units", "4"])
        .env_remove("TRUENO_APSP_UNITS")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let (initial, after) = stdout.split_once("Matrix After Processing").unwrap();
    assert!(initial.starts_with("Initial Matrix"));
    assert!(initial.contains("   0    2    9 "));
    assert!(after.contains("   0    2    6    3    7    5    4    5 "));
}

#[test]
fn test_cli_single_unit_exits_cleanly() {
    let output = Command::new(env!("CARGO_BIN_EXE_apsp"))
        .args(["cluster", "--units", "1"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Please run this program with at least 2 processes."));
    assert!(!stdout.contains("Matrix After"));
}

#[test]
fn test_cli_units_from_environment() {
    let output = Command::new(env!("CARGO_BIN_EXE_apsp"))
        .arg("cluster")
        .env("TRUENO_APSP_UNITS", "1")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("at least 2 processes"));
}

#[test]
fn test_cli_device_emulated() {
    let output = Command::new(env!("CARGO_BIN_EXE_apsp"))
        .args(["device", "--size", "4", "--lanes", "2", "--backend", "emulated"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Initial Matrix:"));
    assert!(stdout.contains("Final Matrix:"));
}
