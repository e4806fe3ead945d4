//! Single trials of the query executable.

#![cfg(unix)]

mod common;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use common::{benchmark_script, ok_case, process_lock, read_log, write_script, Fixture, DISTANCES};
use shortest_paths_benchmarks::query_set::QuerySet;
use shortest_paths_benchmarks::structure::StructureHandle;
use shortest_paths_benchmarks::trial::{parse_distances, parse_sidecar, read_sidecar, TrialRunner};
use shortest_paths_benchmarks::{HarnessError, Method, ProcessError};

fn dijkstra(fx: &Fixture) -> StructureHandle {
    StructureHandle::new(Method::Dijkstra, fx.graph.clone())
}

/// Working directories recorded by the fake executable.
fn trial_dirs(fx: &Fixture) -> Vec<PathBuf> {
    read_log(fx.path(), "calls.log")
        .iter()
        .filter_map(|l| l.split_whitespace().next().map(PathBuf::from))
        .collect()
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn sidecar_with_two_lines_parses() {
    let m = parse_sidecar("0.0231\n48212\n").unwrap();
    assert_eq!(m.elapsed_secs, 0.0231);
    assert_eq!(m.peak_memory_kb, 48212);

    let m = parse_sidecar("1.5e-05\n1024").unwrap();
    assert_eq!(m.elapsed_secs, 1.5e-05);
}

#[test]
fn sidecar_must_have_exactly_two_parseable_lines() {
    for text in [
        "",
        "0.5\n",
        "0.5\n100\n7\n",
        "0.5\n\n100\n",
        "0.5\n100\n\n",
        "fast\n100\n",
        "0.5\n1.5\n",
        "-1\n100\n",
        "NaN\n1\n",
    ] {
        assert!(parse_sidecar(text).is_err(), "accepted {:?}", text);
    }
}

#[test]
fn distance_output_skips_its_header() {
    assert_eq!(
        parse_distances("queries.txt\n120\n340\n75\n").unwrap(),
        vec![120, 340, 75]
    );
    assert_eq!(parse_distances("3\n").unwrap(), Vec::<u64>::new());
    assert!(parse_distances("").is_err());
    assert!(parse_distances("h\n12\nx\n").is_err());
}

#[test]
fn sidecar_is_deleted_even_when_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("benchmark.txt");

    std::fs::write(&path, "garbage\n").unwrap();
    assert!(matches!(read_sidecar(&path), Err(HarnessError::MalformedSidecar { .. })));
    assert!(!path.exists());

    std::fs::write(&path, "0.25\n2048\n").unwrap();
    assert_eq!(read_sidecar(&path).unwrap().peak_memory_kb, 2048);
    assert!(!path.exists());
}

// =============================================================================
// Running
// =============================================================================

#[test]
fn trial_collects_time_memory_and_distances() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let exe = benchmark_script(fx.path(), &[("dijkstra", ok_case("0.02", "2048", &DISTANCES))]);
    let queries = QuerySet::load(&fx.queries).unwrap();

    let trial = TrialRunner::new(&exe)
        .run_trial(Method::Dijkstra, &dijkstra(&fx), &queries)
        .unwrap();

    assert_eq!(trial.elapsed_secs, 0.02);
    assert_eq!(trial.peak_memory_kb, 2048);
    assert_eq!(trial.distances, DISTANCES.to_vec());
}

#[test]
fn each_trial_runs_in_its_own_directory_which_is_removed() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let exe = benchmark_script(fx.path(), &[("dijkstra", ok_case("0.02", "2048", &DISTANCES))]);
    let queries = QuerySet::load(&fx.queries).unwrap();
    let runner = TrialRunner::new(&exe);

    for _ in 0..3 {
        runner.run_trial(Method::Dijkstra, &dijkstra(&fx), &queries).unwrap();
    }

    let dirs = trial_dirs(&fx);
    assert_eq!(dirs.len(), 3);
    assert_ne!(dirs[0], dirs[1]);
    assert_ne!(dirs[1], dirs[2]);
    assert!(dirs.iter().all(|d| !d.exists()));
    assert!(!fx.path().join("benchmark.txt").exists());
}

#[test]
fn arguments_are_absolute_and_include_the_mapping_file() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let exe = benchmark_script(fx.path(), &[("dijkstra", ok_case("0.02", "2048", &DISTANCES))]);
    let mapping = fx.path().join("mapping.csv");
    std::fs::write(&mapping, "1 0\n").unwrap();
    let queries = QuerySet::load(&fx.queries).unwrap();

    TrialRunner::new(&exe)
        .with_mapping_file(Some(mapping.clone()))
        .run_trial(Method::Dijkstra, &dijkstra(&fx), &queries)
        .unwrap();

    let call = read_log(fx.path(), "calls.log").remove(0);
    let canonical = |p: &Path| std::fs::canonicalize(p).unwrap().display().to_string();
    assert!(call.contains("-m dijkstra"), "{}", call);
    assert!(call.contains(&format!("--query-set {}", canonical(&fx.queries))), "{}", call);
    assert!(call.contains(&format!("--input-structure {}", canonical(&fx.graph))), "{}", call);
    assert!(call.contains(&format!("--mapping-file {}", canonical(&mapping))), "{}", call);
    assert!(call.contains("--output-path "), "{}", call);
}

#[test]
fn malformed_sidecar_fails_the_trial() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let case = "echo 0.02 > benchmark.txt\n{ echo h; echo 1; } > \"$out\"\n".to_string();
    let exe = benchmark_script(fx.path(), &[("dijkstra", case)]);
    let queries = QuerySet::load(&fx.queries).unwrap();

    let err = TrialRunner::new(&exe)
        .run_trial(Method::Dijkstra, &dijkstra(&fx), &queries)
        .unwrap_err();
    assert!(matches!(err, HarnessError::MalformedSidecar { .. }), "{:?}", err);
    assert!(err.is_measurement_error());
    assert!(trial_dirs(&fx).iter().all(|d| !d.exists()));
}

#[test]
fn missing_sidecar_fails_the_trial() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let case = "{ echo h; echo 1; } > \"$out\"\n".to_string();
    let exe = benchmark_script(fx.path(), &[("dijkstra", case)]);
    let queries = QuerySet::load(&fx.queries).unwrap();

    assert!(matches!(
        TrialRunner::new(&exe).run_trial(Method::Dijkstra, &dijkstra(&fx), &queries),
        Err(HarnessError::MalformedSidecar { .. })
    ));
}

#[test]
fn unparseable_distances_fail_the_trial() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let case = "echo 0.02 > benchmark.txt\necho 10 >> benchmark.txt\n{ echo h; echo inf; } > \"$out\"\n"
        .to_string();
    let exe = benchmark_script(fx.path(), &[("dijkstra", case)]);
    let queries = QuerySet::load(&fx.queries).unwrap();

    assert!(matches!(
        TrialRunner::new(&exe).run_trial(Method::Dijkstra, &dijkstra(&fx), &queries),
        Err(HarnessError::MalformedOutput { .. })
    ));
}

#[test]
fn non_zero_exit_is_a_process_error() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let exe = benchmark_script(fx.path(), &[("dijkstra", ok_case("0.02", "2048", &DISTANCES))]);
    let queries = QuerySet::load(&fx.queries).unwrap();
    let structure = StructureHandle::new(Method::Ch, fx.graph.clone());

    // The fake only knows dijkstra and rejects everything else.
    let err = TrialRunner::new(&exe)
        .run_trial(Method::Ch, &structure, &queries)
        .unwrap_err();
    match err {
        HarnessError::Process(ProcessError::NonZeroExit { output, .. }) => {
            assert!(output.contains("Invalid method 'ch'"), "{}", output);
        }
        other => panic!("expected a process error, got {:?}", other),
    }
}

#[test]
fn hanging_executable_is_killed_after_the_timeout() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let exe = write_script(fx.path(), "benchmark", "sleep 5\n");
    let queries = QuerySet::load(&fx.queries).unwrap();

    let start = Instant::now();
    let err = TrialRunner::new(&exe)
        .with_timeout(Some(Duration::from_millis(200)))
        .run_trial(Method::Dijkstra, &dijkstra(&fx), &queries)
        .unwrap_err();

    assert!(
        matches!(err, HarnessError::Process(ProcessError::Timeout { .. })),
        "{:?}",
        err
    );
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[test]
fn timeout_also_kills_background_workers() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let marker = fx.path().join("worker-finished");
    let exe = write_script(
        fx.path(),
        "benchmark",
        &format!("( sleep 2; touch \"{}\" ) &\nwait\n", marker.display()),
    );
    let queries = QuerySet::load(&fx.queries).unwrap();

    let err = TrialRunner::new(&exe)
        .with_timeout(Some(Duration::from_millis(200)))
        .run_trial(Method::Dijkstra, &dijkstra(&fx), &queries)
        .unwrap_err();
    assert!(
        matches!(err, HarnessError::Process(ProcessError::Timeout { .. })),
        "{:?}",
        err
    );

    std::thread::sleep(Duration::from_secs(3));
    assert!(!marker.exists(), "worker outlived the killed trial");
}

#[test]
fn unlaunchable_executable_is_a_process_error() {
    let _lock = process_lock();
    let fx = Fixture::new();
    let queries = QuerySet::load(&fx.queries).unwrap();

    assert!(matches!(
        TrialRunner::new(&fx.path().join("missing-binary"))
            .run_trial(Method::Dijkstra, &dijkstra(&fx), &queries),
        Err(HarnessError::Process(ProcessError::Spawn { .. }))
    ));
}

#[test]
fn structure_must_exist_and_match_the_method() {
    let fx = Fixture::new();
    let queries = QuerySet::load(&fx.queries).unwrap();
    let runner = TrialRunner::new(Path::new("unused"));

    let missing = StructureHandle::new(Method::Ch, fx.graph.join("TEST.ch"));
    assert!(matches!(
        runner.run_trial(Method::Ch, &missing, &queries),
        Err(HarnessError::MissingStructure { .. })
    ));

    assert!(matches!(
        runner.run_trial(Method::Ch, &dijkstra(&fx), &queries),
        Err(HarnessError::Config(_))
    ));
}
