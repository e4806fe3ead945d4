//! Command-line handling of the query-set generator.

use std::process::Command;

use shortest_paths_benchmarks::query_set::QuerySet;

fn gen_queries(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_gen-queries"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run gen-queries")
}

#[test]
fn writes_the_requested_query_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.txt");
    let out = gen_queries(&["--nodes", "50", "--count", "25", "--seed", "3", "-o", path.to_str().unwrap()]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let set = QuerySet::load(&path).unwrap();
    assert_eq!(set.len(), 25);
    assert_eq!(set.queries(), QuerySet::generate(25, 50, 3).as_slice());
}

#[test]
fn bad_values_are_rejected_not_defaulted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.txt");
    let target = path.to_str().unwrap();

    for args in [
        ["--nodes", "50", "--count", "many", "-o", target],
        ["--nodes", "50", "--seed", "-1", "-o", target],
        ["--nodes", "x", "--count", "10", "-o", target],
    ] {
        let out = gen_queries(&args);
        assert_eq!(out.status.code(), Some(2), "accepted {:?}", args);
        assert!(String::from_utf8_lossy(&out.stderr).contains("invalid value"));
        assert!(!path.exists());
    }
}

#[test]
fn missing_value_is_rejected() {
    let out = gen_queries(&["--nodes"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("needs a value"));
}
