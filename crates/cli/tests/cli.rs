use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn porkchop() -> Command {
    Command::cargo_bin("porkchop").expect("porkchop bin")
}

#[test]
fn earth_mars_2005_writes_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    porkchop()
        .args([
            "--from",
            "Earth",
            "--to",
            "Mars",
            "--depart-start",
            "2005-06-01",
            "--depart-end",
            "2005-10-01",
            "--arrive-start",
            "2005-12-01",
            "--arrive-end",
            "2006-06-01",
            "--step-days",
            "10",
            "--output-dir",
        ])
        .arg(dir.path())
        .args(["--csv", "--json", "--mesh", "--morph", "log_10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Minimum C3"))
        .stdout(predicate::str::contains("CSV written to"));

    let csv = fs::read_to_string(dir.path().join("porkchop.csv")).expect("csv");
    // 13 departures x 19 arrivals plus the header.
    assert_eq!(csv.lines().count(), 13 * 19 + 1);

    let json = fs::read_to_string(dir.path().join("porkchop.json")).expect("json");
    assert!(json.contains("\"departure_body\": \"Earth\""));
    assert!(json.contains("\"c3_km2_s2\""));

    let vtp = fs::read_to_string(dir.path().join("porkchop.vtp")).expect("vtp");
    assert!(vtp.contains(r#"NumberOfPoints="247""#));
}

#[test]
fn oversized_grid_exits_with_three() {
    porkchop()
        .args([
            "--from",
            "earth",
            "--to",
            "mars",
            "--depart-start",
            "1900-01-01",
            "--depart-end",
            "2100-01-01",
            "--arrive-start",
            "1900-01-01",
            "--arrive-end",
            "2100-01-01",
            "--step-days",
            "0.5",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("exceeds the limit"));
}

#[test]
fn arrival_before_departure_exits_with_two() {
    porkchop()
        .args([
            "--from",
            "earth",
            "--to",
            "mars",
            "--depart-start",
            "2005-06-01",
            "--depart-end",
            "2005-07-01",
            "--arrive-start",
            "2005-01-01",
            "--arrive-end",
            "2005-02-01",
            "--step-days",
            "10",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("transfers infeasible"))
        .stderr(predicate::str::contains("no feasible transfer"));
}

#[test]
fn unknown_body_is_a_general_error() {
    porkchop()
        .args([
            "--from",
            "earth",
            "--to",
            "vulcan",
            "--depart-start",
            "2005-06-01",
            "--depart-end",
            "2005-06-11",
            "--arrive-start",
            "2006-01-01",
            "--arrive-end",
            "2006-01-11",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("vulcan"));
}
