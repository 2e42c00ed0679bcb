use std::fs;

use astrochop::ephemeris::MeanElementEphemeris;
use astrochop::export::{
    DataGrid, ExportError, Morph, OutputGuard, PorkchopMesh, RunSummary, read_grid_records,
    write_grid_csv, write_summary, write_vtp,
};
use astrochop::transfer::{
    PorkchopGridEngine, PorkchopOutcome, PorkchopRequest, PorkchopSettings, TimeWindow,
};

fn small_outcome() -> PorkchopOutcome {
    let departures = TimeWindow::from_dates("2005-07-01", "2005-09-01", 20.0)
        .expect("window")
        .epochs();
    let arrivals = TimeWindow::from_dates("2005-12-01", "2006-03-01", 30.0)
        .expect("window")
        .epochs();
    PorkchopGridEngine::heliocentric(&PorkchopSettings::default())
        .expect("engine")
        .generate(
            &PorkchopRequest {
                departure_body: "earth",
                arrival_body: "mars",
                departure_epochs: &departures,
                arrival_epochs: &arrivals,
            },
            &MeanElementEphemeris::builtin(),
        )
        .expect("grid")
}

fn ramp() -> DataGrid {
    // 3 departures × 2 arrivals, value = x + 10 y.
    DataGrid::new(
        vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0],
        vec![100.0, 101.0, 102.0],
        vec![300.0, 301.0],
    )
    .expect("grid")
}

#[test]
fn mesh_has_one_vertex_per_sample_and_two_triangles_per_quad() {
    let mesh = PorkchopMesh::generate(&ramp(), 0.5, Morph::Linear);
    assert_eq!(mesh.vertices().len(), 6);
    assert_eq!(mesh.triangles(), &[[0, 3, 1], [1, 3, 4], [1, 4, 2], [2, 4, 5]]);
    assert_eq!(mesh.vertices()[4], [101.0, 301.0, 5.5]);

    let bounds = mesh.bounds();
    assert_eq!(bounds.x, (100.0, 102.0));
    assert_eq!(bounds.y, (300.0, 301.0));
    assert_eq!(bounds.z, (0.0, 6.0));
    assert_eq!(mesh.normalized()[5], 1.0);
    assert_eq!(mesh.normalized()[0], 0.0);
}

#[test]
fn missing_samples_take_the_field_maximum() {
    let grid = DataGrid::new(
        vec![4.0, f64::NAN, 1.0, 16.0],
        vec![0.0, 1.0],
        vec![0.0, 1.0],
    )
    .expect("grid");
    let linear = PorkchopMesh::generate(&grid, 1.0, Morph::Linear);
    assert_eq!(linear.scalars(), &[4.0, 16.0, 1.0, 16.0]);

    let log = PorkchopMesh::generate(&grid, 1.0, Morph::LogE);
    assert!((log.scalars()[0] - 4f64.ln()).abs() < 1e-15);
    assert_eq!(log.scalars()[2], 0.0);
}

#[test]
fn ray_picks_the_nearest_triangle() {
    let mesh = PorkchopMesh::generate(&ramp(), 0.0, Morph::Linear);
    let hit = mesh
        .intersect_ray(&[100.25, 300.5, 10.0], &[0.0, 0.0, -1.0])
        .expect("hit");
    assert!((hit.t - 10.0).abs() < 1e-12);
    assert_eq!(hit.triangle, 0);
    assert!((hit.point[0] - 100.25).abs() < 1e-12);

    assert!(
        mesh.intersect_ray(&[90.0, 300.5, 10.0], &[0.0, 0.0, -1.0])
            .is_none()
    );
    assert!(
        mesh.intersect_ray(&[100.25, 300.5, 10.0], &[0.0, 0.0, 1.0])
            .is_none()
    );
}

#[test]
fn vtp_lists_points_polys_and_point_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let guard = OutputGuard::new(dir.path()).expect("guard");
    let mesh = PorkchopMesh::generate(&ramp(), 1.0, Morph::Linear);

    let path = write_vtp("ramp.vtp", &mesh, &guard).expect("vtp");
    let text = fs::read_to_string(path).expect("read");
    assert!(text.contains(r#"<Piece NumberOfPoints="6" NumberOfPolys="4">"#));
    assert!(text.contains("0 3 1\n1 3 4\n"));
    assert!(text.contains("3 6 9 12\n"));
    assert!(text.contains(r#"Name="MorphedValue""#));
    assert!(text.contains(r#"Name="NormalizedUV""#));
    assert!(text.trim_end().ends_with("</VTKFile>"));

    assert!(matches!(
        write_vtp("ramp.obj", &mesh, &guard),
        Err(ExportError::InvalidExtension { .. })
    ));
}

#[test]
fn csv_rows_cover_every_cell() {
    let outcome = small_outcome();
    let mut buffer = Vec::new();
    let rows = write_grid_csv(&mut buffer, &outcome.grid).expect("csv");
    assert_eq!(rows, outcome.grid.len());

    let text = String::from_utf8(buffer.clone()).expect("utf8");
    assert!(text.starts_with(
        "departure_jd,arrival_jd,departure_date,arrival_date,tof_days,c3_km2_s2,vinf_dep_km_s,vinf_arr_km_s,feasible,failure"
    ));
    let records = read_grid_records(buffer.as_slice()).expect("parse");
    assert_eq!(records.len(), rows);
    assert_eq!(records[0].departure_date, "2005-07-01");
    for (record, cell) in records.iter().zip(outcome.grid.cells()) {
        assert_eq!(record.feasible, cell.is_valid());
        assert_eq!(record.c3_km2_s2, cell.c3_km2_s2);
    }
}

#[test]
fn summary_json_reports_the_optimum() {
    let outcome = small_outcome();
    let best = outcome.require_optimum().expect("optimum");
    let mut buffer = Vec::new();
    write_summary(&mut buffer, &RunSummary::new("earth", "mars", &outcome)).expect("json");

    let json: serde_json::Value = serde_json::from_slice(&buffer).expect("parse");
    assert_eq!(json["departure_body"], "earth");
    assert_eq!(json["cells"]["total"], outcome.grid.len());
    assert_eq!(json["departure_window"]["start_date"], "2005-07-01");
    let c3 = json["optimum"]["c3_km2_s2"].as_f64().expect("c3");
    assert!((c3 - best.c3_km2_s2).abs() < 1e-9);
    assert_eq!(json["optimum"]["departure_index"], best.departure_index);
}
