// tests/validation.rs
//
// End-to-end checks over real files: OVF snapshots written to a temporary
// directory with OOMMF-style names, an ODT table next to them, and the
// holomaps / dynamic maps / curves built from both.
// Run with: cargo test --test validation

use std::fs;
use std::path::{Path, PathBuf};

use omf_views::field::{Mesh, SliceAxis};
use omf_views::initial_states;
use omf_views::maps::{
    create_inplane_angle_dynamic_map, create_inplane_holomap, create_outofplane_holomap,
    create_topological_density_dynamic_map, create_topological_density_holomap, KeyValue,
};
use omf_views::odt_views::OdtViews;
use omf_views::ovf::{write_ovf2_binary4, write_ovf2_text, OvfMeta};
use omf_views::topology::{topological_charge, BoundaryPolicy};
use omf_views::ViewError;

const CELL: f64 = 1e-9;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// Three snapshots: uniform +z, a skyrmion, and a vortex, on 32x32x2 films.
fn write_snapshots(dir: &Path) -> Vec<PathBuf> {
    let mesh = Mesh::from_cell([32, 32, 2], [CELL; 3]);
    let fields = [
        ("sim-Oxs_MinDriver-Magnetization-00-0000000.omf", initial_states::uniform(mesh, [0.0, 0.0, 1.0])),
        ("sim-Oxs_MinDriver-Magnetization-01-0000003.omf", initial_states::skyrmion(mesh, 6e-9, 2e-9, 1.0)),
        ("sim-Oxs_MinDriver-Magnetization-02-0000005.omf", initial_states::vortex(mesh, 1.0, 6e-9)),
    ];
    fields
        .iter()
        .enumerate()
        .map(|(k, (name, field))| {
            let path = dir.join(name);
            let meta = OvfMeta::magnetization();
            if k % 2 == 0 {
                write_ovf2_binary4(&path, field, &meta).unwrap();
            } else {
                write_ovf2_text(&path, field, &meta).unwrap();
            }
            path
        })
        .collect()
}

fn write_odt(dir: &Path) -> PathBuf {
    let path = dir.join("sim.odt");
    fs::write(
        &path,
        "# ODT 1.0
# Table Start
# Title: Oxs_MinDriver
# Columns: {Oxs_UniformExchange::Energy} Oxs_MinDriver::Iteration Oxs_MinDriver::Stage {Oxs_CGEvolve::Total energy} Oxs_MinDriver::mz
# Units: J {} {} J {}
   1e-18 0 0 -1.0e-17 1.0
   2e-18 3 1 -2.0e-17 0.5
   2.5e-18 4 2 -2.5e-17 0.2
   3e-18 5 2 -3.0e-17 0.0
# Table End
",
    )
    .unwrap();
    path
}

#[test]
fn holomaps_cover_every_file_and_coordinate() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_snapshots(dir.path());
    let coords = [0.5e-9, 1.5e-9];

    let inplane = create_inplane_holomap(&files, &coords, SliceAxis::Z).unwrap();
    assert_eq!(inplane.len(), 6);
    assert_eq!(inplane.kdims[0].name, "File");
    assert_eq!(inplane.kdims[1].name, "z coordinate");
    let v = inplane.get(&[KeyValue::Int(0), KeyValue::Float(0.5e-9)]).unwrap();
    assert_eq!(v.x.len(), 32 * 32);
    assert!(v.magnitude.iter().all(|&m| m < 1e-12), "uniform +z has no in-plane part");

    let side = create_outofplane_holomap(&files, &[16e-9], SliceAxis::X).unwrap();
    assert_eq!(side.kdims[1].name, "x coordinate");
    let img = side.get(&[KeyValue::Int(0), KeyValue::Float(16e-9)]).unwrap();
    assert_eq!((img.nx, img.ny), (32, 2));
    assert_eq!(img.kdims, ["y".to_string(), "z".to_string()]);
    assert_eq!(img.vdim.name, "Mx");
}

#[test]
fn density_holomap_counts_one_skyrmion() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_snapshots(dir.path());
    let map = create_topological_density_holomap(&files, &[0.5e-9], SliceAxis::Z, BoundaryPolicy::Zero).unwrap();

    let q = |index: i64| {
        let img = map.get(&[KeyValue::Int(index), KeyValue::Float(0.5e-9)]).unwrap();
        topological_charge(&img.data)
    };
    assert!(approx_eq(q(0), 0.0, 1e-9), "uniform Q = {}", q(0));
    assert!(approx_eq(q(1).abs(), 1.0, 0.1), "skyrmion Q = {}", q(1));
    // a vortex carries half a unit
    assert!(approx_eq(q(2).abs(), 0.5, 0.1), "vortex Q = {}", q(2));
}

#[test]
fn dynamic_maps_read_files_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_snapshots(dir.path());
    let coords = [0.5e-9];

    let dmap = create_topological_density_dynamic_map(&files, &coords, SliceAxis::Z, BoundaryPolicy::Zero).unwrap();
    assert_eq!(dmap.kdims[0].name, "File");
    assert_eq!(
        dmap.kdims[0].value_labels.as_deref(),
        Some(&["0".to_string(), "1".to_string(), "2".to_string()][..])
    );

    let key = vec![
        KeyValue::Text(files[1].to_string_lossy().into_owned()),
        KeyValue::from("z"),
        KeyValue::Float(0.5e-9),
    ];
    let first = dmap.select(&key).unwrap();
    assert!(approx_eq(topological_charge(&first.data).abs(), 1.0, 0.1));

    // replace the file on disk: the next select sees the new content
    let mesh = Mesh::from_cell([32, 32, 2], [CELL; 3]);
    write_ovf2_binary4(&files[1], &initial_states::uniform(mesh, [1.0, 0.0, 0.0]), &OvfMeta::magnetization())
        .unwrap();
    let second = dmap.select(&key).unwrap();
    assert!(second.data.iter().all(|&q| q.abs() < 1e-12));

    // undeclared coordinate
    let bad = vec![key[0].clone(), key[1].clone(), KeyValue::Float(1.5e-9)];
    assert!(matches!(dmap.select(&bad), Err(ViewError::InvalidArgument(_))));

    let angle = create_inplane_angle_dynamic_map(&files, &coords, SliceAxis::Z).unwrap();
    let hm = angle.to_holomap().unwrap();
    assert_eq!(hm.len(), 3);
}

#[test]
fn odt_rows_join_one_per_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_snapshots(dir.path());
    let odt = write_odt(dir.path());

    let views = OdtViews::new(&odt, &files).unwrap();
    assert_eq!(views.rows.len(), files.len());
    assert_eq!(
        views.columns,
        vec!["File", "stage", "iteration", "energy", "E", "mz"]
    );
    // stage 2, iteration 5 is the third snapshot; iteration 4 has no file
    assert_eq!(views.rows[2], vec![2.0, 2.0, 5.0, 3e-18, -3.0e-17, 0.0]);

    let curve = views.get_curve("iteration", "mz").unwrap();
    assert_eq!(curve.x, vec![0.0, 3.0, 5.0]);
    assert_eq!(curve.y, vec![1.0, 0.5, 0.0]);

    let json = serde_json::to_value(views.table()).unwrap();
    assert_eq!(json["columns"][0], "File");
}

#[test]
fn odt_without_matching_row_is_a_cross_reference_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = write_snapshots(dir.path());
    let odt = write_odt(dir.path());

    let stray = dir.path().join("sim-Oxs_MinDriver-Magnetization-07-0000042.omf");
    fs::copy(&files[0], &stray).unwrap();
    files.push(stray);

    match OdtViews::new(&odt, &files) {
        Err(ViewError::CrossReference { file, reason }) => {
            assert!(file.ends_with("07-0000042.omf"));
            assert!(reason.contains("stage 7 iteration 42"), "{}", reason);
        }
        other => panic!("expected a cross-reference error, got {:?}", other.map(|v| v.rows.len())),
    }
}

#[test]
fn odt_without_stage_column_names_the_odt_file() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_snapshots(dir.path());
    let odt = dir.path().join("no_stage.odt");
    fs::write(&odt, "# Columns: Oxs_MinDriver::Iteration Oxs_MinDriver::mz\n0 1.0\n").unwrap();

    match OdtViews::new(&odt, &files) {
        Err(ViewError::CrossReference { file, reason }) => {
            assert_eq!(file, odt.display().to_string());
            assert!(reason.contains("'stage'"), "{}", reason);
        }
        other => panic!("expected a cross-reference error, got {:?}", other.map(|v| v.rows.len())),
    }
}

#[test]
fn bad_axis_message_is_verbatim() {
    let err = "q".parse::<SliceAxis>().unwrap_err();
    assert_eq!(err.to_string(), "Slice Axis must be one of 'x', 'y' ,'z'");
}
