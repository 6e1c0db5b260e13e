// tests/read_trial.rs

use std::fs;
use std::path::PathBuf;

use imu_trial_import::core::writers::write_bundle;
use imu_trial_import::{
    read_trial, ChannelKind, MappingError, OutputConfig, SensorMapping, TableRef, Vec3,
};
use tempfile::tempdir;

const TOLERANCE: f64 = 1e-12;
const FULL_TRIAL: &str = "MT_012005D6_031-";
const ORIENTATION_TRIAL: &str = "MT_012005D6-000_sit_to_stand-";

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

fn assert_vec3_eq(actual: Vec3, expected: Vec3) {
    assert!(
        (actual - expected).abs().max() < TOLERANCE,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

/// Build the mapping, write it to XML and read it back, as a caller would.
fn shank_mapping_via_xml() -> SensorMapping {
    let dir = tempdir().unwrap();
    let path = dir.path().join("map2xml.xml");

    let mut mapping = SensorMapping::new();
    mapping.add_item("shank", "000_00B421AF").unwrap();
    mapping.to_xml(&path).unwrap();

    SensorMapping::from_xml(&path).unwrap()
}

#[test]
fn test_full_kinematics_trial() {
    let mapping = shank_mapping_via_xml();
    let bundle = read_trial(data_dir(), FULL_TRIAL, &mapping).unwrap();

    let acc = &bundle.linear_acceleration;
    assert_eq!(acc.labels(), &["shank".to_string()]);
    assert_eq!(acc.num_rows(), 6);
    assert_vec3_eq(acc.row(0).unwrap()[0], Vec3::new(3.030769, 5.254238, -7.714005));
    let last = acc.num_rows() - 1;
    assert_vec3_eq(acc.row(last).unwrap()[0], Vec3::new(2.657654, 5.012634, -7.581414));

    let gyr = &bundle.angular_velocity;
    assert_vec3_eq(gyr.row(0).unwrap()[0], Vec3::new(0.005991, -0.032133, 0.022713));

    let mag = &bundle.magnetic_heading;
    assert_vec3_eq(mag.row(0).unwrap()[0], Vec3::new(-0.045410, -0.266113, 0.897217));

    let ori = &bundle.orientation;
    assert_eq!(ori.num_rows(), 6);
    for (_, row) in ori.rows() {
        assert!((row[0].norm() - 1.0).abs() < 1e-9);
    }

    let expected_time: Vec<f64> = (0..6).map(|i| i as f64).collect();
    assert_eq!(acc.time_column(), expected_time.as_slice());
    assert_eq!(acc.metadata().get("DataRate").map(String::as_str), Some("100"));
}

#[test]
fn test_orientation_only_trial() {
    let mut mapping = SensorMapping::new();
    mapping.add_item("test", "000_00B421ED").unwrap();

    let bundle = read_trial(data_dir(), ORIENTATION_TRIAL, &mapping).unwrap();

    assert_eq!(bundle.linear_acceleration.num_rows(), 0);
    assert_eq!(bundle.angular_velocity.num_rows(), 0);
    assert_eq!(bundle.magnetic_heading.num_rows(), 0);
    assert_eq!(bundle.linear_acceleration.num_columns(), 0);

    assert_eq!(bundle.orientation.num_rows(), 5);
    assert_eq!(bundle.orientation.labels(), &["test".to_string()]);

    let identity = bundle.orientation.row(4).unwrap()[0];
    assert!((identity.w.abs() - 1.0).abs() < 1e-9);
}

#[test]
fn test_bundle_always_exposes_four_kinds() {
    let mut mapping = SensorMapping::new();
    mapping.add_item("shank", "000_00B421AF").unwrap();
    mapping.add_item("test", "000_00B421ED").unwrap();
    mapping.add_item("absent", "000_DEADBEEF").unwrap();

    for trial in [FULL_TRIAL, ORIENTATION_TRIAL, "NO_SUCH_TRIAL-"] {
        let bundle = read_trial(data_dir(), trial, &mapping).unwrap();
        let kinds: Vec<ChannelKind> = bundle.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, ChannelKind::ALL.to_vec());
        assert!(matches!(bundle.get(ChannelKind::Orientation), TableRef::Quaternion(_)));
    }
}

#[test]
fn test_mixed_sensors_in_one_trial() {
    // Put both fixture files under one trial prefix.
    let dir = tempdir().unwrap();
    let trial = "MIXED-";
    fs::copy(
        data_dir().join(format!("{}000_00B421AF.txt", FULL_TRIAL)),
        dir.path().join(format!("{}000_00B421AF.txt", trial)),
    )
    .unwrap();
    fs::copy(
        data_dir().join(format!("{}000_00B421ED.txt", ORIENTATION_TRIAL)),
        dir.path().join(format!("{}000_00B421ED.txt", trial)),
    )
    .unwrap();

    let mut mapping = SensorMapping::new();
    mapping.add_item("shank", "000_00B421AF").unwrap();
    mapping.add_item("thigh", "000_00B421ED").unwrap();

    let bundle = read_trial(dir.path(), trial, &mapping).unwrap();

    assert_eq!(bundle.linear_acceleration.labels(), &["shank".to_string()]);
    assert_eq!(bundle.linear_acceleration.num_rows(), 6);
    assert_eq!(
        bundle.orientation.labels(),
        &["shank".to_string(), "thigh".to_string()]
    );
    // Shortest contributor wins.
    assert_eq!(bundle.orientation.num_rows(), 5);
}

#[test]
fn test_duplicate_name_policy_is_stable() {
    let mut mapping = SensorMapping::new();
    mapping.add_item("shank", "000_00B421AF").unwrap();

    for _ in 0..5 {
        match mapping.add_item("shank", "000_00B421ED") {
            Err(MappingError::DuplicateName(name)) => assert_eq!(name, "shank"),
            other => panic!("Expected DuplicateName, got {:?}", other),
        }
    }
    assert_eq!(mapping.lookup("shank").unwrap(), "000_00B421AF");
}

#[test]
fn test_write_trial_tables() {
    let mapping = shank_mapping_via_xml();
    let bundle = read_trial(data_dir(), FULL_TRIAL, &mapping).unwrap();

    let out = tempdir().unwrap();
    let written = write_bundle(out.path(), FULL_TRIAL, &bundle, &OutputConfig::default()).unwrap();
    assert_eq!(written.len(), 4);

    let content =
        fs::read_to_string(out.path().join(format!("{}accelerations.sto", FULL_TRIAL))).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let header_end = lines.iter().position(|l| *l == "endheader").unwrap();
    assert_eq!(lines[header_end + 1], "time\tshank_x\tshank_y\tshank_z");
    assert_eq!(lines[header_end + 2], "0\t3.030769\t5.254238\t-7.714005");
    assert_eq!(lines.len(), header_end + 2 + 6);
}
