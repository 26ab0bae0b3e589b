//! End-to-end tests: study export on disk → pipeline → saved output

use biostamp_segmenter::{
    load_study, save_study, Config, OutputFormat, Pipeline, StudyLoader, StudyOutput,
};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn temp_study() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("biostamp-e2e-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// 100 rows at 125 Hz starting at `offset` ms, with channels `slope * t` and `-slope * t`.
fn sensor_csv(offset: f64, slope: f64) -> String {
    let mut csv = String::from("Timestamp (ms),X,Y\n");
    for i in 0..100 {
        let t = offset + i as f64 * 8.0;
        csv.push_str(&format!("{t},{},{}\n", slope * t, -slope * t));
    }
    csv
}

fn write_annotations(root: &Path, rows: &[(&str, &str, f64, f64)]) {
    let mut csv =
        String::from("Subject,EventType,Start Timestamp (ms),Stop Timestamp (ms)\n");
    for (subject, event, start, stop) in rows {
        csv.push_str(&format!("{subject},{event},{start},{stop}\n"));
    }
    write(&root.join("annotations.csv"), &csv);
}

fn run(root: &Path, pre_time: f64) -> StudyOutput {
    let mut config = Config::default();
    config.pre_time_secs = pre_time;
    config.workers = 2;

    let loaded = StudyLoader::from_config(root, &config).load().unwrap();
    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut study = pipeline.process_study(loaded.subjects);
    study.failures.extend(loaded.failures);
    study
}

#[test]
fn test_study_is_aligned_and_segmented() {
    let root = temp_study();
    write(&root.join("S01/chest/rec_1/accel.csv"), &sensor_csv(0.0, 0.001));
    write(&root.join("S01/chest/rec_1/gyro.csv"), &sensor_csv(3.0, 0.002));
    write_annotations(
        &root,
        &[
            ("S01", "walk", 104.0, 304.0),
            ("S01", "sit", 16.0, 80.0),
            ("S01", "walk", 504.0, 704.0),
        ],
    );

    let study = run(&root, 0.04);
    assert!(study.failures.is_empty());
    let output = &study.subjects["S01"];
    let segments = output.segments.as_ref().unwrap();

    // Repeated names are numbered, unique ones are left alone
    let events: Vec<&str> = segments.events("chest", "accel").unwrap().keys().map(String::as_str).collect();
    assert_eq!(events, vec!["sit", "walk 1", "walk 2"]);

    // 40 ms of padding is 5 rows at 8 ms
    let walk = segments.get("chest", "accel", "walk 1").unwrap();
    assert_eq!(walk.len(), 30);
    assert_eq!(walk.first_timestamp(), Some(64.0));
    assert_eq!(walk.last_timestamp(), Some(296.0));

    // Gyro shares the accel time base after alignment
    let gyro = segments.get("chest", "gyro", "walk 1").unwrap();
    assert_eq!(gyro.timestamps(), walk.timestamps());
    for (t, v) in gyro.timestamps().iter().zip(gyro.channel(0).unwrap()) {
        assert!((v - 0.002 * t).abs() < 1e-9, "gyro at {t}: {v}");
    }

    // "sit" starts 2 rows in, so its padding is cut short in both tables
    assert_eq!(output.warnings.len(), 2);
    assert!(output.warnings.iter().all(|w| w.event == "sit"
        && w.requested_pad == 5
        && w.available_pad == 2));
    let sit = segments.get("chest", "gyro", "sit").unwrap();
    assert_eq!(sit.first_timestamp(), Some(0.0));
    assert_eq!(sit.len(), 10);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_locations_share_common_window() {
    let root = temp_study();
    write(&root.join("S01/chest/rec_1/accel.csv"), &sensor_csv(0.0, 0.001));
    write(&root.join("S01/thigh/rec_1/accel.csv"), &sensor_csv(4.0, 0.001));
    write_annotations(&root, &[]);

    let mut config = Config::default();
    config.segment = false;
    let loaded = StudyLoader::from_config(&root, &config).load().unwrap();
    let study = Pipeline::from_config(&config)
        .unwrap()
        .process_study(loaded.subjects);

    let data = study.subjects["S01"].data.as_ref().unwrap();
    let chest = data.get("chest", "accel").unwrap();
    let thigh = data.get("thigh", "accel").unwrap();

    // Latest start is 4 ms, earliest end is 792 ms
    assert_eq!(chest.timestamps(), thigh.timestamps());
    assert_eq!(chest.first_timestamp(), Some(4.0));
    assert!(chest.last_timestamp().unwrap() < 792.0);
    assert_eq!(chest.len(), 99);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_failing_subjects_do_not_stop_the_study() {
    let root = temp_study();
    write(&root.join("S01/chest/rec_1/accel.csv"), &sensor_csv(0.0, 0.001));
    // No reference sensor anywhere
    write(&root.join("S02/chest/rec_1/gyro.csv"), &sensor_csv(0.0, 0.001));
    // No sensor files at all
    fs::create_dir_all(root.join("S03/chest")).unwrap();
    write_annotations(
        &root,
        &[
            ("S01", "walk", 104.0, 304.0),
            ("S02", "walk", 104.0, 304.0),
        ],
    );

    let study = run(&root, 0.0);
    assert_eq!(study.subjects.len(), 1);
    assert!(study.failures["S02"].contains("accel"));
    assert!(study.failures["S03"].contains("no sensor data"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_saved_study_reloads() {
    let root = temp_study();
    write(&root.join("S01/chest/rec_1/accel.csv"), &sensor_csv(0.0, 0.001));
    write_annotations(&root, &[("S01", "walk", 104.0, 304.0)]);

    let study = run(&root, 0.0);
    let path = root.join("out/study.json");
    save_study(&study, &path, OutputFormat::Json).unwrap();

    let loaded = load_study(&path).unwrap();
    assert_eq!(loaded.metadata.run_id, study.metadata.run_id);
    assert!(loaded.metadata.aligned && loaded.metadata.segmented);
    assert_eq!(loaded.subjects["S01"].segments, study.subjects["S01"].segments);

    let _ = fs::remove_dir_all(&root);
}
