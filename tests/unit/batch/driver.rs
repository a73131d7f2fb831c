use super::*;
use crate::{
    document::model::{DocumentDef, LayerDef},
    foundation::core::Canvas,
};

fn template() -> DocumentTemplate {
    let def = DocumentDef {
        canvas: Canvas {
            width: 3,
            height: 3,
        },
        layers: vec![
            LayerDef::group(
                "background",
                vec![
                    LayerDef::fill("red", [255, 0, 0, 255]),
                    LayerDef::fill("blue", [0, 0, 255, 255]),
                ],
            ),
            LayerDef::group("hat", vec![LayerDef::fill("crown", [255, 215, 0, 128])]),
        ],
    };
    DocumentTemplate::from_def(&def, ".", &LoadOptions::default()).unwrap()
}

fn manifest() -> TraitManifest {
    TraitManifest::from_json_str(
        r#"[
            {"id": 0, "background": "red", "hat": "No Traits"},
            {"id": 1, "background": "blue", "hat": "crown"},
            {"id": 2, "background": "red", "mouth": "grin"},
            {"id": 3, "background": "blue", "hat": "No Traits"}
        ]"#,
    )
    .unwrap()
}

fn first_two() -> TraitManifest {
    TraitManifest::new(manifest().entries()[..2].to_vec())
}

#[test]
fn sequential_run_writes_one_png_per_entry() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("images");
    let report = run_manifest(&template(), &first_two(), &BatchOptions::new(&out)).unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.images_written(), 2);
    assert!(report.failures.is_empty());
    assert_eq!(report.written, vec![out.join("0.png"), out.join("1.png")]);
    assert!(out.join("0.png").exists());
    assert!(out.join("1.png").exists());
}

#[test]
fn offset_skips_earlier_entries() {
    let dir = tempfile::tempdir().unwrap();
    let opts = BatchOptions {
        offset: 1,
        ..BatchOptions::new(dir.path())
    };
    let report = run_manifest(&template(), &first_two(), &opts).unwrap();
    assert_eq!(report.offset, 1);
    assert_eq!(report.written, vec![dir.path().join("1.png")]);
    assert!(!dir.path().join("0.png").exists());
}

#[test]
fn offset_at_end_writes_nothing_and_past_end_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let at_end = BatchOptions {
        offset: 2,
        ..BatchOptions::new(dir.path())
    };
    let report = run_manifest(&template(), &first_two(), &at_end).unwrap();
    assert_eq!(report.images_written(), 0);

    let past_end = BatchOptions {
        offset: 3,
        ..BatchOptions::new(dir.path())
    };
    let err = run_manifest(&template(), &first_two(), &past_end).unwrap_err();
    assert!(matches!(err, TraitStackError::Validation(_)));
}

#[test]
fn abort_policy_stops_at_first_missing_layer() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_manifest(&template(), &manifest(), &BatchOptions::new(dir.path())).unwrap_err();
    assert!(err.is_layer_not_found());
    assert!(dir.path().join("0.png").exists());
    assert!(dir.path().join("1.png").exists());
    assert!(!dir.path().join("2.png").exists());
    assert!(!dir.path().join("3.png").exists());
}

#[test]
fn skip_policy_records_failure_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let opts = BatchOptions {
        on_error: FailurePolicy::Skip,
        ..BatchOptions::new(dir.path())
    };
    let report = run_manifest(&template(), &manifest(), &opts).unwrap();
    assert_eq!(report.images_written(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 2);
    assert!(report.failures[0].error.is_layer_not_found());
    assert!(!dir.path().join("2.png").exists());
    assert!(dir.path().join("3.png").exists());
}

#[test]
fn parallel_output_matches_sequential_output() {
    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();
    let t = template();
    let skip = |dir: &Path| BatchOptions {
        on_error: FailurePolicy::Skip,
        ..BatchOptions::new(dir)
    };

    run_manifest(&t, &manifest(), &skip(seq_dir.path())).unwrap();
    let par = BatchOptions {
        threading: BatchThreading {
            parallel: true,
            threads: Some(3),
        },
        ..skip(par_dir.path())
    };
    let report = run_manifest(&t, &manifest(), &par).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 2);

    for name in ["0.png", "1.png", "3.png"] {
        let a = std::fs::read(seq_dir.path().join(name)).unwrap();
        let b = std::fs::read(par_dir.path().join(name)).unwrap();
        assert_eq!(a, b, "{name}");
    }
}

#[test]
fn parallel_abort_returns_the_failing_entry() {
    let dir = tempfile::tempdir().unwrap();
    let opts = BatchOptions {
        threading: BatchThreading {
            parallel: true,
            threads: Some(2),
        },
        ..BatchOptions::new(dir.path())
    };
    let err = run_manifest(&template(), &manifest(), &opts).unwrap_err();
    assert!(err.to_string().contains("'mouth'"));
    assert!(!dir.path().join("2.png").exists());
}

#[test]
fn parallel_abort_reports_lowest_failing_index() {
    // Failures sit on both sides of the rayon split; the larger canvas keeps the clean entries
    // busy long enough for either failure to land first.
    let def = DocumentDef {
        canvas: Canvas {
            width: 1024,
            height: 1024,
        },
        layers: vec![LayerDef::group(
            "background",
            vec![LayerDef::fill("red", [255, 0, 0, 255])],
        )],
    };
    let t = DocumentTemplate::from_def(&def, ".", &LoadOptions::default()).unwrap();
    let m = TraitManifest::from_json_str(
        r#"[
            {"background": "red"},
            {"eyes": "laser"},
            {"mouth": "grin"},
            {"background": "red"}
        ]"#,
    )
    .unwrap();

    for _ in 0..10 {
        let dir = tempfile::tempdir().unwrap();
        let opts = BatchOptions {
            threading: BatchThreading {
                parallel: true,
                threads: Some(2),
            },
            ..BatchOptions::new(dir.path())
        };
        let err = run_manifest(&t, &m, &opts).unwrap_err();
        assert!(
            matches!(err, TraitStackError::LayerNotFound { ref name, .. } if name == "eyes"),
            "{err}"
        );
    }
}

#[test]
fn zero_threads_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let opts = BatchOptions {
        threading: BatchThreading {
            parallel: true,
            threads: Some(0),
        },
        ..BatchOptions::new(dir.path())
    };
    let err = run_manifest(&template(), &first_two(), &opts).unwrap_err();
    assert!(matches!(err, TraitStackError::Validation(_)));
}
