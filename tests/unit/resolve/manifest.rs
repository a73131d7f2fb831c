use super::*;

#[test]
fn parses_entries_in_order_with_reserved_keys() {
    let m = TraitManifest::from_json_str(
        r#"[
            {"id": 1, "background": "red", "hat": "No Traits"},
            {"id": 2, "hat": "crown", "background": "blue"}
        ]"#,
    )
    .unwrap();
    assert_eq!(m.len(), 2);

    let first = m.get(0).unwrap();
    assert_eq!(first.index(), 0);
    assert_eq!(first.id(), Some(&serde_json::json!(1)));
    assert_eq!(
        first.traits(),
        &[
            ("background".to_string(), "red".to_string()),
            ("hat".to_string(), "No Traits".to_string())
        ]
    );
    assert_eq!(
        first.selections().collect::<Vec<_>>(),
        vec![("background", "red")]
    );

    // Key order inside an entry is preserved.
    let second = m.get(1).unwrap();
    assert_eq!(second.index(), 1);
    assert_eq!(
        second.selections().collect::<Vec<_>>(),
        vec![("hat", "crown"), ("background", "blue")]
    );
}

#[test]
fn scalar_values_are_stringified_and_null_means_no_traits() {
    let m = TraitManifest::from_json_str(r#"[{"level": 3, "shiny": true, "hat": null}]"#).unwrap();
    let set = m.get(0).unwrap();
    assert_eq!(set.id(), None);
    assert_eq!(
        set.traits(),
        &[
            ("level".to_string(), "3".to_string()),
            ("shiny".to_string(), "true".to_string()),
            ("hat".to_string(), NO_TRAITS.to_string())
        ]
    );
    assert_eq!(set.selections().count(), 2);
}

#[test]
fn structural_errors_are_manifest_errors() {
    for bad in [
        r#"{"background": "red"}"#,
        r#"[["background", "red"]]"#,
        r#"[{"background": ["red"]}]"#,
        r#"[{"background": "red"}"#,
    ] {
        let err = TraitManifest::from_json_str(bad).unwrap_err();
        assert!(matches!(err, TraitStackError::Manifest(_)), "{bad}: {err}");
    }
}

#[test]
fn empty_array_is_an_empty_manifest() {
    let m = TraitManifest::from_json_str("[]").unwrap();
    assert!(m.is_empty());
    assert!(m.entries().is_empty());
}

#[test]
fn from_pairs_moves_id_out_of_traits() {
    let set = TraitSet::from_pairs(7, [("id", "abc"), ("eyes", "closed")]);
    assert_eq!(set.index(), 7);
    assert_eq!(set.id(), Some(&Value::String("abc".to_string())));
    assert_eq!(set.traits().len(), 1);

    let m = TraitManifest::new(vec![set.clone(), set]);
    assert_eq!(m.get(0).unwrap().index(), 0);
    assert_eq!(m.get(1).unwrap().index(), 1);
}

#[test]
fn from_path_missing_file_is_manifest_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TraitManifest::from_path(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, TraitStackError::Manifest(_)));

    let path = dir.path().join("traits.json");
    std::fs::write(&path, r#"[{"id": "a", "eyes": "open"}]"#).unwrap();
    assert_eq!(TraitManifest::from_path(&path).unwrap().len(), 1);
}
