use super::*;

#[test]
fn flattens_nested_objects_with_dots() {
    let v = serde_json::json!({
        "keyboard": { "mask": 120.5, "enabled": true, "source": null },
        "output": { "width": 64, "path": "out.mp4" },
        "blocks": { "color": [1, 2, 3, 255] }
    });
    let p = ParamMap::from_json(&v);
    assert_eq!(p.get_f64("keyboard.mask"), Some(120.5));
    assert_eq!(p.get_bool("keyboard.enabled"), Some(true));
    assert!(p.get("keyboard.source").is_none());
    assert_eq!(p.get("output.width"), Some(&ParamValue::Int(64)));
    assert_eq!(p.get_f64("output.width"), Some(64.0));
    assert_eq!(p.get_str("output.path"), Some("out.mp4"));
    assert_eq!(
        p.get("blocks.color"),
        Some(&ParamValue::List(vec![
            ParamValue::Int(1),
            ParamValue::Int(2),
            ParamValue::Int(3),
            ParamValue::Int(255)
        ]))
    );
    assert_eq!(p.len(), 5);
}

#[test]
fn typed_getters_reject_other_kinds() {
    let mut p = ParamMap::default();
    p.insert("a", ParamValue::Str("x".to_owned()));
    assert_eq!(p.get_f64("a"), None);
    assert_eq!(p.get_bool("a"), None);
    assert_eq!(p.names().collect::<Vec<_>>(), vec!["a"]);
}
