use std::path::PathBuf;
use std::thread;

use json_blueprint::{ErrorClass, PathSegment, Schema, Shape, load_file, to_object};
use pretty_assertions::assert_eq;
use serde_json::json;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/blueprints.jbp")
}

fn blueprints() -> Schema {
    load_file(fixture()).unwrap()
}

fn divide(raw: &str) -> Result<f64, String> {
    let deserializer = blueprints().choose_root("Parameters");
    let value = deserializer.deserialize(raw).map_err(|e| e.to_string())?;
    let payload = to_object(&value);
    let operand1 = payload.field("operand1").and_then(|x| x.number()).ok_or("operand1")?;
    let operand2 = payload.field("operand2").and_then(|x| x.number()).ok_or("operand2")?;
    Ok(operand1 / operand2)
}

#[test]
fn loads_roots_and_types_from_file() {
    let schema = blueprints();
    assert_eq!(schema.root_names().collect::<Vec<_>>(), vec!["Parameters", "Batch"]);
    assert_eq!(schema.type_names().collect::<Vec<_>>(), vec!["Operation", "Parameters", "Batch"]);
    assert!(!schema.is_root("Operation"));
    assert!(schema.origin().ends_with("blueprints.jbp"));
}

#[test]
fn valid_request_divides() {
    assert_eq!(divide(r#"{"operand1": 9, "operand2": 4}"#), Ok(2.25));
}

#[test]
fn missing_operand_is_reported_by_name() {
    let err = blueprints()
        .choose_root("Parameters")
        .deserialize(r#"{"operand1": 9}"#)
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::MissingRequiredField);
    assert_eq!(err.path().segments(), &[PathSegment::field("operand2")]);
    assert_eq!(err.to_string(), "operand2: missing required field");
}

#[test]
fn wrong_kind_and_unknown_keys_are_rejected() {
    let params = blueprints().choose_root("Parameters");

    let err = params.deserialize(r#"{"operand1": "9", "operand2": 4}"#).unwrap_err();
    assert_eq!(err.class(), ErrorClass::TypeMismatch);
    assert_eq!(err.path().to_strings(), vec!["operand1"]);

    let err = params.deserialize(r#"{"operand1": 9, "operand2": 4, "operator": "/"}"#).unwrap_err();
    assert_eq!(err.class(), ErrorClass::UnknownField);
    assert_eq!(err.path().to_strings(), vec!["operator"]);
}

#[test]
fn malformed_input_never_panics() {
    let params = blueprints().choose_root("Parameters");
    for raw in ["", "{", "nul", "{\"operand1\": 1,}", "[1, 2"] {
        let err = params.deserialize(raw).unwrap_err();
        assert_eq!(err.class(), ErrorClass::MalformedInput, "{raw:?}");
        assert!(err.path().is_root());
    }
}

#[test]
fn batch_applies_defaults_and_reports_nested_paths() {
    let batch = blueprints().choose_root("Batch");
    let value = batch
        .deserialize(
            r#"{
                "requests": [{"operand1": 1, "operand2": 2}],
                "ops": [{"symbol": "/"}],
                "settings": {"theme": "dark"}
            }"#,
        )
        .unwrap();
    assert_eq!(
        value.to_json(),
        json!({
            "requests": [{"operand1": 1, "operand2": 2}],
            "ops": [{"symbol": "/"}],
            "settings": {"precision": 2}
        })
    );
    let graph = to_object(&value);
    assert_eq!(graph.field("requests").map(|r| r.shape()), Some(Shape::Array));

    let errs = batch
        .deserialize_all(
            r#"{
                "requests": [{"operand1": 1, "operand2": 2}, {"operand1": true, "operand2": 2}],
                "ops": [{"symbol": "%"}],
                "settings": {"precision": 20}
            }"#,
        )
        .unwrap_err();
    let rendered: Vec<String> = errs.errors().iter().map(|e| e.path().to_string()).collect();
    assert_eq!(rendered, vec!["requests[1].operand1", "ops[0].symbol", "settings.precision"]);
    assert!(errs.errors()[1..].iter().all(|e| e.class() == ErrorClass::ConstraintViolation));
}

#[test]
fn one_schema_many_threads() {
    let params = blueprints().choose_root("Parameters");
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let params = params.clone();
            thread::spawn(move || {
                let ok = params.is_valid(format!(r#"{{"operand1": {i}, "operand2": 1}}"#));
                let bad = params.is_valid(format!(r#"{{"operand1": {i}}}"#));
                ok && !bad
            })
        })
        .collect();
    assert!(handles.into_iter().all(|h| h.join().unwrap()));
}

#[test]
#[should_panic(expected = "Nope")]
fn choosing_an_undeclared_root_panics() {
    let _ = blueprints().choose_root("Nope");
}

#[test]
fn recompiling_yields_an_independent_schema() {
    let a = blueprints();
    let b = blueprints();
    assert!(!a.same_instance(&b));
    assert!(a.same_instance(&a.clone()));
}
