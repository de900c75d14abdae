//! Conformance runner: replays `cases/*.json` against the blueprint engine.
//!
//! Usage: `cargo run -p dev-test-runner [FILTER_REGEX]`
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;
use json_blueprint::{Compiler, SchemaSource};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// CASE FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Suite {
    blueprint: String,
    #[serde(default)]
    open_by_default: bool,
    /// Expected compile failure (substring of the error message).
    #[serde(default)]
    compile_error: Option<String>,
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    name: String,
    /// Raw input bytes, for malformed documents.
    #[serde(default)]
    raw: Option<String>,
    #[serde(default)]
    document: Option<Value>,
    expect: Expect,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum Expect {
    Ok(Value),
    Error { path: Vec<String>, class: String },
}

// ————————————————————————————————————————————————————————————————————————————
// RUNNER
// ————————————————————————————————————————————————————————————————————————————

fn main() -> ExitCode {
    let filter = match std::env::args().nth(1).map(|f| Regex::new(&f)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid filter: {error}");
            return ExitCode::FAILURE;
        }
    };
    let cases_dir = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/cases"));
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(&cases_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect(),
        Err(error) => {
            eprintln!("cannot read {}: {error}", cases_dir.display());
            return ExitCode::FAILURE;
        }
    };
    paths.sort();

    let (mut passed, mut failed) = (0usize, 0usize);
    for path in &paths {
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let suite = match load_suite(path) {
            Ok(suite) => suite,
            Err(message) => {
                eprintln!("{} {stem}: {message}", "BROKEN".red().bold());
                failed += 1;
                continue;
            }
        };
        for (name, result) in run_suite(&stem, &suite) {
            if filter.as_ref().is_some_and(|f| !f.is_match(&name)) {
                continue;
            }
            match result {
                Ok(()) => {
                    passed += 1;
                    eprintln!("{} {name}", "pass".green());
                }
                Err(message) => {
                    failed += 1;
                    eprintln!("{} {name}\n    {message}", "FAIL".red().bold());
                }
            }
        }
    }

    eprintln!("{passed} passed, {failed} failed");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn load_suite(path: &Path) -> Result<Suite, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let de = &mut serde_json::Deserializer::from_str(&text);
    serde_path_to_error::deserialize(de).map_err(|e| format!("at JSON path {} → {}", e.path(), e.inner()))
}

fn run_suite(stem: &str, suite: &Suite) -> Vec<(String, Result<(), String>)> {
    let source = SchemaSource::from_text(format!("{stem}.jbp"), suite.blueprint.clone());
    let compiled = Compiler::new().open_by_default(suite.open_by_default).compile(&source);

    let schema = match (compiled, &suite.compile_error) {
        (Err(error), Some(expected)) => {
            let message = error.to_string();
            let result = if message.contains(expected.as_str()) {
                Ok(())
            } else {
                Err(format!("expected compile error containing {expected:?}, got {message:?}"))
            };
            return vec![(format!("{stem}/compile"), result)];
        }
        (Ok(_), Some(expected)) => {
            return vec![(format!("{stem}/compile"), Err(format!("expected compile error {expected:?}, compiled fine")))];
        }
        (Err(error), None) => return vec![(format!("{stem}/compile"), Err(error.to_string()))],
        (Ok(schema), None) => schema,
    };

    let Some(root) = suite.root.as_deref() else {
        return vec![(format!("{stem}/compile"), Ok(()))];
    };
    let deserializer = match schema.try_choose_root(root) {
        Ok(d) => d,
        Err(error) => return vec![(format!("{stem}/root"), Err(error.to_string()))],
    };

    suite
        .cases
        .iter()
        .map(|case| {
            let name = format!("{stem}/{}", case.name);
            let raw = match (&case.raw, &case.document) {
                (Some(raw), _) => raw.clone(),
                (None, Some(doc)) => doc.to_string(),
                (None, None) => return (name, Err("case has neither `raw` nor `document`".to_string())),
            };
            let result = match (deserializer.deserialize(&raw), &case.expect) {
                (Ok(value), Expect::Ok(expected)) => {
                    let actual = value.to_json();
                    if &actual == expected {
                        Ok(())
                    } else {
                        Err(format!("expected {expected}, got {actual}"))
                    }
                }
                (Ok(value), Expect::Error { .. }) => Err(format!("expected an error, accepted as {value}")),
                (Err(error), Expect::Ok(_)) => Err(format!("expected success, got {error}")),
                (Err(error), Expect::Error { path, class }) => {
                    let actual_path = error.path().to_strings();
                    let actual_class = error.class().as_str();
                    if &actual_path == path && actual_class == class {
                        Ok(())
                    } else {
                        Err(format!("expected {class} at {path:?}, got {actual_class} at {actual_path:?} ({error})"))
                    }
                }
            };
            (name, result)
        })
        .collect()
}
