//! `jbp`: check blueprints, validate documents, emit JSON Schema.
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use json_blueprint::{
    Compiler, NormalizedValue, RootDeserializer, Schema, SchemaSource, ValidationError,
    to_json_schema,
};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile JSON blueprints and validate documents against them
#[derive(Parser, Debug)]
#[command(name = "jbp", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile a blueprint file and list its types and roots
    Check(CheckCmd),
    /// validate JSON documents against a root
    Validate(ValidateCmd),
    /// emit a JSON Schema for a root
    Schema(SchemaCmd),
}

#[derive(Args, Debug, Clone)]
struct BlueprintSettings {
    /// blueprint file
    #[arg(long, short)]
    blueprint: PathBuf,

    /// objects without an open/closed modifier drop unknown keys
    #[arg(long, default_value_t = false)]
    open: bool,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is validated
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug)]
struct CheckCmd {
    #[command(flatten)]
    blueprint: BlueprintSettings,
}

#[derive(Args, Debug)]
struct ValidateCmd {
    #[command(flatten)]
    blueprint: BlueprintSettings,

    /// root to validate against
    #[arg(long, short)]
    root: String,

    #[command(flatten)]
    input_settings: InputSettings,

    /// report every violation instead of stopping at the first
    #[arg(long, default_value_t = false)]
    all: bool,

    /// print each accepted document (defaults applied) to stdout
    #[arg(long, default_value_t = false)]
    print: bool,
}

#[derive(Args, Debug)]
struct SchemaCmd {
    #[command(flatten)]
    blueprint: BlueprintSettings,

    /// root to emit
    #[arg(long, short)]
    root: String,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One unit of input to validate.
#[derive(Debug)]
struct Document {
    label: String,
    payload: Payload,
}

#[derive(Debug)]
enum Payload {
    /// Untouched text; the validator reports malformed JSON itself.
    Raw(String),
    Value(serde_json::Value),
}

struct Outcome {
    label: String,
    result: Result<NormalizedValue, Vec<ValidationError>>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl BlueprintSettings {
    fn compile(&self) -> Result<Schema> {
        let source = SchemaSource::from_file(&self.blueprint)?;
        let schema = Compiler::new().open_by_default(self.open).compile(&source)?;
        Ok(schema)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = if source_path_str == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
                buf
            } else {
                std::fs::read_to_string(&source_path)
                    .with_context(|| format!("failed to read input file {source_path_str}"))?
            };

            if self.ndjson {
                for (ix, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", ix + 1);
                    self.push_document(&mut documents, label, line.to_string())?;
                }
            } else {
                self.push_document(&mut documents, source_path_str, source)?;
            }
        }
        tracing::debug!(documents = documents.len(), "loaded inputs");
        Ok(documents)
    }

    fn push_document(&self, documents: &mut Vec<Document>, label: String, text: String) -> Result<()> {
        if self.json_pointer.is_none() && self.jq_expr.is_none() {
            documents.push(Document { label, payload: Payload::Raw(text) });
            return Ok(());
        }
        let Ok(mut json_value) = serde_json::from_str::<serde_json::Value>(&text) else {
            // Leave it to the validator to classify the parse failure.
            documents.push(Document { label, payload: Payload::Raw(text) });
            return Ok(());
        };
        if let Some(pointer) = self.json_pointer.as_ref() {
            json_value = json_value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} matched nothing in {label}"))?;
        }
        match self.jq_expr.as_ref() {
            None => documents.push(Document { label, payload: Payload::Value(json_value) }),
            Some(jq_expr) => {
                let outputs = crate::jq_exec::run_jaq(jq_expr, &json_value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let fan_out = outputs.len() > 1;
                for (ix, value) in outputs.into_iter().enumerate() {
                    let label = if fan_out { format!("{label}#{ix}") } else { label.clone() };
                    documents.push(Document { label, payload: Payload::Value(value) });
                }
            }
        }
        Ok(())
    }
}

impl Document {
    fn validate(&self, deserializer: &RootDeserializer, all: bool) -> Outcome {
        let result = match (&self.payload, all) {
            (Payload::Raw(text), false) => deserializer.deserialize(text).map_err(|e| vec![e]),
            (Payload::Value(value), false) => deserializer.deserialize_value(value).map_err(|e| vec![e]),
            (Payload::Raw(text), true) => deserializer.deserialize_all(text).map_err(|e| e.into_inner()),
            (Payload::Value(value), true) => {
                deserializer.deserialize_value_all(value).map_err(|e| e.into_inner())
            }
        };
        Outcome { label: self.label.clone(), result }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => {
                let schema = target.blueprint.compile()?;
                print_summary(&schema);
                Ok(ExitCode::SUCCESS)
            }
            Command::Validate(target) => {
                let schema = target.blueprint.compile()?;
                let deserializer = schema.try_choose_root(&target.root)?;
                let documents = target.input_settings.load_documents()?;

                let outcomes: Vec<Outcome> = documents
                    .par_iter()
                    .map(|doc| doc.validate(&deserializer, target.all))
                    .collect();

                let mut failed = 0usize;
                for outcome in &outcomes {
                    match &outcome.result {
                        Ok(value) => {
                            eprintln!("{} {}", "ok".green().bold(), outcome.label);
                            if target.print {
                                println!("{}", serde_json::to_string(value)?);
                            }
                        }
                        Err(errors) => {
                            failed += 1;
                            eprintln!("{} {}", "FAIL".red().bold(), outcome.label);
                            for error in errors {
                                eprintln!(
                                    "    {} {} {}",
                                    error.path().to_string().yellow(),
                                    error.violation(),
                                    format!("[{}]", error.class().as_str()).dimmed(),
                                );
                            }
                        }
                    }
                }
                let passed = outcomes.len() - failed;
                let summary = format!("{passed} passed, {failed} failed");
                if failed == 0 {
                    eprintln!("{}", summary.green());
                    Ok(ExitCode::SUCCESS)
                } else {
                    eprintln!("{}", summary.red());
                    Ok(ExitCode::FAILURE)
                }
            }
            Command::Schema(target) => {
                let schema = target.blueprint.compile()?;
                let json_schema = to_json_schema(&schema, &target.root)?;
                let schema_src = serde_json::to_string_pretty(&json_schema)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &schema_src)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{schema_src}");
                }
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_summary(schema: &Schema) {
    let roots: Vec<&str> = schema.root_names().collect();
    println!(
        "{} {} ({} types, roots: {})",
        "ok".green().bold(),
        schema.origin(),
        schema.type_names().count(),
        if roots.is_empty() { "none".to_string() } else { roots.join(", ") },
    );
    for name in schema.type_names() {
        let Some(def) = schema.get_type(name) else { continue };
        let keyword = if schema.is_root(name) { "root" } else { "type" };
        let openness = if def.closed { "closed" } else { "open" };
        println!("  {} {} ({openness})", keyword.cyan(), name.bold());
        for field in def.fields.values() {
            let marker = if field.required { "" } else { "optional " };
            let default = field.default.as_ref().map(|d| format!(" = {d}")).unwrap_or_default();
            println!("    {marker}{}: {}{default}", field.name, field.ty.display(schema));
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    let mut stdin_taken = false;
    for raw in patterns {
        let pattern = raw.as_ref();
        if pattern == "-" {
            // stdin can only be drained once
            if stdin_taken {
                return Err(anyhow!("'-' (stdin) given more than once"));
            }
            stdin_taken = true;
            out.push(PathBuf::from(pattern));
        } else if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globs_must_match_something() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        assert_eq!(resolve_file_path_patterns([pattern.as_str()]).unwrap().len(), 2);

        let missing = format!("{}/*.ndjson", dir.path().display());
        assert!(resolve_file_path_patterns([missing.as_str()]).is_err());
        assert_eq!(resolve_file_path_patterns(["-"]).unwrap(), vec![PathBuf::from("-")]);
    }

    #[test]
    fn stdin_may_be_named_only_once() {
        let err = resolve_file_path_patterns(["-", "a.json", "-"]).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
        assert_eq!(
            resolve_file_path_patterns(["a.json", "-"]).unwrap(),
            vec![PathBuf::from("a.json"), PathBuf::from("-")]
        );
    }

    #[test]
    fn ndjson_pointer_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.ndjson");
        std::fs::write(
            &path,
            "{\"p\": {\"operand1\": 1, \"operand2\": 2}}\n\n{\"p\": {\"operand1\": \"x\", \"operand2\": 2}}\nnot json\n",
        )
        .unwrap();
        let settings = InputSettings {
            ndjson: true,
            json_pointer: Some("/p".into()),
            jq_expr: None,
            input: vec![path.display().to_string()],
        };
        let docs = settings.load_documents().unwrap();
        assert_eq!(docs.len(), 3);
        assert!(docs[1].label.ends_with(":3"));

        let schema = json_blueprint::load_str("root Parameters { operand1: number, operand2: number }").unwrap();
        let de = schema.choose_root("Parameters");
        let outcomes: Vec<_> = docs.iter().map(|d| d.validate(&de, true)).collect();
        assert!(outcomes[0].result.is_ok());
        let errs = outcomes[1].result.as_ref().unwrap_err();
        assert_eq!(errs[0].path().to_string(), "operand1");
        let errs = outcomes[2].result.as_ref().unwrap_err();
        assert_eq!(errs[0].class().as_str(), "malformed-input");
    }
}
