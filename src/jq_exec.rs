// jq pre-processing for CLI inputs, backed by jaq.
use anyhow::{Context, Result, anyhow};
use jaq_core::{Compiler, Ctx, RcIter, compile::Undefined, load};
use jaq_json::Val;
use serde_json::Value;

/// Runs `filter_src` over `input` and returns every output as a JSON value.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(parse_errors)?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    for item in outputs {
        let val = item.map_err(|e| anyhow!("jq `{filter_src}` failed: {e:?}"))?;
        // Val renders as JSON text
        let text = val.to_string();
        let value = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("jq `{filter_src}` produced non-JSON output: {text}"))?;
        out.push(value);
    }
    tracing::trace!(filter = filter_src, outputs = out.len(), "applied jq filter");
    Ok(out)
}

fn parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .map(|(file, err)| format!("jq parse error: {err:?} in `{}`", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

fn undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter()
                .map(move |(name, undef)| format!("jq: undefined `{name}` ({undef:?}) in `{}`", file.code))
        })
        .collect();
    anyhow!(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_and_fans_out() {
        let input = json!({ "data": [{ "operand1": 1 }, { "operand1": 2 }] });
        let out = run_jaq(".data[]", &input).unwrap();
        assert_eq!(out, vec![json!({ "operand1": 1 }), json!({ "operand1": 2 })]);
    }

    #[test]
    fn bad_filters_are_errors() {
        assert!(run_jaq(".[", &json!({})).is_err());
        assert!(run_jaq("no_such_fn", &json!({})).is_err());
    }
}
