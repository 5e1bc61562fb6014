//! Output formatting for CLI commands.

use serde::Serialize;
use serde_json::Value;

use crate::action::ClassifyResponse;
use crate::cli::args::{OutputFormat, SarissaArgs};
use crate::error::Result;

/// Print a classify response in the requested format.
pub fn output_classify_response(response: &ClassifyResponse, args: &SarissaArgs) -> Result<()> {
    let body = response.to_json();
    match args.output_format {
        OutputFormat::Human => {
            print!("{}", format_classify_human(&body));
            Ok(())
        }
        OutputFormat::Json => output_json(&body, args),
        OutputFormat::Yaml => output_yaml(&body),
    }
}

/// Print validation diagnostics in the requested format.
pub fn output_validation(errors: &[String], args: &SarissaArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if errors.is_empty() {
                println!("Request is valid");
            } else {
                println!("Validation failed:");
                for (i, error) in errors.iter().enumerate() {
                    println!("  {}. {error}", i + 1);
                }
            }
            Ok(())
        }
        OutputFormat::Json => output_json(
            &serde_json::json!({"valid": errors.is_empty(), "errors": errors}),
            args,
        ),
        OutputFormat::Yaml => output_yaml(&serde_json::json!({
            "valid": errors.is_empty(),
            "errors": errors,
        })),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &SarissaArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

/// Output in YAML format.
fn output_yaml<T: Serialize>(result: &T) -> Result<()> {
    print!("{}", serde_yaml::to_string(result)?);
    Ok(())
}

/// Render a classify response body for people.
pub fn format_classify_human(body: &Value) -> String {
    let mut out = String::new();
    let text = body.get("text").and_then(Value::as_str).unwrap_or_default();
    let class = body.get("class").and_then(Value::as_str).unwrap_or_default();
    out.push_str(&format!("Classification of \"{text}\" by [{class}]\n"));
    out.push_str("═══════════════\n");

    match body.get("scores").and_then(Value::as_array) {
        Some(scores) if !scores.is_empty() => {
            for (i, score) in scores.iter().enumerate() {
                let value = match score.get("value") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                let score = score.get("score").and_then(Value::as_f64).unwrap_or(0.0);
                out.push_str(&format!("{:>3}. {value:<24} {score:.4}\n", i + 1));
            }
        }
        _ => out.push_str("No class could be assigned\n"),
    }

    if let Some(shards) = body.get("_shards") {
        let count = |key: &str| shards.get(key).and_then(Value::as_u64).unwrap_or(0);
        out.push_str(&format!(
            "\nShards: {} total, {} successful, {} failed\n",
            count("total"),
            count("successful"),
            count("failed")
        ));
    }
    if let Some(failures) = body.get("failures").and_then(Value::as_array) {
        for failure in failures {
            let index = failure.get("index").and_then(Value::as_str).unwrap_or_default();
            let shard = failure.get("shard").and_then(Value::as_u64).unwrap_or(0);
            let reason = failure
                .pointer("/reason/reason")
                .and_then(Value::as_str)
                .unwrap_or_default();
            out.push_str(&format!("  [{index}][{shard}] {reason}\n"));
        }
    }
    if let Some(took) = body.get("took").and_then(Value::as_u64) {
        out.push_str(&format!("Took: {took}ms\n"));
    }
    out
}
