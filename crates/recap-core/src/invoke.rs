use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::warn;

use crate::EngineFailure;
use crate::registry::EngineEntry;

const SUMMARY_KEYS: [&str; 2] = ["summary_text", "generated_text"];
const INDEX_FAULT_MARKERS: [&str; 3] = ["index out of range", "index out of bounds", "indexerror"];

/// Call an engine and classify every outcome.
///
/// Engine errors and panics raised inside the engine are both converted into
/// an [`EngineFailure`]; nothing escapes to the caller. `text` must be
/// non-empty.
pub fn safe_invoke(
    entry: &EngineEntry,
    text: &str,
    max_length: usize,
    min_length: usize,
) -> Result<String, EngineFailure> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        entry.invoke(text, max_length, min_length)
    }));

    let failure = match outcome {
        Ok(Ok(value)) => match extract_summary(&value) {
            Ok(summary) => return Ok(summary),
            Err(failure) => failure,
        },
        Ok(Err(fault)) => classify_fault(&fault.to_string()),
        Err(payload) => classify_fault(&panic_message(payload.as_ref())),
    };

    warn!(
        model = %entry.selector(),
        engine = entry.engine_name(),
        error = %failure,
        "engine invocation failed"
    );
    Err(failure)
}

/// Pull the summary string out of an engine's native response.
pub fn extract_summary(value: &Value) -> Result<String, EngineFailure> {
    match value {
        Value::Null => Err(EngineFailure::EmptyResult),
        Value::Array(items) => match items.first() {
            None => Err(EngineFailure::EmptyResult),
            Some(Value::Object(_)) => summary_from_object(&items[0]),
            Some(other) => Err(EngineFailure::MalformedResult(format!(
                "expected a list of objects, got a list of {}",
                shape(other)
            ))),
        },
        Value::Object(map) => match map.get("error") {
            Some(error) => Err(classify_fault(
                error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string()).as_str(),
            )),
            None => summary_from_object(value),
        },
        other => Err(EngineFailure::MalformedResult(format!(
            "expected a list of objects, got {}",
            shape(other)
        ))),
    }
}

fn summary_from_object(value: &Value) -> Result<String, EngineFailure> {
    let field = SUMMARY_KEYS
        .iter()
        .find_map(|key| value.get(*key))
        .ok_or_else(|| {
            EngineFailure::MalformedResult(format!(
                "result object has none of the keys {}",
                SUMMARY_KEYS.join(", ")
            ))
        })?;
    let text = field.as_str().ok_or_else(|| {
        EngineFailure::MalformedResult(format!("summary field is {}, not a string", shape(field)))
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Err(EngineFailure::EmptyResult);
    }
    Ok(text.to_string())
}

/// Map a fault message onto the failure taxonomy.
pub fn classify_fault(message: &str) -> EngineFailure {
    let lowered = message.to_ascii_lowercase();
    if INDEX_FAULT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        EngineFailure::InternalIndex(message.to_string())
    } else {
        EngineFailure::Other(message.to_string())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "engine panicked".to_string()
    }
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
