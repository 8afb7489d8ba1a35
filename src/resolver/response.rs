//! Normalisation of remote answer payloads
//!
//! Endpoints disagree on shape. Accepted forms:
//!
//! ```text
//! "crane"
//! {"solution": "crane", "days_since_launch": 940}
//! {"word": "CRANE"}
//! {"answer": "crane", "puzzle_number": 940}
//! {"data": { ...any of the object forms above... }}
//! ```

use serde_json::Value;

use crate::utils::error::ResolveError;
use crate::utils::normalize_word;

const WORD_FIELDS: &[&str] = &["solution", "word", "answer"];
const NUMBER_FIELDS: &[&str] = &["days_since_launch", "puzzle_number", "id"];

/// Word and optional puzzle number extracted from a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswer {
    pub word: String,
    pub puzzle_number: Option<i64>,
}

/// Extract the answer from any supported payload shape
pub fn parse_answer(body: &Value) -> Result<ParsedAnswer, ResolveError> {
    match body {
        Value::String(raw) => to_word(raw).map(|word| ParsedAnswer {
            word,
            puzzle_number: None,
        }),
        Value::Object(map) => {
            if let Some(raw) = WORD_FIELDS
                .iter()
                .find_map(|field| map.get(*field).and_then(Value::as_str))
            {
                let word = to_word(raw)?;
                let puzzle_number = NUMBER_FIELDS
                    .iter()
                    .find_map(|field| map.get(*field).and_then(Value::as_i64));
                return Ok(ParsedAnswer {
                    word,
                    puzzle_number,
                });
            }

            match map.get("data") {
                Some(inner @ Value::Object(_)) => parse_answer(inner),
                _ => Err(ResolveError::Decode(
                    "payload has no solution/word/answer field".to_string(),
                )),
            }
        }
        other => Err(ResolveError::Decode(format!(
            "unsupported payload type: {}",
            type_name(other)
        ))),
    }
}

fn to_word(raw: &str) -> Result<String, ResolveError> {
    normalize_word(raw)
        .ok_or_else(|| ResolveError::Decode(format!("not a five letter word: {raw:?}")))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
