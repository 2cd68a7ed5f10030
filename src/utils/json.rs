/*!
 * Best-effort JSON array extraction from free-form LLM output
 *
 * Models frequently wrap the requested JSON in prose or markdown fences
 * ("Here is your quiz: [...] Good luck!"). The helper takes everything
 * between the first `[` and the last `]` and tries to parse it.
 */

use serde_json::Value;

/// Extract the JSON array embedded in `text`.
///
/// Returns an empty vector when there is no bracketed span, when the span
/// fails to parse, or when it parses to something other than an array.
pub fn parse_json_array(text: &str) -> Vec<Value> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        tracing::debug!("No JSON array delimiters found in LLM output");
        return Vec::new();
    };

    if end < start {
        tracing::debug!("Closing bracket precedes opening bracket in LLM output");
        return Vec::new();
    }

    // '[' and ']' are single-byte, so both offsets sit on char boundaries
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) => items,
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::debug!("Failed to parse JSON array from LLM output: {}", e);
            Vec::new()
        }
    }
}
