//! Recovering the JSON object embedded in a model response.

use tracing::{debug, warn};

use super::patterns::CODE_FENCE;
use crate::error::ResponseError;

/// Strip wrapping from a model response so a strict JSON decoder can read it.
///
/// 1. Code fences (optionally tagged `json`) are removed wherever they occur.
/// 2. If the rest is not already a single JSON object, the widest span from
///    the first `{` to the last `}` is taken, which keeps nested objects
///    intact. When a response holds several separate objects, this span
///    covers all of them and the decode step will reject it.
/// 3. Without any brace span, the trimmed text is returned as-is.
///
/// The result is not validated; decoding is the normalizer's job. Only a
/// response with nothing left after fence removal is rejected here.
pub fn sanitize_response(raw: &str) -> Result<String, ResponseError> {
    let unfenced = CODE_FENCE.replace_all(raw, "");
    let trimmed = unfenced.trim();

    if trimmed.is_empty() {
        return Err(ResponseError::MalformedResponse(
            "model returned an empty response".to_string(),
        ));
    }

    if is_json_object(trimmed) {
        return Ok(trimmed.to_string());
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            debug!(
                "Response is not bare JSON, using brace span {}..={} of {} chars",
                start,
                end,
                trimmed.len()
            );
            Ok(trimmed[start..=end].to_string())
        }
        _ => {
            warn!("No JSON object found in model response, passing text through");
            Ok(trimmed.to_string())
        }
    }
}

fn is_json_object(text: &str) -> bool {
    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(text).is_ok()
}
