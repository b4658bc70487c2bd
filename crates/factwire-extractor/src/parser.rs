//! Parse provider output into extracted items

use crate::error::ExtractorError;
use factwire_domain::{ExtractedItem, Layer, Region};
use serde_json::{Map, Value};
use tracing::warn;

/// Parse a provider response into items
///
/// Accepts `{"items": [...]}` or a bare array. Malformed items are skipped
/// with a warning; a response that is not JSON, or JSON of another shape,
/// is an error.
pub fn parse_llm_response(response: &str) -> Result<Vec<ExtractedItem>, ExtractorError> {
    let json_str = normalize_response(response);

    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| ExtractorError::InvalidFormat(format!("JSON parse error: {}", e)))?;

    let items_array = match &json {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("items") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(_) => {
                return Err(ExtractorError::InvalidFormat(
                    "'items' is not an array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ExtractorError::InvalidFormat(
                "Expected a JSON object or array".to_string(),
            ))
        }
    };

    let mut items = Vec::new();
    for (idx, item_json) in items_array.iter().enumerate() {
        match parse_item_json(item_json) {
            Ok(item) => items.push(item),
            Err(e) => warn!("Skipping item {}: {}", idx, e),
        }
    }

    Ok(items)
}

/// Strip code fences and fold characters that commonly break JSON
pub fn normalize_response(response: &str) -> String {
    let trimmed = response.trim();

    let body = if let Some((_, rest)) = trimmed.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = trimmed.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        trimmed
    };

    body.trim()
        .replace('\u{feff}', "")
        .replace(['\u{201c}', '\u{201d}', '\u{ff02}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Parse a single item from JSON
fn parse_item_json(json: &Value) -> Result<ExtractedItem, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Item is not a JSON object".to_string())?;

    let fact = non_empty_str(obj, "fact").ok_or_else(|| "Missing or empty 'fact'".to_string())?;

    let confidence = number(obj, "confidence")?.unwrap_or(0.0);
    let finance_relevance = number(obj, "finance_relevance")?.unwrap_or(1.0);

    let region = obj
        .get("region")
        .and_then(Value::as_str)
        .map(Region::from_label)
        .unwrap_or_default();
    let layer = obj
        .get("layer")
        .and_then(Value::as_str)
        .map(Layer::from_label)
        .unwrap_or_default();

    let mut item = ExtractedItem::new(fact, confidence)
        .with_region(region)
        .with_layer(layer)
        .with_finance_relevance(finance_relevance);
    item.opinion = non_empty_str(obj, "opinion");
    item.evidence_span = non_empty_str(obj, "evidence_span");

    Ok(item)
}

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A finite number field, also accepted as a numeric string
fn number(obj: &Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    let value = match obj.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => Some(
            s.trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid '{}': {}", key, s))?,
        ),
        Some(other) => return Err(format!("Invalid '{}': {}", key, other)),
    };
    match value {
        Some(v) if !v.is_finite() => Err(format!("Non-finite '{}': {}", key, v)),
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_object() {
        let response = r#"{
            "items": [
                {
                    "fact": "央行宣布下调存款准备金率0.5个百分点",
                    "opinion": "",
                    "region": "国内",
                    "layer": "金融政策监管",
                    "evidence_span": "央行决定下调存款准备金率",
                    "confidence": 0.9,
                    "finance_relevance": 1.0
                }
            ]
        }"#;

        let items = parse_llm_response(response).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].region, Region::Domestic);
        assert_eq!(items[0].layer, Layer::FinancialPolicy);
        assert_eq!(items[0].opinion, None);
        assert_eq!(items[0].confidence, 0.9);
        assert_eq!(
            items[0].evidence_span.as_deref(),
            Some("央行决定下调存款准备金率")
        );
    }

    #[test]
    fn test_parse_bare_array() {
        let response = r#"[{"fact": "Bank X raised rates", "confidence": 0.8, "region": "foreign"}]"#;
        let items = parse_llm_response(response).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].region, Region::Foreign);
        assert_eq!(items[0].layer, Layer::Unknown);
        assert_eq!(items[0].finance_relevance, 1.0);
    }

    #[test]
    fn test_parse_json_with_markdown_wrapper() {
        let response = "Here you go:\n```json\n{\"items\": [{\"fact\": \"Bank X raised rates\", \"confidence\": 0.8}]}\n```\nDone.";
        let items = parse_llm_response(response).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fact, "Bank X raised rates");
    }

    #[test]
    fn test_curly_quotes_and_bom() {
        let response = "\u{feff}{\u{201c}items\u{201d}: [{\u{201c}fact\u{201d}: \u{201c}Bank X raised rates\u{201d}, \u{201c}confidence\u{201d}: 0.8}]}";
        let items = parse_llm_response(response).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fact, "Bank X raised rates");
    }

    #[test]
    fn test_empty_items() {
        assert!(parse_llm_response(r#"{"items": []}"#).unwrap().is_empty());
        assert!(parse_llm_response(r#"{"summary": "nothing"}"#).unwrap().is_empty());
        assert!(parse_llm_response("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_llm_response("This is not JSON"),
            Err(ExtractorError::InvalidFormat(_))
        ));
        assert!(parse_llm_response(r#""just a string""#).is_err());
        assert!(parse_llm_response(r#"{"items": "none"}"#).is_err());
    }

    #[test]
    fn test_parse_partial_success() {
        let response = r#"{"items": [
            {"fact": "Bank X raised rates", "confidence": 0.9},
            {"opinion": "no fact here", "confidence": 0.9},
            {"fact": "   ", "confidence": 0.9},
            {"fact": "Bank Y cut rates", "confidence": "high"},
            "not an object",
            {"fact": "Bank Z held rates", "confidence": "0.7"}
        ]}"#;

        let items = parse_llm_response(response).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].fact, "Bank X raised rates");
        assert_eq!(items[1].fact, "Bank Z held rates");
        assert_eq!(items[1].confidence, 0.7);
    }

    #[test]
    fn test_missing_confidence_defaults_to_zero() {
        let items = parse_llm_response(r#"[{"fact": "Bank X raised rates"}]"#).unwrap();
        assert_eq!(items[0].confidence, 0.0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let items = parse_llm_response(
            r#"[{"fact": "Bank X raised rates", "confidence": 1.7, "finance_relevance": -1}]"#,
        )
        .unwrap();
        assert_eq!(items[0].confidence, 1.0);
        assert_eq!(items[0].finance_relevance, 0.0);
    }

    #[test]
    fn test_non_finite_numbers_skip_the_item() {
        let response = r#"[
            {"fact": "Bank X raised rates", "confidence": "NaN"},
            {"fact": "Bank Y cut rates", "confidence": "inf"},
            {"fact": "Bank Z held rates", "confidence": 0.8, "finance_relevance": "-infinity"},
            {"fact": "Bank W paused hikes", "confidence": "0.6"}
        ]"#;

        let items = parse_llm_response(response).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fact, "Bank W paused hikes");
        assert_eq!(items[0].confidence, 0.6);
    }

    #[test]
    fn test_normalize_response() {
        assert_eq!(normalize_response("```\n[1]\n```"), "[1]");
        assert_eq!(normalize_response("  [1]  "), "[1]");
        assert_eq!(normalize_response("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }
}
