//! Decoding sanitized model output into a typed invoice record.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use tracing::debug;

use super::patterns::AMOUNT_TEXT;
use crate::error::ResponseError;
use crate::models::record::{InvoiceFields, InvoiceRecord};

/// Decode `sanitized` into a successful record for `source_file`.
///
/// Missing, null or empty fields become `None`. Amounts that cannot be read
/// as numbers become `None` rather than failing the record; no field is
/// required.
pub fn normalize_record(sanitized: &str, source_file: &str) -> Result<InvoiceRecord, ResponseError> {
    let value: Value =
        serde_json::from_str(sanitized).map_err(|e| ResponseError::Decode(e.to_string()))?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(ResponseError::Validation(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            )));
        }
    };

    let fields = InvoiceFields {
        date: text_field(&map, "date"),
        invoice_number: text_field(&map, "invoice_number"),
        party_name: text_field(&map, "party_name"),
        party_address: text_field(&map, "party_address"),
        trn: text_field(&map, "trn"),
        currency: text_field(&map, "currency"),
        subtotal: amount_field(&map, "subtotal"),
        tax_amount: amount_field(&map, "tax_amount"),
        net_total: amount_field(&map, "net_total"),
        items_count: count_field(&map, "items_count"),
    };

    debug!(
        "Normalized {} with {}/10 fields present",
        source_file,
        fields.present_count()
    );

    Ok(InvoiceRecord::success(source_file, fields))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Text as the model returned it; only blank strings count as missing.
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other @ (Value::Array(_) | Value::Object(_)) => Some(other.to_string()),
    }
}

fn amount_field(map: &Map<String, Value>, key: &str) -> Option<Decimal> {
    match map.get(key)? {
        Value::Number(n) => decimal_from_number(n),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn count_field(map: &Map<String, Value>, key: &str) -> Option<u32> {
    let amount = match map.get(key)? {
        Value::Number(n) => {
            if let Some(count) = n.as_u64() {
                return u32::try_from(count).ok();
            }
            decimal_from_number(n)?
        }
        Value::String(s) => parse_amount(s)?,
        _ => return None,
    };

    if amount.is_sign_negative() || !amount.fract().is_zero() {
        return None;
    }
    amount.to_u32()
}

fn decimal_from_number(n: &serde_json::Number) -> Option<Decimal> {
    let s = n.to_string();
    Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()
}

/// Parse an amount written as text: "18,900.00", "AED 900", "1 234,56 zł".
///
/// The integer part is either plain digits or groups of three digits joined
/// by one separator used throughout. Space-grouped integers need a fraction,
/// since "100 200" may as well be two numbers. Anything that is not
/// recognisably a single number yields `None`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let caps = AMOUNT_TEXT.captures(s.trim())?;
    let int = caps.name("int")?.as_str();
    let dec = caps.name("dec").map(|m| m.as_str());
    let frac = caps.name("frac").map(|m| m.as_str());

    let mut separators = int.chars().filter(|c| !c.is_ascii_digit());
    if let Some(sep) = separators.next() {
        if separators.any(|c| c != sep) {
            return None;
        }
        if dec.is_some_and(|d| d.starts_with(sep)) {
            return None;
        }
        if sep.is_whitespace() && frac.is_none() {
            return None;
        }
    }

    let digits: String = int.chars().filter(char::is_ascii_digit).collect();
    let normalized = match frac {
        Some(frac) => format!("{}.{}", digits, frac),
        None => digits,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    let negative = caps.name("sign").is_some_and(|m| m.as_str() == "-");
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::ProcessingStatus;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_non_numeric_subtotal_becomes_null() {
        let record = normalize_record(
            r#"{"date":"2024-01-15","subtotal":"N/A","invoice_number":"INV-1"}"#,
            "a.pdf",
        )
        .unwrap();

        assert_eq!(record.status(), ProcessingStatus::Success);
        assert_eq!(record.source_file(), "a.pdf");
        let fields = record.fields().unwrap();
        assert_eq!(fields.subtotal, None);
        assert_eq!(fields.invoice_number.as_deref(), Some("INV-1"));
        assert_eq!(fields.date.as_deref(), Some("2024-01-15"));
        assert_eq!(fields.party_name, None);
        assert_eq!(fields.net_total, None);
        assert_eq!(fields.items_count, None);
    }

    #[test]
    fn test_not_json_is_decode_error() {
        let err = normalize_record("not json at all", "b.pdf").unwrap_err();
        assert!(matches!(err, ResponseError::Decode(_)));
        assert!(err.to_string().starts_with("JSON parsing error: "));
        assert!(err.to_string().contains("line 1 column"));
    }

    #[test]
    fn test_non_object_is_validation_error() {
        for input in ["[1, 2]", "42", "\"text\"", "null"] {
            let err = normalize_record(input, "c.pdf").unwrap_err();
            assert!(matches!(err, ResponseError::Validation(_)), "{input}");
        }
    }

    #[test]
    fn test_empty_object_is_success() {
        let record = normalize_record("{}", "d.pdf").unwrap();
        assert!(record.is_success());
        assert_eq!(record.fields().unwrap(), &InvoiceFields::default());
    }

    #[test]
    fn test_full_invoice() {
        let json = r#"{
            "date": "2025-08-21",
            "invoice_number": "SEFZE-1471",
            "party_name": "Shahi Enterprises FZE",
            "party_address": "Rakia Business Centre 5, Ras al-Khaimah",
            "trn": "100373811700003",
            "currency": "AED",
            "subtotal": 18000.00,
            "tax_amount": 900,
            "net_total": "18,900.00",
            "items_count": 1
        }"#;
        let record = normalize_record(json, "e.pdf").unwrap();
        let fields = record.fields().unwrap();

        assert_eq!(fields.trn.as_deref(), Some("100373811700003"));
        assert_eq!(fields.subtotal, Some(dec("18000")));
        assert_eq!(fields.tax_amount, Some(dec("900")));
        assert_eq!(fields.net_total, Some(dec("18900")));
        assert_eq!(fields.items_count, Some(1));
        assert_eq!(fields.present_count(), 10);
    }

    #[test]
    fn test_blank_strings_become_null() {
        let record = normalize_record(
            r#"{"party_name": "", "trn": "  ", "currency": "Unknown", "invoice_number": null, "party_address": " Dubai, UAE "}"#,
            "f.pdf",
        )
        .unwrap();
        let fields = record.fields().unwrap();

        assert_eq!(fields.party_name, None);
        assert_eq!(fields.trn, None);
        assert_eq!(fields.invoice_number, None);
        assert_eq!(fields.currency.as_deref(), Some("Unknown"));
        assert_eq!(fields.party_address.as_deref(), Some(" Dubai, UAE "));
    }

    #[test]
    fn test_text_fields_accept_other_json_types() {
        let record = normalize_record(
            r#"{"invoice_number": 1471, "party_address": {"city": "Dubai"}}"#,
            "g.pdf",
        )
        .unwrap();
        let fields = record.fields().unwrap();

        assert_eq!(fields.invoice_number.as_deref(), Some("1471"));
        assert_eq!(fields.party_address.as_deref(), Some(r#"{"city":"Dubai"}"#));
    }

    #[test]
    fn test_items_count_coercion() {
        let count = |v: &str| {
            normalize_record(&format!(r#"{{"items_count": {v}}}"#), "h.pdf")
                .unwrap()
                .fields()
                .unwrap()
                .items_count
        };

        assert_eq!(count("3"), Some(3));
        assert_eq!(count("3.0"), Some(3));
        assert_eq!(count("\"12\""), Some(12));
        assert_eq!(count("2.5"), None);
        assert_eq!(count("-1"), None);
        assert_eq!(count("\"several\""), None);
        assert_eq!(count("true"), None);
    }

    #[test]
    fn test_amount_fields_reject_non_numbers() {
        let record = normalize_record(
            r#"{"subtotal": true, "tax_amount": [5], "net_total": "about fifty"}"#,
            "i.pdf",
        )
        .unwrap();
        let fields = record.fields().unwrap();

        assert_eq!(fields.subtotal, None);
        assert_eq!(fields.tax_amount, None);
        assert_eq!(fields.net_total, None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("18,900.00"), Some(dec("18900.00")));
        assert_eq!(parse_amount("AED 900"), Some(dec("900")));
        assert_eq!(parse_amount("1 234,56 zł"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1.234.567"), Some(dec("1234567")));
        assert_eq!(parse_amount("1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("$45.10"), Some(dec("45.10")));
        assert_eq!(parse_amount("18,900"), Some(dec("18900")));
        assert_eq!(parse_amount("-12.50"), Some(dec("-12.50")));
        assert_eq!(parse_amount("1'234.50 CHF"), Some(dec("1234.50")));
        assert_eq!(parse_amount("12.5"), Some(dec("12.5")));
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("12 items"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_amount_rejects_merged_numbers() {
        assert_eq!(parse_amount("100 200"), None);
        assert_eq!(parse_amount("1,2,3"), None);
        assert_eq!(parse_amount("21.08.2025"), None);
        assert_eq!(parse_amount("12 kg"), None);
        assert_eq!(parse_amount("1,234.567.890"), None);
        assert_eq!(parse_amount("1.234.567,890"), None);
        assert_eq!(parse_amount("1,234,56"), None);
    }
}
