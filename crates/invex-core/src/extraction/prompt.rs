//! The fixed instruction sent to the language model with every document.

/// Schema prompt enumerating the extracted fields and the output contract.
pub const SCHEMA_PROMPT: &str = r#"You are an expert invoice data extraction system.

Read the invoice document below and extract the following fields precisely.

IMPORTANT: Reply with exactly ONE JSON object and nothing else. No explanations, no prose, no markdown.

JSON structure:
{
  "date": "string, the invoice date in YYYY-MM-DD format (convert from any other format)",
  "invoice_number": "string, the invoice or bill number",
  "party_name": "string, the vendor/supplier name",
  "party_address": "string, the complete vendor address",
  "trn": "string or null, the Tax Registration Number (VAT/TIN)",
  "currency": "string, the currency code such as USD, EUR or AED",
  "subtotal": number, the amount before tax,
  "tax_amount": number, the total tax/VAT amount,
  "net_total": number, the final amount including tax,
  "items_count": integer, the number of line items, or null if unclear
}

Rules:
- Use null for any field that is missing (never "N/A", "Unknown" or empty strings)
- Numbers must be plain numeric values without currency symbols or thousands separators
- The date must use the YYYY-MM-DD format
- Use the most prominent company name as party_name
- Return ONLY the JSON object
"#;

/// Combine the schema prompt with the document text into one request.
pub fn compose_request(schema_prompt: &str, document_text: &str) -> String {
    format!("{}\n\nInvoice content:\n{}", schema_prompt, document_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::FIELD_NAMES;

    #[test]
    fn test_prompt_names_every_field() {
        for name in FIELD_NAMES {
            assert!(SCHEMA_PROMPT.contains(&format!("\"{}\"", name)), "prompt is missing {name}");
        }
    }

    #[test]
    fn test_compose_request_appends_document() {
        let request = compose_request("PROMPT", "Invoice SEFZE-1471");
        assert!(request.starts_with("PROMPT"));
        assert!(request.ends_with("Invoice content:\nInvoice SEFZE-1471"));
    }
}
