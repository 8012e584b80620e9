//! Batch statistics.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::batch::BatchResult;

/// Aggregates over a batch. Amounts only count successful records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,

    /// Sum of `net_total` over successful records.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_net: Decimal,

    /// Mean `net_total` over successful records that report one.
    #[serde(with = "rust_decimal::serde::float")]
    pub average_net: Decimal,

    /// Sum of `tax_amount` over successful records.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_tax: Decimal,

    /// Sum of `subtotal` over successful records.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_subtotal: Decimal,

    /// The currency, when every successful record that names one agrees.
    pub currency: Option<String>,
}

impl SummaryStatistics {
    /// Compute statistics for `batch`. Zero successes give zero amounts.
    pub fn from_batch(batch: &BatchResult) -> Self {
        let mut stats = Self {
            total_files: batch.len(),
            successful: 0,
            failed: 0,
            total_net: Decimal::ZERO,
            average_net: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            total_subtotal: Decimal::ZERO,
            currency: None,
        };

        let mut net_count = 0u32;
        let mut currencies: Vec<&str> = Vec::new();

        for record in batch {
            let Some(fields) = record.fields() else {
                stats.failed += 1;
                continue;
            };
            stats.successful += 1;

            if let Some(net) = fields.net_total {
                stats.total_net += net;
                net_count += 1;
            }
            if let Some(tax) = fields.tax_amount {
                stats.total_tax += tax;
            }
            if let Some(subtotal) = fields.subtotal {
                stats.total_subtotal += subtotal;
            }
            if let Some(currency) = fields.currency.as_deref() {
                if !currencies.iter().any(|c| c.eq_ignore_ascii_case(currency)) {
                    currencies.push(currency);
                }
            }
        }

        if net_count > 0 {
            stats.average_net = stats.total_net / Decimal::from(net_count);
        }
        if let [only] = currencies.as_slice() {
            stats.currency = Some(only.to_string());
        }

        stats
    }

    /// Share of files that succeeded, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.successful as f64 * 100.0 / self.total_files as f64
        }
    }

    /// Metric/value pairs for display and the summary worksheet.
    pub fn metric_rows(&self) -> Vec<(&'static str, String)> {
        let money = |amount: Decimal| match &self.currency {
            Some(currency) => format!("{} {}", format_amount(amount), currency),
            None => format_amount(amount),
        };

        vec![
            ("Total files", self.total_files.to_string()),
            ("Successful", self.successful.to_string()),
            ("Failed", self.failed.to_string()),
            ("Success rate", format!("{:.1}%", self.success_rate())),
            ("Total subtotal", money(self.total_subtotal)),
            ("Total tax", money(self.total_tax)),
            ("Total net", money(self.total_net)),
            ("Average net", money(self.average_net)),
        ]
    }
}

/// Format an amount with two decimals and comma thousands separators:
/// `1234567.8` becomes `1,234,567.80`.
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.round_dp(2));
    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let Some((integer_part, decimal_part)) = unsigned.split_once('.') else {
        return s;
    };

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    format!("{}{}.{}", sign, formatted, decimal_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{InvoiceFields, InvoiceRecord};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn success(name: &str, net: Option<&str>, tax: Option<&str>, currency: Option<&str>) -> InvoiceRecord {
        InvoiceRecord::success(
            name,
            InvoiceFields {
                net_total: net.map(dec),
                tax_amount: tax.map(dec),
                subtotal: net.map(dec),
                currency: currency.map(str::to_string),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_failed_records_are_excluded() {
        let batch: BatchResult = vec![
            success("a.pdf", Some("100"), Some("5"), Some("AED")),
            success("b.pdf", Some("200"), Some("10"), Some("AED")),
            InvoiceRecord::failed("c.pdf", "quota exceeded"),
        ]
        .into_iter()
        .collect();

        let stats = SummaryStatistics::from_batch(&batch);

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_net, dec("300"));
        assert_eq!(stats.average_net, dec("150"));
        assert_eq!(stats.total_tax, dec("15"));
        assert_eq!(stats.total_subtotal, dec("300"));
        assert_eq!(stats.currency.as_deref(), Some("AED"));
    }

    #[test]
    fn test_no_successes_gives_zero_amounts() {
        let batch: BatchResult = vec![
            InvoiceRecord::failed("a.pdf", "no text content found"),
            InvoiceRecord::failed("b.pdf", "quota exceeded"),
        ]
        .into_iter()
        .collect();

        let stats = SummaryStatistics::from_batch(&batch);

        assert_eq!(stats.successful, 0);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.total_net, Decimal::ZERO);
        assert_eq!(stats.average_net, Decimal::ZERO);
        assert_eq!(stats.total_tax, Decimal::ZERO);
        assert_eq!(stats.currency, None);
    }

    #[test]
    fn test_empty_batch() {
        let stats = SummaryStatistics::from_batch(&BatchResult::new());
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_missing_net_total_is_not_averaged() {
        let batch: BatchResult = vec![
            success("a.pdf", Some("90"), None, None),
            success("b.pdf", None, None, None),
        ]
        .into_iter()
        .collect();

        let stats = SummaryStatistics::from_batch(&batch);

        assert_eq!(stats.total_net, dec("90"));
        assert_eq!(stats.average_net, dec("90"));
    }

    #[test]
    fn test_mixed_currencies() {
        let batch: BatchResult = vec![
            success("a.pdf", Some("1"), None, Some("USD")),
            success("b.pdf", Some("1"), None, Some("usd")),
            success("c.pdf", Some("1"), None, Some("EUR")),
        ]
        .into_iter()
        .collect();

        assert_eq!(SummaryStatistics::from_batch(&batch).currency, None);
    }

    #[test]
    fn test_from_batch_is_idempotent() {
        let batch: BatchResult = vec![
            success("a.pdf", Some("10.50"), Some("0.50"), None),
            InvoiceRecord::failed("b.pdf", "boom"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            SummaryStatistics::from_batch(&batch),
            SummaryStatistics::from_batch(&batch)
        );
    }

    #[test]
    fn test_metric_rows() {
        let batch: BatchResult = vec![
            success("a.pdf", Some("18900"), Some("900"), Some("AED")),
            InvoiceRecord::failed("b.pdf", "boom"),
        ]
        .into_iter()
        .collect();

        let rows = SummaryStatistics::from_batch(&batch).metric_rows();

        assert_eq!(rows[0], ("Total files", "2".to_string()));
        assert_eq!(rows[3], ("Success rate", "50.0%".to_string()));
        assert_eq!(rows[6], ("Total net", "18,900.00 AED".to_string()));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("1234.56")), "1,234.56");
        assert_eq!(format_amount(dec("12345678.9")), "12,345,678.90");
        assert_eq!(format_amount(dec("999")), "999.00");
        assert_eq!(format_amount(dec("-1234.5")), "-1,234.50");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
    }
}
