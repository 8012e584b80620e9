//! Regex patterns for cleaning up model output.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Markdown code fences, optionally tagged as json
    pub static ref CODE_FENCE: Regex = Regex::new(
        r"(?i)```(?:json)?\s*"
    ).unwrap();

    // A monetary amount with an optional currency symbol or code on either
    // side: "18,900.00", "AED 900", "1 234,56 zł", "$45.10". Grouped integer
    // parts must use groups of exactly three digits; the fraction has one or
    // two digits.
    pub static ref AMOUNT_TEXT: Regex = Regex::new(
        r"^(?:\p{Sc}|[A-Z]{3}|zł|kr|Kč|Ft)?\s*(?P<sign>[+-])?(?P<int>\d{1,3}(?:[ \u{00a0},.']\d{3})+|\d+)(?:(?P<dec>[.,])(?P<frac>\d{1,2}))?\s*(?:\p{Sc}|[A-Z]{3}|zł|kr|Kč|Ft)?$"
    ).unwrap();
}
