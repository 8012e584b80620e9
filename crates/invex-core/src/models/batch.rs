//! Ordered collection of records for one processing run.

use serde::Serialize;

use super::record::InvoiceRecord;

/// Records for one batch, in upload order.
///
/// The batch is append-only: records are never reordered, removed or
/// modified once pushed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BatchResult {
    records: Vec<InvoiceRecord>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append a record at the end of the batch.
    pub fn push(&mut self, record: InvoiceRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InvoiceRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InvoiceRecord> {
        self.records.iter()
    }

    /// Successful records, in batch order.
    pub fn successful(&self) -> impl Iterator<Item = &InvoiceRecord> {
        self.records.iter().filter(|r| r.is_success())
    }

    /// Failed records, in batch order.
    pub fn failed(&self) -> impl Iterator<Item = &InvoiceRecord> {
        self.records.iter().filter(|r| !r.is_success())
    }
}

impl FromIterator<InvoiceRecord> for BatchResult {
    fn from_iter<I: IntoIterator<Item = InvoiceRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a InvoiceRecord;
    type IntoIter = std::slice::Iter<'a, InvoiceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
