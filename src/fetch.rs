use std::collections::HashSet;

use serde::Serialize;

use crate::domain::SourceRecord;

/// Accumulates the sheets pending tiles are waiting on. Append-only;
/// a sheet wanted by several tiles is listed once.
#[derive(Debug, Default)]
pub struct FetchSetBuilder {
    names: HashSet<String>,
    records: Vec<SourceRecord>,
}

impl FetchSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &SourceRecord) -> bool {
        if !self.names.insert(record.name.clone()) {
            return false;
        }
        self.records.push(record.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> FetchSet {
        FetchSet {
            records: self.records,
        }
    }
}

/// Read-only snapshot of the sheets to download, in first-seen order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchSet {
    records: Vec<SourceRecord>,
}

impl FetchSet {
    pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|record| record.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.iter().any(|record| record.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
