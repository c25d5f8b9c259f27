//! Operation options, aggregation stages and results.

use std::cmp::Ordering;

use entidoc_codec::{Document, Value};

use crate::filter::{Filter, ID_FIELD};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Options for `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents returned.
    pub limit: Option<u64>,
    /// Sort key applied before skip and limit.
    pub sort: Option<(String, SortOrder)>,
}

impl FindOptions {
    /// No skip, no limit, natural order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limit.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the skip.
    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the sort key.
    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    /// Apply sort, skip and limit to a list of documents.
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some((field, order)) = &self.sort {
            sort_documents(&mut docs, field, *order);
        }
        let skip = usize::try_from(self.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        docs.into_iter().skip(skip).take(limit).collect()
    }
}

/// Which version of a document a find-and-modify call returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the modification.
    #[default]
    Before,
    /// The document as it is after the modification.
    After,
}

/// One stage of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep matching documents.
    Match(Filter),
    /// Order documents by a field.
    Sort(String, SortOrder),
    /// Drop the first `n` documents.
    Skip(u64),
    /// Keep at most `n` documents.
    Limit(u64),
    /// Keep only the listed fields (plus `_id`).
    Project(Vec<String>),
    /// Replace the stream with one document holding the count under the given field.
    Count(String),
}

impl Stage {
    /// Apply this stage to a stream of documents.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        match self {
            Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Sort(field, order) => {
                let mut docs = docs;
                sort_documents(&mut docs, field, *order);
                docs
            }
            Stage::Skip(n) => FindOptions::new().skip(*n).apply(docs),
            Stage::Limit(n) => FindOptions::new().limit(*n).apply(docs),
            Stage::Project(fields) => docs
                .into_iter()
                .map(|doc| {
                    doc.into_iter()
                        .filter(|(k, _)| k == ID_FIELD || fields.iter().any(|f| f == k))
                        .collect()
                })
                .collect(),
            Stage::Count(field) => {
                let count = i64::try_from(docs.len()).unwrap_or(i64::MAX);
                vec![Document::new().with(field.clone(), count)]
            }
        }
    }
}

/// Outcome of a replace or update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    /// Documents matched by the filter.
    pub matched_count: u64,
    /// Documents actually changed.
    pub modified_count: u64,
    /// Identifier of an upserted document.
    pub upserted_id: Option<Value>,
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    /// Documents removed.
    pub deleted_count: u64,
}

fn sort_documents(docs: &mut [Document], field: &str, order: SortOrder) {
    docs.sort_by(|a, b| {
        let ordering = match (a.get_path(field), b.get_path(field)) {
            (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<Document> {
        (1..=5)
            .map(|i| Document::new().with("n", i).with("odd", i % 2 == 1))
            .collect()
    }

    #[test]
    fn find_options_sort_skip_limit() {
        let out = FindOptions::new()
            .sort("n", SortOrder::Descending)
            .skip(1)
            .limit(2)
            .apply(docs());
        let ns: Vec<i64> = out.iter().filter_map(|d| d.get_i64("n")).collect();
        assert_eq!(ns, vec![4, 3]);
    }

    #[test]
    fn pipeline_stages() {
        let mut stream = docs();
        for stage in [
            Stage::Match(Filter::eq("odd", true)),
            Stage::Project(vec!["n".to_string()]),
            Stage::Count("total".to_string()),
        ] {
            stream = stage.apply(stream);
        }
        assert_eq!(stream, vec![Document::new().with("total", 3i64)]);
    }

    #[test]
    fn project_keeps_listed_fields() {
        let out = Stage::Project(vec!["odd".to_string()]).apply(docs());
        assert_eq!(out[0].keys().collect::<Vec<_>>(), vec!["odd"]);
    }
}
