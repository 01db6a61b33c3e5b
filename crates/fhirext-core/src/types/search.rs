//! Search result sets handed to `after_search` handlers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of a search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRow {
    /// Resource type of the row.
    pub resource_type: String,
    /// Resource id.
    pub resource_id: String,
    /// Version id.
    pub version_id: Option<String>,
    /// Resource body, when the host loaded it.
    pub resource: Option<Value>,
    /// Set by handlers to exclude the row from the returned Bundle.
    pub deleted: bool,
}

impl SearchRow {
    /// Creates a row for a resource.
    pub fn new(resource_type: &str, resource_id: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            version_id: None,
            resource: None,
            deleted: false,
        }
    }

    /// Attaches the resource body.
    pub fn with_resource(mut self, resource: Value) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Marks the row as excluded.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

/// Mutable result set; handlers exclude rows by marking them deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResultSet {
    rows: Vec<SearchRow>,
}

impl SearchResultSet {
    /// Creates a result set from rows.
    pub fn new(rows: Vec<SearchRow>) -> Self {
        Self { rows }
    }

    /// Iterates all rows, including deleted ones.
    pub fn rows(&self) -> &[SearchRow] {
        &self.rows
    }

    /// Iterates rows mutably.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut SearchRow> {
        self.rows.iter_mut()
    }

    /// Rows not marked deleted.
    pub fn visible(&self) -> impl Iterator<Item = &SearchRow> {
        self.rows.iter().filter(|r| !r.deleted)
    }

    /// Number of rows not marked deleted.
    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marked_rows_are_hidden() {
        let mut rs = SearchResultSet::new(vec![
            SearchRow::new("Patient", "1"),
            SearchRow::new("Patient", "2"),
        ]);
        for row in rs.rows_mut() {
            if row.resource_id == "2" {
                row.mark_deleted();
            }
        }
        assert_eq!(rs.visible_count(), 1);
        assert_eq!(rs.rows().len(), 2);
    }
}
