use relational_dao::RowRecord;

use super::fake::FakeRow;

/// Sample Post entity for testing
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub views: i64,
}

impl Post {
    pub fn new(id: i64, title: &str, views: i64) -> Self {
        Self {
            id,
            title: title.to_string(),
            views,
        }
    }

    pub fn to_row(&self) -> FakeRow {
        FakeRow::from([
            ("id".to_string(), self.id.to_string()),
            ("title".to_string(), self.title.clone()),
            ("views".to_string(), self.views.to_string()),
        ])
    }

    pub fn from_record(record: &RowRecord) -> Option<Self> {
        Some(Self {
            id: record.get("id")?.parse().ok()?,
            title: record.get("title")?.clone(),
            views: record.get("views")?.parse().ok()?,
        })
    }
}
