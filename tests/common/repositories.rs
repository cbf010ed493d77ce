use relational_dao::{BaseDao, ExecutionResult, Executor, Pager, RowMapper, RowRecord};

use super::entities::Post;
use super::fake::{FakeFactory, FakeRow};

/// Row mapper for the fake connection: copies every column.
pub struct CopyColumns;

impl RowMapper<FakeRow> for CopyColumns {
    fn map_row(&self, row: &FakeRow) -> Result<RowRecord, sqlx::Error> {
        Ok(row.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// Concrete DAO over the shared helpers
pub struct PostDao {
    base: BaseDao<FakeFactory>,
}

impl PostDao {
    pub fn new(factory: FakeFactory) -> Self {
        Self {
            base: BaseDao::new(Executor::new(factory)),
        }
    }

    pub fn base(&self) -> &BaseDao<FakeFactory> {
        &self.base
    }

    pub async fn page(&self, current: i64) -> ExecutionResult<Vec<Post>> {
        let records = self
            .base
            .list_page_by_create_date(&Pager::new(current), "posts", &CopyColumns)
            .await?;
        Ok(records.iter().filter_map(Post::from_record).collect())
    }

    pub async fn find(&self, id: i64) -> ExecutionResult<Option<Post>> {
        let record = self.base.get_by_id("posts", id, &CopyColumns).await?;
        Ok(Post::from_record(&record))
    }

    pub async fn add_view(&self, id: i64) -> ExecutionResult<bool> {
        self.base.increment(id, "posts", "views").await
    }

    pub async fn refresh_comment_count(&self, id: i64) -> ExecutionResult<bool> {
        self.base
            .update_derived_count("posts", "comment_count", "comments", "post_id", id)
            .await
    }
}
