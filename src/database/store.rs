use std::future::Future;

use serde::Deserialize;
use snafu::{OptionExt as _, ResultExt as _};
use tracing::instrument;

use super::query::field;
use super::*;

/// The operations the controllers need from a document store.
///
/// Every operation is addressed by the record type's collection ([Table::table]) and, where
/// relevant, a typed record id.
pub trait DocumentStore: Send + Sync {
    /// Lists one page of a collection along with the number of records matching the filters.
    fn list<T: Table>(&self, query: ListQuery) -> impl Future<Output = Result<Page<T>>> + Send;

    /// Fetches a record. Fails with [DatabaseError::NotFound] if it does not exist.
    fn get<T: Table>(&self, id: &Record<T>) -> impl Future<Output = Result<T>> + Send;

    /// Stores a new record under its own id. Fails if the id is taken.
    fn create<T: Table>(&self, record: &T) -> impl Future<Output = Result<T>> + Send;

    /// Merges `patch` into an existing record. Never creates the record.
    fn update<T: Table>(
        &self, id: &Record<T>, patch: serde_json::Value,
    ) -> impl Future<Output = Result<T>> + Send;

    fn delete<T: Table>(&self, id: &Record<T>) -> impl Future<Output = Result<()>> + Send;

    /// Adds `by` to a numeric field in a single statement and returns the updated record.
    ///
    /// Concurrent increments of the same field never lose an update.
    fn increment<T: Table>(
        &self, id: &Record<T>, field: &str, by: u32,
    ) -> impl Future<Output = Result<T>> + Send;
}

#[derive(Debug, Deserialize)]
struct Count {
    total: u64,
}

impl DocumentStore for Database {
    #[instrument(skip(self), fields(table = T::table()))]
    async fn list<T: Table>(&self, query: ListQuery) -> Result<Page<T>> {
        let mut bindings = self
            .sql(query.to_sql()?)
            .bind(("table", T::table()))
            .bind(("limit", query.limit.unwrap_or_default()))
            .bind(("offset", query.offset));

        for (name, value) in query.parameters() {
            bindings = bindings.bind((name, value));
        }

        let mut response = bindings.execute().await?;
        let records: Vec<T> = response.take(0).context(DeserializeSnafu)?;
        let count: Vec<Count> = response.take(1).context(DeserializeSnafu)?;
        let total = count.first().map_or(0, |count| count.total);

        tracing::debug!(returned = records.len(), total, "listed records");

        Ok(Page::new(total, records))
    }

    #[instrument(skip(self))]
    async fn get<T: Table>(&self, id: &Record<T>) -> Result<T> {
        let records: Vec<T> = self
            .sql("SELECT * FROM $id")
            .bind(("id", id))
            .fetch_first()
            .await?;

        records
            .into_iter()
            .next()
            .context(NotFoundSnafu { id: id.to_string() })
    }

    #[instrument(skip_all, fields(id = %record.id()))]
    async fn create<T: Table>(&self, record: &T) -> Result<T> {
        let created: Vec<T> = self
            .sql("CREATE $id CONTENT $content")
            .bind(("id", record.id()))
            .bind(("content", record))
            .fetch_first()
            .await?;

        tracing::debug!("created record");
        created.into_iter().next().context(EmptyQuerySnafu)
    }

    #[instrument(skip(self))]
    async fn update<T: Table>(&self, id: &Record<T>, patch: serde_json::Value) -> Result<T> {
        // a missing record has no id, so the condition keeps UPDATE from creating it
        let updated: Vec<T> = self
            .sql("UPDATE $id MERGE $patch WHERE id != NONE RETURN AFTER")
            .bind(("id", id))
            .bind(("patch", patch))
            .fetch_first()
            .await?;

        updated
            .into_iter()
            .next()
            .context(NotFoundSnafu { id: id.to_string() })
    }

    #[instrument(skip(self))]
    async fn delete<T: Table>(&self, id: &Record<T>) -> Result<()> {
        self.sql("DELETE $id").bind(("id", id)).execute().await?;
        tracing::debug!("deleted record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn increment<T: Table>(&self, id: &Record<T>, name: &str, by: u32) -> Result<T> {
        let statement = format!(
            "UPDATE $id SET {} += $by WHERE id != NONE RETURN AFTER",
            field(name)?
        );

        let updated: Vec<T> = self
            .sql(statement)
            .bind(("id", id))
            .bind(("by", by))
            .fetch_first()
            .await?;

        updated
            .into_iter()
            .next()
            .context(NotFoundSnafu { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{Like, User, Video};
    use crate::testing;

    #[tokio::test]
    async fn create_then_get_returns_the_same_record() {
        let db = testing::database().await;
        let video = testing::video("first", 1);

        let created = db.create(&video).await.unwrap();
        assert_eq!(created, video);

        let fetched: Video = db.get(&video.id).await.unwrap();
        assert_eq!(fetched, video);
    }

    #[tokio::test]
    async fn creating_an_existing_id_fails() {
        let db = testing::database().await;
        let video = testing::video("first", 1);

        db.create(&video).await.unwrap();
        assert!(db.create(&video).await.is_err());
    }

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let db = testing::database().await;

        let error = db.get(&Record::<Video>::uuid()).await.unwrap_err();
        assert!(error.is_not_found(), "unexpected error: {error}");
    }

    #[tokio::test]
    async fn list_reports_total_independent_of_limit_and_offset() {
        let db = testing::database().await;
        testing::seed_videos(&db, 5).await;

        let page: Page<Video> = db
            .list(ListQuery::new().newest_first().limit(2).offset(1))
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].title, "video 3");
        assert_eq!(page.records[1].title, "video 2");
    }

    #[tokio::test]
    async fn list_of_an_empty_collection_is_empty() {
        let db = testing::database().await;

        let page: Page<Like> = db.list(ListQuery::new()).await.unwrap();
        assert_eq!(page, Page::default());
    }

    #[tokio::test]
    async fn list_filters_on_record_ids() {
        let db = testing::database().await;
        let video = testing::video("liked", 1);
        let fubuki = Record::<User>::new("fubuki");
        let mio = Record::<User>::new("mio");

        db.create(&Like::new(fubuki.clone(), video.id.clone())).await.unwrap();
        db.create(&Like::new(mio.clone(), video.id.clone())).await.unwrap();

        let query = ListQuery::new()
            .filter("user_id", &fubuki)
            .filter("video_id", &video.id);
        let page: Page<Like> = db.list(query).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].user_id, fubuki);
    }

    #[tokio::test]
    async fn update_merges_fields_and_never_creates() {
        let db = testing::database().await;
        let video = testing::video("before", 1);
        db.create(&video).await.unwrap();

        let updated: Video = db
            .update(&video.id, json!({ "title": "after" }))
            .await
            .unwrap();
        assert_eq!(updated.title, "after");
        assert_eq!(updated.caption, video.caption);

        let missing = Record::<Video>::uuid();
        let error = db.update(&missing, json!({ "title": "ghost" })).await.unwrap_err();
        assert!(error.is_not_found());

        let page: Page<Video> = db.list(ListQuery::new()).await.unwrap();
        assert_eq!(page.total, 1, "update must not create the missing record");
    }

    #[tokio::test]
    async fn increment_adds_to_a_counter_and_never_creates() {
        let db = testing::database().await;
        let video = testing::video("counted", 1);
        db.create(&video).await.unwrap();

        let updated: Video = db.increment(&video.id, "likes", 1).await.unwrap();
        assert_eq!(updated.likes, 1);
        let updated: Video = db.increment(&video.id, "likes", 2).await.unwrap();
        assert_eq!(updated.likes, 3);

        let missing = Record::<Video>::uuid();
        assert!(db.increment(&missing, "likes", 1).await.unwrap_err().is_not_found());

        let page: Page<Video> = db.list(ListQuery::new()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn increment_rejects_invalid_field_names() {
        let db = testing::database().await;
        let video = testing::video("counted", 1);
        db.create(&video).await.unwrap();

        let error = db
            .increment(&video.id, "likes = 100, title", 1)
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::InvalidField { .. }));
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let db = testing::database().await;
        let video = testing::video("doomed", 1);
        db.create(&video).await.unwrap();

        db.delete(&video.id).await.unwrap();
        assert!(db.get(&video.id).await.unwrap_err().is_not_found());
    }
}
