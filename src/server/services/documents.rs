//! JSON document collections on top of SQLite.
//!
//! Every collection is a table of `(id TEXT UNIQUE, body TEXT)` where `body`
//! is the serialized document. Filters are expressed with `json_extract` and
//! `json_each`, so the field paths passed to [`Filter`] must be trusted
//! constants. Listing is newest first (`rowid DESC`); replacing a document
//! keeps its row and therefore its position.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Page, PageRequest};

pub trait Document: Serialize + DeserializeOwned + Send + Sync + Unpin {
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("database is busy")]
    Busy,
    #[error("corrupt document in {collection}: {source}")]
    Corrupt {
        collection: &'static str,
        source: serde_json::Error,
    },
    #[error("document violates a unique constraint in {0}")]
    Duplicate(&'static str),
}

impl StoreError {
    fn from_write(collection: &'static str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Duplicate(collection),
            _ => Self::from(err),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_busy(&err) {
            Self::Busy
        } else {
            Self::Database(err)
        }
    }
}

/// SQLITE_BUSY and SQLITE_LOCKED, including their extended codes.
fn is_busy(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

/// The exact stored text a document was decoded from. Precondition for
/// [`Collection::replace_if_in`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

/// A value bound into a filter clause, compared against `json_extract` output.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Text(String),
    Real(f64),
    Int(i64),
}

impl From<&str> for Bind {
    fn from(value: &str) -> Self {
        Bind::Text(value.to_string())
    }
}

impl From<String> for Bind {
    fn from(value: String) -> Self {
        Bind::Text(value)
    }
}

impl From<Uuid> for Bind {
    fn from(value: Uuid) -> Self {
        Bind::Text(value.to_string())
    }
}

impl From<f64> for Bind {
    fn from(value: f64) -> Self {
        Bind::Real(value)
    }
}

impl From<i64> for Bind {
    fn from(value: i64) -> Self {
        Bind::Int(value)
    }
}

/// JSON booleans come back from `json_extract` as 0/1.
impl From<bool> for Bind {
    fn from(value: bool) -> Self {
        Bind::Int(i64::from(value))
    }
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(&'static str, Bind),
    Gte(&'static str, Bind),
    Lte(&'static str, Bind),
    Contains(&'static str, Bind),
    AnyItemIn {
        array: &'static str,
        field: &'static str,
        values: Vec<Bind>,
    },
}

/// Conjunction of conditions over document fields. Paths are JSON paths
/// such as `$.category`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, path: &'static str, value: impl Into<Bind>) -> Self {
        self.conditions.push(Condition::Eq(path, value.into()));
        self
    }

    pub fn gte(mut self, path: &'static str, value: impl Into<Bind>) -> Self {
        self.conditions.push(Condition::Gte(path, value.into()));
        self
    }

    pub fn lte(mut self, path: &'static str, value: impl Into<Bind>) -> Self {
        self.conditions.push(Condition::Lte(path, value.into()));
        self
    }

    /// The array at `path` contains `value`.
    pub fn contains(mut self, path: &'static str, value: impl Into<Bind>) -> Self {
        self.conditions.push(Condition::Contains(path, value.into()));
        self
    }

    /// Some element of the array at `array` has `field` equal to one of `values`.
    pub fn any_item_in<V: Into<Bind>>(
        mut self,
        array: &'static str,
        field: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::AnyItemIn {
            array,
            field,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Eq(path, value) => {
                    push_extract(qb, path);
                    qb.push(" = ");
                    push_bind(qb, value);
                }
                Condition::Gte(path, value) => {
                    push_extract(qb, path);
                    qb.push(" >= ");
                    push_bind(qb, value);
                }
                Condition::Lte(path, value) => {
                    push_extract(qb, path);
                    qb.push(" <= ");
                    push_bind(qb, value);
                }
                Condition::Contains(path, value) => {
                    qb.push(format!(
                        "EXISTS (SELECT 1 FROM json_each(body, '{path}') WHERE json_each.value = "
                    ));
                    push_bind(qb, value);
                    qb.push(")");
                }
                Condition::AnyItemIn { values, .. } if values.is_empty() => {
                    qb.push("0");
                }
                Condition::AnyItemIn {
                    array,
                    field,
                    values,
                } => {
                    qb.push(format!(
                        "EXISTS (SELECT 1 FROM json_each(body, '{array}') \
                         WHERE json_extract(json_each.value, '{field}') IN ("
                    ));
                    let mut separated = qb.separated(", ");
                    for value in values {
                        match value {
                            Bind::Text(v) => separated.push_bind(v.clone()),
                            Bind::Real(v) => separated.push_bind(*v),
                            Bind::Int(v) => separated.push_bind(*v),
                        };
                    }
                    qb.push("))");
                }
            }
        }
    }
}

fn push_extract(qb: &mut QueryBuilder<'_, Sqlite>, path: &str) {
    qb.push(format!("json_extract(body, '{path}')"));
}

fn push_bind(qb: &mut QueryBuilder<'_, Sqlite>, value: &Bind) {
    match value {
        Bind::Text(v) => qb.push_bind(v.clone()),
        Bind::Real(v) => qb.push_bind(*v),
        Bind::Int(v) => qb.push_bind(*v),
    };
}

/// Typed handle on one collection table.
pub struct Collection<T> {
    pool: SqlitePool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert(&self, doc: &T) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, doc).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    /// Returns `false` when no document with that id exists.
    pub async fn replace(&self, doc: &T) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::replace_in(&mut conn, doc).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::COLLECTION);
        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Opens a transaction whose first statement takes the write lock, so
    /// concurrent writers queue on the busy timeout instead of failing on a
    /// read-to-write lock upgrade.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("UPDATE {} SET body = body WHERE 0", T::COLLECTION);
        sqlx::query(&sql).execute(&mut *tx).await?;
        Ok(tx)
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT body FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY rowid DESC");

        let bodies: Vec<String> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        bodies.iter().map(|body| decode(body)).collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT body FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY rowid DESC LIMIT 1");

        let body: Option<String> = qb.build_query_scalar().fetch_optional(&self.pool).await?;
        body.as_deref().map(decode).transpose()
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);

        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    pub async fn find_page(&self, filter: &Filter, page: PageRequest) -> Result<Page<T>, StoreError> {
        let total = self.count(filter).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT body FROM {}", T::COLLECTION));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY rowid DESC LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let bodies: Vec<String> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        let items = bodies
            .iter()
            .map(|body| decode(body))
            .collect::<Result<Vec<T>, _>>()?;

        Ok(Page {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    pub async fn get_in(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<T>, StoreError> {
        let sql = format!("SELECT body FROM {} WHERE id = ?", T::COLLECTION);
        let body: Option<String> = sqlx::query_scalar(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        body.as_deref().map(decode).transpose()
    }

    pub async fn insert_in(conn: &mut SqliteConnection, doc: &T) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO {} (id, body) VALUES (?, ?)", T::COLLECTION);
        sqlx::query(&sql)
            .bind(doc.id().to_string())
            .bind(encode(doc)?)
            .execute(&mut *conn)
            .await
            .map_err(|err| StoreError::from_write(T::COLLECTION, err))?;
        Ok(())
    }

    pub async fn replace_in(conn: &mut SqliteConnection, doc: &T) -> Result<bool, StoreError> {
        let sql = format!("UPDATE {} SET body = ? WHERE id = ?", T::COLLECTION);
        let result = sqlx::query(&sql)
            .bind(encode(doc)?)
            .bind(doc.id().to_string())
            .execute(&mut *conn)
            .await
            .map_err(|err| StoreError::from_write(T::COLLECTION, err))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_with_revision_in(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<(T, Revision)>, StoreError> {
        let sql = format!("SELECT body FROM {} WHERE id = ?", T::COLLECTION);
        let body: Option<String> = sqlx::query_scalar(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        match body {
            Some(body) => Ok(Some((decode(&body)?, Revision(body)))),
            None => Ok(None),
        }
    }

    /// Compare-and-set: writes `doc` only if the stored body is still exactly
    /// the one read as `expected`. Returns whether the write happened.
    pub async fn replace_if_in(
        conn: &mut SqliteConnection,
        doc: &T,
        expected: &Revision,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE {} SET body = ? WHERE id = ? AND body = ?",
            T::COLLECTION
        );
        let result = sqlx::query(&sql)
            .bind(encode(doc)?)
            .bind(doc.id().to_string())
            .bind(&expected.0)
            .execute(&mut *conn)
            .await
            .map_err(|err| StoreError::from_write(T::COLLECTION, err))?;
        Ok(result.rows_affected() > 0)
    }
}

fn encode<T: Document>(doc: &T) -> Result<String, StoreError> {
    serde_json::to_string(doc).map_err(|source| StoreError::Corrupt {
        collection: T::COLLECTION,
        source,
    })
}

fn decode<T: Document>(body: &str) -> Result<T, StoreError> {
    serde_json::from_str(body).map_err(|source| StoreError::Corrupt {
        collection: T::COLLECTION,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::DatabaseSettings;
    use crate::database::setup_database;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: Uuid,
        title: String,
        score: f64,
        pinned: bool,
        tags: Vec<String>,
        items: Vec<NoteItem>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct NoteItem {
        product: Uuid,
    }

    // Borrow the posts table; the schema only cares about (id, body).
    impl Document for Note {
        const COLLECTION: &'static str = "posts";

        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn note(title: &str, score: f64, pinned: bool, tags: &[&str]) -> Note {
        Note {
            id: Uuid::new_v4(),
            title: title.to_string(),
            score,
            pinned,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            items: vec![],
        }
    }

    async fn notes() -> Collection<Note> {
        let pool = setup_database(&DatabaseSettings::in_memory())
            .await
            .expect("in-memory database");
        Collection::new(pool)
    }

    #[tokio::test]
    async fn insert_get_replace_delete() {
        let notes = notes().await;
        let mut doc = note("first", 1.0, false, &[]);

        notes.insert(&doc).await.unwrap();
        assert_eq!(notes.get(doc.id).await.unwrap(), Some(doc.clone()));

        doc.title = "renamed".into();
        assert!(notes.replace(&doc).await.unwrap());
        assert_eq!(notes.get(doc.id).await.unwrap().unwrap().title, "renamed");

        assert!(notes.delete(doc.id).await.unwrap());
        assert!(!notes.delete(doc.id).await.unwrap());
        assert_eq!(notes.get(doc.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_id_is_reported() {
        let notes = notes().await;
        let doc = note("first", 1.0, false, &[]);
        notes.insert(&doc).await.unwrap();

        let err = notes.insert(&doc).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("posts")));
    }

    #[tokio::test]
    async fn filters_and_newest_first() {
        let notes = notes().await;
        let a = note("a", 1.0, true, &["maize"]);
        let b = note("b", 5.0, false, &["maize", "beans"]);
        let c = note("c", 9.0, true, &[]);
        for doc in [&a, &b, &c] {
            notes.insert(doc).await.unwrap();
        }

        let all = notes.find(&Filter::new()).await.unwrap();
        assert_eq!(
            all.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(),
            vec!["c", "b", "a"]
        );

        let pinned = notes.find(&Filter::new().eq("$.pinned", true)).await.unwrap();
        assert_eq!(pinned.len(), 2);

        let mid = notes
            .find(&Filter::new().gte("$.score", 1.0).lte("$.score", 5.0))
            .await
            .unwrap();
        assert_eq!(mid.len(), 2);

        let maize = notes
            .find(&Filter::new().contains("$.tags", "maize"))
            .await
            .unwrap();
        assert_eq!(maize.len(), 2);

        let one = notes
            .find_one(&Filter::new().eq("$.title", "b"))
            .await
            .unwrap();
        assert_eq!(one.map(|n| n.id), Some(b.id));
    }

    #[tokio::test]
    async fn any_item_in_matches_nested_fields() {
        let notes = notes().await;
        let product = Uuid::new_v4();
        let mut doc = note("order", 0.0, false, &[]);
        doc.items = vec![NoteItem { product }];
        notes.insert(&doc).await.unwrap();
        notes.insert(&note("other", 0.0, false, &[])).await.unwrap();

        let hits = notes
            .find(&Filter::new().any_item_in("$.items", "$.product", [product]))
            .await
            .unwrap();
        assert_eq!(hits, vec![doc]);

        let none = notes
            .find(&Filter::new().any_item_in("$.items", "$.product", Vec::<Uuid>::new()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn pages_count_everything() {
        let notes = notes().await;
        for i in 0..12 {
            notes.insert(&note(&format!("n{i}"), 0.0, false, &[])).await.unwrap();
        }

        let page = notes
            .find_page(&Filter::new(), PageRequest::new(Some(2), Some(5)))
            .await
            .unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].title, "n6");
    }

    #[tokio::test]
    async fn conditional_replace_detects_concurrent_change() {
        let notes = notes().await;
        let doc = note("stock", 10.0, false, &[]);
        notes.insert(&doc).await.unwrap();

        let mut conn = notes.pool().acquire().await.unwrap();
        let (mut current, revision) = Collection::<Note>::get_with_revision_in(&mut conn, doc.id)
            .await
            .unwrap()
            .unwrap();
        current.score = 7.0;
        assert!(Collection::replace_if_in(&mut conn, &current, &revision)
            .await
            .unwrap());

        current.score = 4.0;
        assert!(!Collection::replace_if_in(&mut conn, &current, &revision)
            .await
            .unwrap());
        drop(conn);
        assert_eq!(notes.get(doc.id).await.unwrap().unwrap().score, 7.0);
    }

    #[tokio::test]
    async fn conditional_replace_survives_fractional_values() {
        let notes = notes().await;
        let doc = note("stock", 100.0, false, &[]);
        notes.insert(&doc).await.unwrap();

        let mut conn = notes.pool().acquire().await.unwrap();
        for _ in 0..20 {
            let (mut current, revision) =
                Collection::<Note>::get_with_revision_in(&mut conn, doc.id)
                    .await
                    .unwrap()
                    .unwrap();
            current.score -= 0.3;
            assert!(Collection::replace_if_in(&mut conn, &current, &revision)
                .await
                .unwrap());
        }
        drop(conn);

        let score = notes.get(doc.id).await.unwrap().unwrap().score;
        assert!((score - 94.0).abs() < 1e-9, "{score}");
    }

    #[tokio::test]
    async fn write_transactions_commit() {
        let notes = notes().await;
        let doc = note("locked", 1.0, false, &[]);

        let mut tx = notes.begin_write().await.unwrap();
        Collection::insert_in(&mut tx, &doc).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(notes.get(doc.id).await.unwrap(), Some(doc));
    }
}
