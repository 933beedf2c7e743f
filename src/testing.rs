//! Fixtures shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use snafu::IntoError as _;
use tokio::sync::Notify;

use crate::database::{
    Database, DatabaseError, DocumentStore, ListQuery, Page, QuerySnafu, Record, Result, Table,
};
use crate::model::{Timestamp, User, Video};
use crate::service::{ServiceError, StoreSnafu};
use crate::session::{Actor, Session};

const EPOCH: i64 = 1_700_000_000;

/// A fresh in-memory store with the schema applied.
pub(crate) async fn database() -> Database {
    let db = Database::memory().await.unwrap();
    db.apply_schema().await.unwrap();
    db
}

/// A fixed instant, `seconds` after an arbitrary epoch.
pub(crate) fn at(seconds: i64) -> Timestamp {
    Timestamp::from_unix(EPOCH + seconds).unwrap()
}

/// A video published `seconds` after the fixture epoch.
pub(crate) fn video(title: &str, seconds: i64) -> Video {
    let mut video = Video::new(
        title.to_owned(),
        format!("{title} caption"),
        Record::new("author"),
        "Author".to_owned(),
        format!("{title}-file"),
        format!("{title}-thumb"),
    );
    video.created_at = at(seconds);
    video
}

/// Stores `count` videos titled `video 0` (oldest) to `video {count - 1}` (newest).
pub(crate) async fn seed_videos(db: &Database, count: usize) -> Vec<Video> {
    let mut videos = Vec::with_capacity(count);
    for n in 0..count {
        let created = db.create(&video(&format!("video {n}"), n as i64)).await.unwrap();
        videos.push(created);
    }
    videos
}

/// Stores a profile whose id is its username.
pub(crate) async fn user(db: &Database, username: &str, name: &str) -> User {
    let mut user = User::new(username.to_owned(), name.to_owned());
    user.id = Record::new(username);
    db.create(&user).await.unwrap()
}

pub(crate) fn actor(name: &str) -> Actor {
    Actor::new(Record::new(name), name.to_owned())
}

/// A session signed in as `name`, who has no profile.
pub(crate) fn session(name: &str) -> Session {
    Session::signed_in(actor(name))
}

pub(crate) fn store_failure() -> DatabaseError {
    QuerySnafu.into_error(surrealdb::error::Db::Thrown("store offline".to_owned()).into())
}

pub(crate) fn service_failure() -> ServiceError {
    StoreSnafu.into_error(store_failure())
}

/// Holds the next `list` call, after the store answered, until released.
#[derive(Debug, Clone, Default)]
pub(crate) struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    /// Waits until the gated call has started.
    pub(crate) async fn entered(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn release(&self) {
        self.release.notify_one();
    }
}

/// A [Database] that can be told to fail, counts the calls that reach it and can hold a `list`
/// call mid-flight.
#[derive(Debug, Clone)]
pub(crate) struct FlakyStore {
    inner: Database,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    lists: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    gate: Arc<Mutex<Option<Gate>>>,
}

impl FlakyStore {
    pub(crate) fn new(inner: Database) -> Self {
        Self {
            inner,
            failing: Arc::default(),
            calls: Arc::default(),
            lists: Arc::default(),
            writes: Arc::default(),
            gate: Arc::default(),
        }
    }

    /// The wrapped store, for setting up fixtures without going through the counters.
    pub(crate) fn inner(&self) -> &Database {
        &self.inner
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every call, failed or not.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Writes that reached the store.
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn gate_next_list(&self) -> Gate {
        let gate = Gate::default();
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(store_failure());
        }
        Ok(())
    }

    fn enter_write(&self) -> Result<()> {
        self.enter()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl DocumentStore for FlakyStore {
    async fn list<T: Table>(&self, query: ListQuery) -> Result<Page<T>> {
        self.enter()?;
        self.lists.fetch_add(1, Ordering::SeqCst);

        let page = self.inner.list(query).await;

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        page
    }

    async fn get<T: Table>(&self, id: &Record<T>) -> Result<T> {
        self.enter()?;
        self.inner.get(id).await
    }

    async fn create<T: Table>(&self, record: &T) -> Result<T> {
        self.enter_write()?;
        self.inner.create(record).await
    }

    async fn update<T: Table>(&self, id: &Record<T>, patch: serde_json::Value) -> Result<T> {
        self.enter_write()?;
        self.inner.update(id, patch).await
    }

    async fn delete<T: Table>(&self, id: &Record<T>) -> Result<()> {
        self.enter_write()?;
        self.inner.delete(id).await
    }

    async fn increment<T: Table>(&self, id: &Record<T>, field: &str, by: u32) -> Result<T> {
        self.enter_write()?;
        self.inner.increment(id, field, by).await
    }
}
