use std::time::Duration;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite, Transaction,
};

use crate::{
    build::{Build, NewBuild},
    release::{NewRelease, Release},
    Result,
};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS releases (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    pending_signing_tag TEXT NOT NULL,
    pending_testing_tag TEXT NOT NULL,
    testing_tag TEXT NOT NULL,
    stable_tag TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS builds (
    id INTEGER PRIMARY KEY,
    nvr TEXT NOT NULL UNIQUE,
    release_id INTEGER REFERENCES releases(id),
    signed INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_builds_release ON builds(release_id);
"#;

const SELECT_BUILD: &str = "SELECT id, nvr, release_id, signed FROM builds WHERE nvr = ?";

const SELECT_RELEASE: &str = r#"
SELECT id, name, pending_signing_tag, pending_testing_tag, testing_tag, stable_tag
FROM releases WHERE id = ?
"#;

/// How long a writer waits for another writer's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

type BuildRow = (i64, String, Option<i64>, bool);
type ReleaseRow = (i64, String, String, String, String, String);

/// Handle to the builds database. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let options: SqliteConnectOptions = url.parse()?;
        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        Self::connect(options, max_connections).await
    }

    pub async fn open_memory() -> Result<Self> {
        let options: SqliteConnectOptions = "sqlite::memory:".parse()?;
        Self::connect(options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Start a unit of work. Dropping the session without committing rolls it back.
    ///
    /// The write lock is taken up front, so concurrent sessions touching the
    /// same build queue behind each other instead of failing on lock upgrade.
    pub async fn begin(&self) -> Result<Session> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Session { tx })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // Seeding and inspection

    pub async fn insert_release(&self, release: &NewRelease) -> Result<Release> {
        let result = sqlx::query(
            r#"
            INSERT INTO releases (name, pending_signing_tag, pending_testing_tag, testing_tag, stable_tag)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&release.name)
        .bind(&release.pending_signing_tag)
        .bind(&release.pending_testing_tag)
        .bind(&release.testing_tag)
        .bind(&release.stable_tag)
        .execute(&self.pool)
        .await?;

        Ok(Release {
            id: result.last_insert_rowid(),
            name: release.name.clone(),
            pending_signing_tag: release.pending_signing_tag.clone(),
            pending_testing_tag: release.pending_testing_tag.clone(),
            testing_tag: release.testing_tag.clone(),
            stable_tag: release.stable_tag.clone(),
        })
    }

    pub async fn insert_build(&self, build: &NewBuild) -> Result<Build> {
        let result = sqlx::query("INSERT INTO builds (nvr, release_id, signed) VALUES (?, ?, ?)")
            .bind(&build.nvr)
            .bind(build.release_id)
            .bind(build.signed)
            .execute(&self.pool)
            .await?;

        Ok(Build {
            id: result.last_insert_rowid(),
            nvr: build.nvr.clone(),
            release_id: build.release_id,
            signed: build.signed,
        })
    }

    pub async fn get_build(&self, nvr: &str) -> Result<Option<Build>> {
        let row: Option<BuildRow> = sqlx::query_as(SELECT_BUILD)
            .bind(nvr)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(parse_build_row))
    }
}

/// One transaction against the builds database.
pub struct Session {
    tx: Transaction<'static, Sqlite>,
}

impl Session {
    pub async fn get_build(&mut self, nvr: &str) -> Result<Option<Build>> {
        let row: Option<BuildRow> = sqlx::query_as(SELECT_BUILD)
            .bind(nvr)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(parse_build_row))
    }

    pub async fn get_release(&mut self, id: i64) -> Result<Option<Release>> {
        let row: Option<ReleaseRow> = sqlx::query_as(SELECT_RELEASE)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(parse_release_row))
    }

    /// Release of a build, or `None` when the build is not assigned to one.
    pub async fn release_for(&mut self, build: &Build) -> Result<Option<Release>> {
        match build.release_id {
            Some(id) => self.get_release(id).await,
            None => Ok(None),
        }
    }

    /// Set the signed flag. Never clears it.
    pub async fn mark_signed(&mut self, build: &mut Build) -> Result<()> {
        sqlx::query("UPDATE builds SET signed = 1 WHERE id = ?")
            .bind(build.id)
            .execute(&mut *self.tx)
            .await?;

        build.signed = true;
        Ok(())
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn parse_build_row(row: BuildRow) -> Build {
    let (id, nvr, release_id, signed) = row;
    Build {
        id,
        nvr,
        release_id,
        signed,
    }
}

fn parse_release_row(row: ReleaseRow) -> Release {
    let (id, name, pending_signing_tag, pending_testing_tag, testing_tag, stable_tag) = row;
    Release {
        id,
        name,
        pending_signing_tag,
        pending_testing_tag,
        testing_tag,
        stable_tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_and_release_lookup() {
        let storage = Storage::open_memory().await.unwrap();

        let release = storage
            .insert_release(&NewRelease::from_dist_tag("F26", "f26"))
            .await
            .unwrap();
        storage
            .insert_build(&NewBuild::unsigned("colord-1.3.4-1.fc26", Some(release.id)))
            .await
            .unwrap();

        let mut session = storage.begin().await.unwrap();
        let build = session.get_build("colord-1.3.4-1.fc26").await.unwrap().unwrap();
        assert!(!build.signed);

        let found = session.release_for(&build).await.unwrap().unwrap();
        assert_eq!(found, release);

        assert!(session.get_build("colord-1.3.4-2.fc26").await.unwrap().is_none());
        session.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_release_for_unassigned_build() {
        let storage = Storage::open_memory().await.unwrap();
        storage
            .insert_build(&NewBuild::unsigned("colord-1.3.4-1.fc26", None))
            .await
            .unwrap();

        let mut session = storage.begin().await.unwrap();
        let build = session.get_build("colord-1.3.4-1.fc26").await.unwrap().unwrap();
        assert!(session.release_for(&build).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_signed_commits() {
        let storage = Storage::open_memory().await.unwrap();
        storage
            .insert_build(&NewBuild::unsigned("colord-1.3.4-1.fc26", None))
            .await
            .unwrap();

        let mut session = storage.begin().await.unwrap();
        let mut build = session.get_build("colord-1.3.4-1.fc26").await.unwrap().unwrap();
        session.mark_signed(&mut build).await.unwrap();
        assert!(build.signed);
        session.commit().await.unwrap();

        let stored = storage.get_build("colord-1.3.4-1.fc26").await.unwrap().unwrap();
        assert!(stored.signed);
    }

    #[tokio::test]
    async fn test_dropped_session_rolls_back() {
        let storage = Storage::open_memory().await.unwrap();
        storage
            .insert_build(&NewBuild::unsigned("colord-1.3.4-1.fc26", None))
            .await
            .unwrap();

        {
            let mut session = storage.begin().await.unwrap();
            let mut build = session.get_build("colord-1.3.4-1.fc26").await.unwrap().unwrap();
            session.mark_signed(&mut build).await.unwrap();
        }

        let stored = storage.get_build("colord-1.3.4-1.fc26").await.unwrap().unwrap();
        assert!(!stored.signed);
    }

    #[tokio::test]
    async fn test_duplicate_nvr_rejected() {
        let storage = Storage::open_memory().await.unwrap();
        let build = NewBuild::unsigned("colord-1.3.4-1.fc26", None);

        storage.insert_build(&build).await.unwrap();
        assert!(storage.insert_build(&build).await.is_err());
    }
}
