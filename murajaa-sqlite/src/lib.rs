use chrono::{DateTime, Utc};
use murajaa_core::{
    store::RecordStore, CardId, CoreError, ItemId, Learner, LearnerId, ReviewCard, ReviewEvent,
};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::path::Path;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn open_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect("sqlite::memory:")
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        // Create tables/indexes if they do not exist (mirrors migrations).
        const STMT: &str = r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS learners (
          id          TEXT PRIMARY KEY,
          name        TEXT NOT NULL UNIQUE,
          created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
          id                TEXT PRIMARY KEY,
          learner_id        TEXT NOT NULL,
          item_id           TEXT NOT NULL,
          front             TEXT NOT NULL,
          back              TEXT NOT NULL,
          transliteration   TEXT,
          tags              TEXT NOT NULL,
          reps              INTEGER NOT NULL DEFAULT 0,
          interval_days     INTEGER NOT NULL DEFAULT 0,
          ef                REAL    NOT NULL DEFAULT 2.5,
          due_at            TEXT    NOT NULL,
          last_quality      INTEGER,
          last_reviewed_at  TEXT,
          suspended         INTEGER NOT NULL DEFAULT 0,
          created_at        TEXT NOT NULL,
          UNIQUE(learner_id, item_id),
          FOREIGN KEY(learner_id) REFERENCES learners(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS events (
          id               TEXT PRIMARY KEY,
          card_id          TEXT NOT NULL,
          quality          INTEGER NOT NULL,
          reviewed_at      TEXT NOT NULL,
          interval_applied INTEGER NOT NULL,
          ef_after         REAL NOT NULL,
          FOREIGN KEY(card_id) REFERENCES cards(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_cards_learner_due ON cards (learner_id, due_at);
        CREATE INDEX IF NOT EXISTS idx_events_card_time ON events (card_id, reviewed_at);
        "#;

        // Execute statements one by one for compatibility.
        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("sqlite schema"))?;
        }
        Ok(())
    }
}

const CARD_COLS: &str = "id,learner_id,item_id,front,back,transliteration,tags,reps,interval_days,ef,due_at,last_quality,last_reviewed_at,suspended,created_at";

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    // ===== Learners =====
    async fn create_learner(&self, name: &str) -> Result<Learner, CoreError> {
        // Pre-check for unique name
        let exists: Option<i64> =
            sqlx::query("SELECT 1 FROM learners WHERE lower(name)=lower(?) LIMIT 1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("read learner"))?
                .map(|_| 1);
        if exists.is_some() {
            return Err(CoreError::Conflict("learner name already exists"));
        }

        let learner = Learner::new(name);
        sqlx::query("INSERT INTO learners (id,name,created_at) VALUES (?,?,?)")
            .bind(learner.id.to_string())
            .bind(&learner.name)
            .bind(dt_to_str(learner.created_at))
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("insert learner"))?;
        Ok(learner)
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Learner, CoreError> {
        let row = sqlx::query("SELECT id,name,created_at FROM learners WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read learner"))?;
        let row = row.ok_or(CoreError::NotFound("learner"))?;
        Ok(Learner {
            id: uuid_from_str(row.get::<String, _>("id"))?,
            name: row.get::<String, _>("name"),
            created_at: dt_from_str(row.get::<String, _>("created_at"))?,
        })
    }

    async fn list_learners(&self) -> Result<Vec<Learner>, CoreError> {
        let rows = sqlx::query("SELECT id,name,created_at FROM learners ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list learners"))?;
        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(Learner {
                id: uuid_from_str(row.get::<String, _>("id"))?,
                name: row.get::<String, _>("name"),
                created_at: dt_from_str(row.get::<String, _>("created_at"))?,
            });
        }
        Ok(v)
    }

    async fn delete_learner(&self, id: LearnerId) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|_| CoreError::Storage("tx"))?;

        // Manual cascade (robust even if PRAGMA foreign_keys is off)
        sqlx::query("DELETE FROM events WHERE card_id IN (SELECT id FROM cards WHERE learner_id=?)")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("del events"))?;

        sqlx::query("DELETE FROM cards WHERE learner_id=?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("del cards"))?;

        let res = sqlx::query("DELETE FROM learners WHERE id=?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("del learner"))?;
        if res.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(CoreError::NotFound("learner"));
        }

        tx.commit()
            .await
            .map_err(|_| CoreError::Storage("tx commit"))
    }

    // ===== Cards =====
    async fn add_card(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
        front: &str,
        back: &str,
        transliteration: Option<&str>,
        tags: &[String],
    ) -> Result<ReviewCard, CoreError> {
        // Ensure learner exists
        let exists = sqlx::query("SELECT 1 FROM learners WHERE id=? LIMIT 1")
            .bind(learner_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read learner"))?
            .is_some();
        if !exists {
            return Err(CoreError::NotFound("learner"));
        }

        let taken = sqlx::query("SELECT 1 FROM cards WHERE learner_id=? AND item_id=? LIMIT 1")
            .bind(learner_id.to_string())
            .bind(item_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read card"))?
            .is_some();
        if taken {
            return Err(CoreError::Conflict("card exists for learner and item"));
        }

        let mut card = ReviewCard::new(learner_id, item_id, front, back);
        card.transliteration = transliteration.map(|s| s.to_string());
        card.tags = tags.to_vec();

        sqlx::query(
            r#"
            INSERT INTO cards (
              id, learner_id, item_id, front, back, transliteration, tags, reps, interval_days,
              ef, due_at, last_quality, last_reviewed_at, suspended, created_at
            )
            VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
            "#,
        )
        .bind(card.id.to_string())
        .bind(card.learner_id.to_string())
        .bind(card.item_id.to_string())
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.transliteration.clone())
        .bind(serde_json::to_string(&card.tags).unwrap())
        .bind(card.reps as i64)
        .bind(card.interval_days as i64)
        .bind(card.ef as f64)
        .bind(dt_to_str(card.due_at))
        .bind(card.last_quality.map(|q| q as i64))
        .bind(card.last_reviewed_at.map(dt_to_str))
        .bind(bool_to_i(card.suspended))
        .bind(dt_to_str(card.created_at))
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("insert card"))?;

        Ok(card)
    }

    async fn get_card(&self, id: CardId) -> Result<ReviewCard, CoreError> {
        let row = sqlx::query(&format!("SELECT {CARD_COLS} FROM cards WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read card"))?;
        let row = row.ok_or(CoreError::NotFound("card"))?;
        row_into_card(row)
    }

    async fn find_card(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<ReviewCard, CoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLS} FROM cards WHERE learner_id=? AND item_id=?"
        ))
        .bind(learner_id.to_string())
        .bind(item_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("read card"))?;
        let row = row.ok_or(CoreError::NotFound("card"))?;
        row_into_card(row)
    }

    async fn list_cards(&self, learner_id: Option<LearnerId>) -> Result<Vec<ReviewCard>, CoreError> {
        let rows = if let Some(lid) = learner_id {
            sqlx::query(&format!(
                "SELECT {CARD_COLS} FROM cards WHERE learner_id=? ORDER BY created_at ASC"
            ))
            .bind(lid.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list cards"))?
        } else {
            sqlx::query(&format!("SELECT {CARD_COLS} FROM cards ORDER BY created_at ASC"))
                .fetch_all(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("list cards"))?
        };
        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(row_into_card(row)?);
        }
        Ok(v)
    }

    async fn due_cards(
        &self,
        learner_id: LearnerId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ReviewCard>, CoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {CARD_COLS} FROM cards
               WHERE learner_id=? AND suspended=0 AND due_at<=?
               ORDER BY due_at ASC, created_at ASC"#
        ))
        .bind(learner_id.to_string())
        .bind(dt_to_str(as_of))
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("due cards"))?;
        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(row_into_card(row)?);
        }
        Ok(v)
    }

    async fn save_card(&self, card: &ReviewCard) -> Result<ReviewCard, CoreError> {
        let res = sqlx::query(
            r#"
            UPDATE cards SET
              learner_id=?, item_id=?, front=?, back=?, transliteration=?, tags=?, reps=?,
              interval_days=?, ef=?, due_at=?, last_quality=?, last_reviewed_at=?, suspended=?
            WHERE id=?
            "#,
        )
        .bind(card.learner_id.to_string())
        .bind(card.item_id.to_string())
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.transliteration.clone())
        .bind(serde_json::to_string(&card.tags).unwrap())
        .bind(card.reps as i64)
        .bind(card.interval_days as i64)
        .bind(card.ef as f64)
        .bind(dt_to_str(card.due_at))
        .bind(card.last_quality.map(|q| q as i64))
        .bind(card.last_reviewed_at.map(dt_to_str))
        .bind(bool_to_i(card.suspended))
        .bind(card.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("update card"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(card.clone())
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|_| CoreError::Storage("tx"))?;
        sqlx::query("DELETE FROM events WHERE card_id=?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("del events"))?;
        let res = sqlx::query("DELETE FROM cards WHERE id=?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("del card"))?;
        if res.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(CoreError::NotFound("card"));
        }
        tx.commit()
            .await
            .map_err(|_| CoreError::Storage("tx commit"))
    }

    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError> {
        let res = sqlx::query("UPDATE cards SET suspended=? WHERE id=?")
            .bind(bool_to_i(suspended))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("suspend"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(())
    }

    // ===== Review events =====
    async fn insert_event(&self, event: &ReviewEvent) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO events (id,card_id,quality,reviewed_at,interval_applied,ef_after)
               VALUES (?,?,?,?,?,?)"#,
        )
        .bind(event.id.to_string())
        .bind(event.card_id.to_string())
        .bind(event.quality as i64)
        .bind(dt_to_str(event.reviewed_at))
        .bind(event.interval_applied as i64)
        .bind(event.ef_after as f64)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("insert event"))?;
        Ok(())
    }

    async fn list_events_for_card(&self, card_id: CardId) -> Result<Vec<ReviewEvent>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,card_id,quality,reviewed_at,interval_applied,ef_after
               FROM events WHERE card_id=? ORDER BY reviewed_at ASC"#,
        )
        .bind(card_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("list events"))?;
        rows.into_iter().map(row_into_event).collect()
    }

    async fn list_events(
        &self,
        learner_id: Option<LearnerId>,
    ) -> Result<Vec<ReviewEvent>, CoreError> {
        let rows = if let Some(lid) = learner_id {
            sqlx::query(
                r#"SELECT e.id,e.card_id,e.quality,e.reviewed_at,e.interval_applied,e.ef_after
                   FROM events e JOIN cards c ON c.id = e.card_id
                   WHERE c.learner_id=? ORDER BY e.reviewed_at ASC"#,
            )
            .bind(lid.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list events"))?
        } else {
            sqlx::query(
                r#"SELECT id,card_id,quality,reviewed_at,interval_applied,ef_after
                   FROM events ORDER BY reviewed_at ASC"#,
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list events"))?
        };
        rows.into_iter().map(row_into_event).collect()
    }
}

// ===== Helpers =====
fn uuid_from_str(s: String) -> Result<uuid::Uuid, CoreError> {
    uuid::Uuid::parse_str(&s).map_err(|_| CoreError::Invalid("uuid"))
}

fn dt_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn dt_from_str(s: String) -> Result<DateTime<Utc>, CoreError> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map_err(|_| CoreError::Invalid("datetime"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn bool_to_i(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

fn row_into_card(row: sqlx::sqlite::SqliteRow) -> Result<ReviewCard, CoreError> {
    let tags_json: String = row.get("tags");
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

    Ok(ReviewCard {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        learner_id: uuid_from_str(row.get::<String, _>("learner_id"))?,
        item_id: uuid_from_str(row.get::<String, _>("item_id"))?,
        front: row.get::<String, _>("front"),
        back: row.get::<String, _>("back"),
        transliteration: row.get::<Option<String>, _>("transliteration"),
        tags,
        reps: row.get::<i64, _>("reps") as u32,
        interval_days: row.get::<i64, _>("interval_days") as u32,
        ef: row.get::<f64, _>("ef") as f32,
        due_at: dt_from_str(row.get::<String, _>("due_at"))?,
        last_quality: row.get::<Option<i64>, _>("last_quality").map(|q| q as u8),
        last_reviewed_at: row
            .get::<Option<String>, _>("last_reviewed_at")
            .map(dt_from_str)
            .transpose()?,
        suspended: row.get::<i64, _>("suspended") != 0,
        created_at: dt_from_str(row.get::<String, _>("created_at"))?,
    })
}

fn row_into_event(row: sqlx::sqlite::SqliteRow) -> Result<ReviewEvent, CoreError> {
    Ok(ReviewEvent {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        card_id: uuid_from_str(row.get::<String, _>("card_id"))?,
        quality: row.get::<i64, _>("quality") as u8,
        reviewed_at: dt_from_str(row.get::<String, _>("reviewed_at"))?,
        interval_applied: row.get::<i64, _>("interval_applied") as i32,
        ef_after: row.get::<f64, _>("ef_after") as f32,
    })
}
