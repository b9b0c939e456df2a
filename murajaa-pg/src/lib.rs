use chrono::{DateTime, Utc};
use murajaa_core::{
    store::RecordStore, CardId, CoreError, ItemId, Learner, LearnerId, ReviewCard, ReviewEvent,
};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|_| CoreError::Storage("pg connect"))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        // Mirrors migrations (id generation done in app; DB defaults still helpful)
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS learners (
          id          uuid PRIMARY KEY,
          name        text NOT NULL UNIQUE,
          created_at  timestamptz NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
          id                uuid PRIMARY KEY,
          learner_id        uuid NOT NULL REFERENCES learners(id) ON DELETE CASCADE,
          item_id           uuid NOT NULL,
          front             text NOT NULL,
          back              text NOT NULL,
          transliteration   text,
          tags              text[] NOT NULL DEFAULT '{}',
          reps              integer NOT NULL DEFAULT 0,
          interval_days     integer NOT NULL DEFAULT 0,
          ef                real    NOT NULL DEFAULT 2.5,
          due_at            timestamptz NOT NULL,
          last_quality      smallint,
          last_reviewed_at  timestamptz,
          suspended         boolean NOT NULL DEFAULT false,
          created_at        timestamptz NOT NULL,
          UNIQUE (learner_id, item_id)
        );

        CREATE TABLE IF NOT EXISTS events (
          id               uuid PRIMARY KEY,
          card_id          uuid NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
          quality          smallint NOT NULL,
          reviewed_at      timestamptz NOT NULL,
          interval_applied integer NOT NULL,
          ef_after         real NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cards_learner_due ON cards (learner_id, due_at);
        CREATE INDEX IF NOT EXISTS idx_events_card_time ON events (card_id, reviewed_at);
        "#;

        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("pg schema"))?;
        }
        Ok(())
    }
}

const CARD_COLS: &str = "id,learner_id,item_id,front,back,transliteration,tags,reps,interval_days,ef,due_at,last_quality,last_reviewed_at,suspended,created_at";

#[async_trait::async_trait]
impl RecordStore for PostgresStore {
    // ===== Learners =====
    async fn create_learner(&self, name: &str) -> Result<Learner, CoreError> {
        // unique name pre-check
        let exists = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM learners WHERE lower(name)=lower($1) LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg read learner"))?
        .is_some();
        if exists {
            return Err(CoreError::Conflict("learner name already exists"));
        }

        let learner = Learner::new(name);
        sqlx::query("INSERT INTO learners (id,name,created_at) VALUES ($1,$2,$3)")
            .bind(learner.id)
            .bind(&learner.name)
            .bind(learner.created_at)
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg insert learner"))?;
        Ok(learner)
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Learner, CoreError> {
        let row = sqlx::query("SELECT id,name,created_at FROM learners WHERE id=$1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg read learner"))?;
        let row = row.ok_or(CoreError::NotFound("learner"))?;
        Ok(Learner {
            id: row.get::<uuid::Uuid, _>("id"),
            name: row.get::<String, _>("name"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        })
    }

    async fn list_learners(&self) -> Result<Vec<Learner>, CoreError> {
        let rows = sqlx::query("SELECT id,name,created_at FROM learners ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg list learners"))?;
        Ok(rows
            .into_iter()
            .map(|row| Learner {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn delete_learner(&self, id: LearnerId) -> Result<(), CoreError> {
        let res = sqlx::query("DELETE FROM learners WHERE id=$1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg del learner"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("learner"));
        }
        Ok(())
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
        // ensure learner exists
        let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM learners WHERE id=$1 LIMIT 1")
            .bind(learner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg read learner"))?
            .is_some();
        if !exists {
            return Err(CoreError::NotFound("learner"));
        }

        let taken = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM cards WHERE learner_id=$1 AND item_id=$2 LIMIT 1",
        )
        .bind(learner_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg read card"))?
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
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
            "#,
        )
        .bind(card.id)
        .bind(card.learner_id)
        .bind(card.item_id)
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.transliteration.clone())
        .bind(&card.tags) // text[]
        .bind(card.reps as i64)
        .bind(card.interval_days as i64)
        .bind(card.ef as f64)
        .bind(card.due_at)
        .bind(card.last_quality.map(|q| q as i16))
        .bind(card.last_reviewed_at)
        .bind(card.suspended)
        .bind(card.created_at)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg insert card"))?;

        Ok(card)
    }

    async fn get_card(&self, id: CardId) -> Result<ReviewCard, CoreError> {
        let row = sqlx::query(&format!("SELECT {CARD_COLS} FROM cards WHERE id=$1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg read card"))?;
        let row = row.ok_or(CoreError::NotFound("card"))?;
        row_into_card(row)
    }

    async fn find_card(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<ReviewCard, CoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLS} FROM cards WHERE learner_id=$1 AND item_id=$2"
        ))
        .bind(learner_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg read card"))?;
        let row = row.ok_or(CoreError::NotFound("card"))?;
        row_into_card(row)
    }

    async fn list_cards(&self, learner_id: Option<LearnerId>) -> Result<Vec<ReviewCard>, CoreError> {
        let rows = if let Some(lid) = learner_id {
            sqlx::query(&format!(
                "SELECT {CARD_COLS} FROM cards WHERE learner_id=$1 ORDER BY created_at ASC"
            ))
            .bind(lid)
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg list cards"))?
        } else {
            sqlx::query(&format!("SELECT {CARD_COLS} FROM cards ORDER BY created_at ASC"))
                .fetch_all(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("pg list cards"))?
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
               WHERE learner_id=$1 AND suspended=false AND due_at<=$2
               ORDER BY due_at ASC, created_at ASC"#
        ))
        .bind(learner_id)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg due cards"))?;
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
              learner_id=$1, item_id=$2, front=$3, back=$4, transliteration=$5, tags=$6,
              reps=$7, interval_days=$8, ef=$9, due_at=$10, last_quality=$11,
              last_reviewed_at=$12, suspended=$13
            WHERE id=$14
            "#,
        )
        .bind(card.learner_id)
        .bind(card.item_id)
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.transliteration.clone())
        .bind(&card.tags)
        .bind(card.reps as i64)
        .bind(card.interval_days as i64)
        .bind(card.ef as f64)
        .bind(card.due_at)
        .bind(card.last_quality.map(|q| q as i16))
        .bind(card.last_reviewed_at)
        .bind(card.suspended)
        .bind(card.id)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg update card"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(card.clone())
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        let res = sqlx::query("DELETE FROM cards WHERE id=$1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg del card"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(())
    }

    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError> {
        let res = sqlx::query("UPDATE cards SET suspended=$1 WHERE id=$2")
            .bind(suspended)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg suspend"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(())
    }

    // ===== Review events =====
    async fn insert_event(&self, event: &ReviewEvent) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO events (id,card_id,quality,reviewed_at,interval_applied,ef_after)
               VALUES ($1,$2,$3,$4,$5,$6)"#,
        )
        .bind(event.id)
        .bind(event.card_id)
        .bind(event.quality as i16)
        .bind(event.reviewed_at)
        .bind(event.interval_applied as i64)
        .bind(event.ef_after as f64)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg insert event"))?;
        Ok(())
    }

    async fn list_events_for_card(&self, card_id: CardId) -> Result<Vec<ReviewEvent>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,card_id,quality,reviewed_at,interval_applied,ef_after
               FROM events WHERE card_id=$1 ORDER BY reviewed_at ASC"#,
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg list events"))?;
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
                   WHERE c.learner_id=$1 ORDER BY e.reviewed_at ASC"#,
            )
            .bind(lid)
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg list events"))?
        } else {
            sqlx::query(
                r#"SELECT id,card_id,quality,reviewed_at,interval_applied,ef_after
                   FROM events ORDER BY reviewed_at ASC"#,
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg list events"))?
        };
        rows.into_iter().map(row_into_event).collect()
    }
}

// ===== helpers =====
fn row_into_card(row: sqlx::postgres::PgRow) -> Result<ReviewCard, CoreError> {
    Ok(ReviewCard {
        id: row.get::<uuid::Uuid, _>("id"),
        learner_id: row.get::<uuid::Uuid, _>("learner_id"),
        item_id: row.get::<uuid::Uuid, _>("item_id"),
        front: row.get::<String, _>("front"),
        back: row.get::<String, _>("back"),
        transliteration: row.get::<Option<String>, _>("transliteration"),
        tags: row.get::<Vec<String>, _>("tags"),
        reps: row.get::<i32, _>("reps") as u32,
        interval_days: row.get::<i32, _>("interval_days") as u32,
        ef: row.get::<f32, _>("ef"),
        due_at: row.get::<DateTime<Utc>, _>("due_at"),
        last_quality: row.get::<Option<i16>, _>("last_quality").map(|q| q as u8),
        last_reviewed_at: row.get::<Option<DateTime<Utc>>, _>("last_reviewed_at"),
        suspended: row.get::<bool, _>("suspended"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

fn row_into_event(row: sqlx::postgres::PgRow) -> Result<ReviewEvent, CoreError> {
    Ok(ReviewEvent {
        id: row.get::<uuid::Uuid, _>("id"),
        card_id: row.get::<uuid::Uuid, _>("card_id"),
        quality: row.get::<i16, _>("quality") as u8,
        reviewed_at: row.get::<DateTime<Utc>, _>("reviewed_at"),
        interval_applied: row.get::<i32, _>("interval_applied"),
        ef_after: row.get::<f32, _>("ef_after"),
    })
}
