use crate::domain::note::{ExpertNote, NewNote};
use crate::storage::NoteStore;
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgNoteStore {
    pool: sqlx::PgPool,
}

impl PgNoteStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

type NoteRow = (Uuid, String, String, String, String, DateTime<Utc>);

fn into_note((id, symbol, market, person, opinion, timestamp): NoteRow) -> ExpertNote {
    ExpertNote {
        id,
        symbol,
        market,
        person,
        opinion,
        timestamp,
    }
}

#[async_trait::async_trait]
impl NoteStore for PgNoteStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn list(&self, symbol: &str, market: &str) -> anyhow::Result<Vec<ExpertNote>> {
        let result = if market.is_empty() {
            sqlx::query_as::<_, NoteRow>(
                "SELECT id, symbol, market, person, opinion, created_at \
                 FROM expert_notes \
                 WHERE symbol = $1 \
                 ORDER BY created_at DESC",
            )
            .bind(symbol)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, NoteRow>(
                "SELECT id, symbol, market, person, opinion, created_at \
                 FROM expert_notes \
                 WHERE symbol = $1 AND market = $2 \
                 ORDER BY created_at DESC",
            )
            .bind(symbol)
            .bind(market)
            .fetch_all(&self.pool)
            .await
        };
        let rows = result
            .with_context(|| format!("select expert_notes failed (symbol={symbol}, market={market})"))?;

        Ok(rows.into_iter().map(into_note).collect())
    }

    async fn create(&self, note: NewNote) -> anyhow::Result<ExpertNote> {
        let row = sqlx::query_as::<_, NoteRow>(
            "INSERT INTO expert_notes (id, symbol, market, person, opinion, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, symbol, market, person, opinion, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&note.symbol)
        .bind(&note.market)
        .bind(&note.person)
        .bind(&note.opinion)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("insert expert_notes failed")?;

        Ok(into_note(row))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM expert_notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("delete expert_notes failed (id={id})"))?;
        Ok(res.rows_affected() > 0)
    }
}
