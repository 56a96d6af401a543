pub mod memory;
pub mod notes;

use crate::domain::note::{ExpertNote, NewNote};
use anyhow::Context;
use uuid::Uuid;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Persistence for expert notes. Inputs arrive validated and normalized.
#[async_trait::async_trait]
pub trait NoteStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Notes for `symbol`, newest first. An empty `market` matches every market.
    async fn list(&self, symbol: &str, market: &str) -> anyhow::Result<Vec<ExpertNote>>;

    async fn create(&self, note: NewNote) -> anyhow::Result<ExpertNote>;

    /// Returns `false` when no note had that id.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}
