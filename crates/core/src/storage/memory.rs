use crate::domain::note::{ExpertNote, NewNote};
use crate::storage::NoteStore;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store, used when no database is configured. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: RwLock<Vec<ExpertNote>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl NoteStore for MemoryNoteStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, symbol: &str, market: &str) -> anyhow::Result<Vec<ExpertNote>> {
        let notes = self.notes.read().await;
        let mut out: Vec<ExpertNote> = notes
            .iter()
            .filter(|n| n.symbol == symbol && (market.is_empty() || n.market == market))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps; newest first.
        out.reverse();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    async fn create(&self, note: NewNote) -> anyhow::Result<ExpertNote> {
        let created = ExpertNote {
            id: Uuid::new_v4(),
            symbol: note.symbol,
            market: note.market,
            person: note.person,
            opinion: note.opinion,
            timestamp: Utc::now(),
        };
        self.notes.write().await.push(created.clone());
        Ok(created)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut notes = self.notes.write().await;
        let before = notes.len();
        notes.retain(|n| n.id != id);
        Ok(notes.len() != before)
    }
}
