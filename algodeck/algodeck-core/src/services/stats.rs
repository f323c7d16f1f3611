use crate::models::{Question, QuestionStats};
use crate::storage::SharedStore;

#[derive(Clone)]
pub struct StatsService {
    store: SharedStore,
}

impl StatsService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Totals over every question the owner has, computed from one
    /// consistent snapshot.
    pub async fn stats(&self, owner: &str) -> QuestionStats {
        let store = self.store.read().await;
        QuestionStats::tally(store.scan::<Question>(owner))
    }
}
