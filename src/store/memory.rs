use super::{Rows, Store, StoreResult};
use crate::error::StoreError;
use crate::model::{DailySetup, GameState, NewDailySetup, NewWordPair, WordPair};
use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    word_pairs: Vec<WordPair>,
    daily_setup: Vec<DailySetup>,
    game_states: HashMap<String, GameState>,
    next_id: i32,
}

impl Tables {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// 进程内存储，用于测试与 `database_url = "memory"` 的试玩
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn game_state_count(&self) -> usize {
        self.tables.read().await.game_states.len()
    }
}

impl Store for MemoryStore {
    fn word_pairs(&self) -> BoxFuture<'_, StoreResult<WordPair>> {
        Box::pin(async move { Ok(Rows::new(self.tables.read().await.word_pairs.clone())) })
    }

    fn word_pair(&self, id: i32) -> BoxFuture<'_, StoreResult<WordPair>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(Rows::new(
                tables
                    .word_pairs
                    .iter()
                    .filter(|p| p.id == id)
                    .cloned()
                    .collect(),
            ))
        })
    }

    fn insert_word_pair(&self, pair: NewWordPair) -> BoxFuture<'_, StoreResult<WordPair>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let row = WordPair {
                id: tables.allocate_id(),
                category: pair.category,
                innocent_word: pair.innocent_word,
                mole_word: pair.mole_word,
                difficulty: pair.difficulty,
            };
            tables.word_pairs.push(row.clone());
            Ok(Rows::new(vec![row]))
        })
    }

    fn daily_setup(&self, date: NaiveDate) -> BoxFuture<'_, StoreResult<DailySetup>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(Rows::new(
                tables
                    .daily_setup
                    .iter()
                    .filter(|s| s.date == date)
                    .cloned()
                    .collect(),
            ))
        })
    }

    fn insert_daily_setup(&self, setup: NewDailySetup) -> BoxFuture<'_, StoreResult<DailySetup>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables.daily_setup.iter().any(|s| s.date == setup.date) {
                return Err(StoreError::Duplicate);
            }
            let row = DailySetup {
                id: tables.allocate_id(),
                date: setup.date,
                word_pair_id: setup.word_pair_id,
                mole_model: setup.mole_model,
                turn_order: setup.turn_order,
            };
            tables.daily_setup.push(row.clone());
            Ok(Rows::new(vec![row]))
        })
    }

    fn game_state<'a>(&'a self, state_hash: &'a str) -> BoxFuture<'a, StoreResult<GameState>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(Rows::new(
                tables.game_states.get(state_hash).cloned().into_iter().collect(),
            ))
        })
    }

    fn insert_game_state(&self, state: GameState) -> BoxFuture<'_, StoreResult<GameState>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if tables.game_states.contains_key(&state.state_hash) {
                return Err(StoreError::Duplicate);
            }
            tables
                .game_states
                .insert(state.state_hash.clone(), state.clone());
            Ok(Rows::new(vec![state]))
        })
    }
}
