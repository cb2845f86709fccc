use crate::error::StoreError;
use crate::model::{DailySetup, GameState, NewDailySetup, NewWordPair, WordPair};
use chrono::NaiveDate;
use futures_util::future::BoxFuture;

pub mod entity;
pub mod memory;
pub mod seed;
pub mod sql;

pub use memory::MemoryStore;
pub use sql::SqlStore;

pub type StoreResult<T> = Result<Rows<T>, StoreError>;

/// 所有持久化操作统一返回的结果结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rows<T> {
    pub data: Vec<T>,
}

impl<T> Rows<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn first(self) -> Option<T> {
        self.data.into_iter().next()
    }

    /// 插入操作应当回传刚写入的行
    pub fn inserted(self) -> Result<T, StoreError> {
        self.first().ok_or(StoreError::NoRows)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 持久化协作方
///
/// 只需要「全表查询 / 等值查询 / 插入」三种能力。
/// 主键冲突的插入必须返回 `StoreError::Duplicate`，缓存层依赖这一点处理并发写入。
pub trait Store: Send + Sync {
    fn word_pairs(&self) -> BoxFuture<'_, StoreResult<WordPair>>;

    fn word_pair(&self, id: i32) -> BoxFuture<'_, StoreResult<WordPair>>;

    fn insert_word_pair(&self, pair: NewWordPair) -> BoxFuture<'_, StoreResult<WordPair>>;

    fn daily_setup(&self, date: NaiveDate) -> BoxFuture<'_, StoreResult<DailySetup>>;

    fn insert_daily_setup(&self, setup: NewDailySetup) -> BoxFuture<'_, StoreResult<DailySetup>>;

    fn game_state<'a>(&'a self, state_hash: &'a str) -> BoxFuture<'a, StoreResult<GameState>>;

    fn insert_game_state(&self, state: GameState) -> BoxFuture<'_, StoreResult<GameState>>;
}
