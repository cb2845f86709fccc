use crate::error::StoreError;
use crate::model::GameState;
use crate::store::Store;
use crate::{debug, info};
use std::future::Future;
use std::sync::Arc;

/// 查询结果：命中缓存，或本次新生成并写入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(GameState),
    Stored(GameState),
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_state(self) -> GameState {
        match self {
            CacheLookup::Hit(s) | CacheLookup::Stored(s) => s,
        }
    }
}

/// 以状态哈希为键的对话缓存
///
/// 只插入不更新：同一个哈希一旦写入，其对话内容即固定。
#[derive(Clone)]
pub struct DialogueCache {
    store: Arc<dyn Store>,
}

impl DialogueCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 纯读取，不触发生成
    pub async fn get(&self, state_hash: &str) -> Result<Option<GameState>, StoreError> {
        Ok(self.store.game_state(state_hash).await?.first())
    }

    /// 以 `state.state_hash` 为键写入
    ///
    /// 键已存在时不报错，返回库中已有的那一行，调用方应以它为准。
    pub async fn put(&self, state: GameState) -> Result<GameState, StoreError> {
        let state_hash = state.state_hash.clone();
        match self.store.insert_game_state(state).await {
            Ok(rows) => rows.inserted(),
            Err(StoreError::Duplicate) => {
                debug!(target: "Cache", "并发写入冲突，沿用已有状态 {}", state_hash);
                self.get(&state_hash).await?.ok_or(StoreError::NoRows)
            }
            Err(e) => Err(e),
        }
    }

    /// 命中则直接返回，未命中才调用 `make` 生成并写入
    pub async fn get_or_insert_with<F, Fut>(
        &self,
        state_hash: &str,
        make: F,
    ) -> Result<CacheLookup, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GameState>,
    {
        if let Some(state) = self.get(state_hash).await? {
            debug!(target: "Cache", "命中 {}", state_hash);
            return Ok(CacheLookup::Hit(state));
        }

        info!(target: "Cache", "未命中 {}，开始生成", state_hash);
        let fresh = make().await;
        let stored = self.put(fresh.clone()).await?;

        // 写入落败时库里是别人的版本
        if stored == fresh {
            Ok(CacheLookup::Stored(stored))
        } else {
            Ok(CacheLookup::Hit(stored))
        }
    }
}
