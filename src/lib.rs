// lib.rs
//
// 每日内鬼游戏的回合与状态引擎
//
// 流程：每日初始化 → 回合状态机 → 状态哈希 → 对话缓存 → 并发生成发言

pub mod log;

pub mod cache;
pub mod config;
pub mod console;
pub mod context;
pub mod engine;
pub mod error;
pub mod generator;
pub mod hasher;
pub mod model;
pub mod scheduler;
pub mod store;

pub mod prelude {
    pub use crate::cache::{CacheLookup, DialogueCache};
    pub use crate::config::AppConfig;
    pub use crate::context::GameContext;
    pub use crate::engine::{
        DailyInfoResponse, PlayTurnRequest, PlayTurnResponse, SetupTriggerResponse, daily_info,
        play_turn, trigger_daily_setup,
    };
    pub use crate::error::{GameError, GameResult, SetupError, StoreError, ValidationError};
    pub use crate::generator::{GenerationRequest, Reply, ResponseGenerator};
    pub use crate::model::{Action, DailySetup, Dialogue, GameState, PublicDialogue, WordPair, Winner};
    pub use crate::store::{MemoryStore, SqlStore, Store};
}
