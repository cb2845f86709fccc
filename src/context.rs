use crate::cache::DialogueCache;
use crate::config::AppConfig;
use crate::generator::{OpenAiGenerator, ResponseGenerator};
use crate::store::{MemoryStore, SqlStore, Store};
use crate::store::seed::seed_word_pairs;
use chrono::{Local, NaiveDate};
use std::sync::Arc;

/// 一次进程生命周期内共享的依赖：配置、存储、生成器与缓存
///
/// 启动时显式构造，再以引用传入引擎的各个操作。
#[derive(Clone)]
pub struct GameContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub cache: DialogueCache,
}

impl GameContext {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            cache: DialogueCache::new(store.clone()),
            store,
            generator,
        }
    }

    /// 按配置连接存储、写入内置词库并创建 OpenAI 生成器
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = if config.database_url == "memory" {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SqlStore::connect(&config.database_url).await?)
        };
        seed_word_pairs(store.as_ref()).await?;

        let generator = Arc::new(OpenAiGenerator::new(&config.generator, &config.participants));
        Ok(Self::new(config, store, generator))
    }

    pub fn participants(&self) -> Vec<String> {
        self.config.participant_names().map(str::to_string).collect()
    }

    /// 游戏按本地日历日切换
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
