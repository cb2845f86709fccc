use crate::info;
use crate::model::DEFAULT_PARTICIPANTS;
use anyhow::Context as _;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// 覆盖 generator.api_key 的环境变量
pub const API_KEY_ENV: &str = "MOLE_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    // SeaORM 连接串；填 "memory" 则使用进程内存储
    #[serde(default = "default_database_url")]
    pub database_url: String,

    // 每日自动初始化时间 (本地时间 HH:MM:SS)
    #[serde(default = "default_setup_time")]
    pub daily_setup_time: String,

    // 某个角色生成失败时的占位发言
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    #[serde(default)]
    pub generator: GeneratorConfig,

    // 参赛角色及其模型 ID
    #[serde(default = "default_participants")]
    pub participants: Vec<ParticipantConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ParticipantConfig {
    pub name: String,
    pub model: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            daily_setup_time: default_setup_time(),
            fallback_message: default_fallback_message(),
            generator: GeneratorConfig::default(),
            participants: default_participants(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite:data/mole.db?mode=rwc".to_string()
}

fn default_setup_time() -> String {
    "00:00:00".to_string()
}

fn default_fallback_message() -> String {
    "Bu tur için yanıt üretilemedi.".to_string()
}

fn default_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    300
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_participants() -> Vec<ParticipantConfig> {
    let models = [
        "google/gemini-2.0-flash-001",
        "anthropic/claude-3.5-sonnet",
        "openai/gpt-4o-mini",
        "x-ai/grok-beta",
        "meta-llama/llama-3.3-70b-instruct",
        "deepseek/deepseek-chat",
    ];
    DEFAULT_PARTICIPANTS
        .iter()
        .zip(models)
        .map(|(name, model)| ParticipantConfig {
            name: name.to_string(),
            model: model.to_string(),
        })
        .collect()
}

impl AppConfig {
    /// 加载配置，文件不存在时写入默认配置
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut cfg = if path.exists() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("读取配置失败: {}", path.display()))?;
            toml::from_str::<AppConfig>(&content)
                .with_context(|| format!("解析配置失败: {}", path.display()))?
        } else {
            let cfg = AppConfig::default();
            cfg.save(path).await?;
            info!(target: "Config", "已生成默认配置: {}", path.display());
            cfg
        };

        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            cfg.generator.api_key = key;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// 原子写入（写临时文件后 rename 覆盖）
    pub async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.setup_time()?;
        if self.participants.len() < 3 {
            anyhow::bail!("至少需要 3 个参赛角色，当前 {}", self.participants.len());
        }
        // 名称会进入状态哈希原文
        for name in self.participant_names() {
            if name.trim().is_empty()
                || name.eq_ignore_ascii_case("none")
                || name.contains([',', '|'])
            {
                anyhow::bail!("参赛角色名称不可用: {:?}", name);
            }
        }
        let mut names: Vec<&str> = self.participant_names().collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.participants.len() {
            anyhow::bail!("参赛角色名称重复");
        }
        Ok(())
    }

    pub fn setup_time(&self) -> anyhow::Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.daily_setup_time, "%H:%M:%S")
            .with_context(|| format!("daily_setup_time 格式应为 HH:MM:SS: {}", self.daily_setup_time))
    }

    pub fn participant_names(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_six_participants() {
        let cfg = AppConfig::default();
        let names: Vec<&str> = cfg.participant_names().collect();
        assert_eq!(names, DEFAULT_PARTICIPANTS);
        assert_eq!(cfg.participants[1].model, "anthropic/claude-3.5-sonnet");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_is_filled_with_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            database_url = "memory"

            [generator]
            api_key = "sk-test"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.database_url, "memory");
        assert_eq!(cfg.generator.api_key, "sk-test");
        assert_eq!(cfg.generator.max_tokens, 300);
        assert_eq!(cfg.participants.len(), 6);
    }

    #[test]
    fn rejects_bad_setup_time_and_duplicate_names() {
        let mut cfg = AppConfig {
            daily_setup_time: "25:00".into(),
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg.daily_setup_time = "03:30:00".into();
        cfg.participants[1].name = "Gemini".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_names_that_clash_with_the_hash_layout() {
        for bad in ["none", "NONE", "", "  ", "Grok,Llama", "Claude|2"] {
            let mut cfg = AppConfig::default();
            cfg.participants[0].name = bad.into();
            assert!(cfg.validate().is_err(), "{:?} should be rejected", bad);
        }
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = std::env::temp_dir().join(format!("mole-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs::remove_file(&path).await;

        let cfg = AppConfig::load(&path).await.unwrap();
        assert!(path.exists());
        let reloaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(reloaded.participants, cfg.participants);

        let _ = fs::remove_dir_all(&dir).await;
    }
}
