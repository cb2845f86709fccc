use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 默认参赛的六个 AI 角色
pub const DEFAULT_PARTICIPANTS: [&str; 6] =
    ["Gemini", "Claude", "ChatGPT", "Grok", "Llama", "DeepSeek"];

/// 产生某个状态的玩家动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Start,
    Pass,
    Eliminate,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Start => "START",
            Action::Pass => "PASS",
            Action::Eliminate => "ELIMINATE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "START" => Ok(Action::Start),
            "PASS" => Ok(Action::Pass),
            "ELIMINATE" => Ok(Action::Eliminate),
            other => Err(ValidationError::InvalidAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Winner {
    User,
    Mole,
}

impl Winner {
    pub fn as_str(self) -> &'static str {
        match self {
            Winner::User => "USER",
            Winner::Mole => "MOLE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Winner::User),
            "MOLE" => Some(Winner::Mole),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    pub id: i32,
    pub category: String,
    pub innocent_word: String,
    pub mole_word: String,
    pub difficulty: i32,
}

impl WordPair {
    /// 内鬼拿到 mole_word，其余角色拿到 innocent_word
    pub fn word_for(&self, participant: &str, mole: &str) -> &str {
        if participant == mole {
            &self.mole_word
        } else {
            &self.innocent_word
        }
    }
}

/// 词库条目 (res/word_pairs.toml 中的一项)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWordPair {
    pub category: String,
    pub innocent_word: String,
    pub mole_word: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: i32,
}

fn default_difficulty() -> i32 {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySetup {
    pub id: i32,
    pub date: NaiveDate,
    pub word_pair_id: i32,
    pub mole_model: String,
    pub turn_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDailySetup {
    pub date: NaiveDate,
    pub word_pair_id: i32,
    pub mole_model: String,
    pub turn_order: Vec<String>,
}

/// 单个角色在某一轮的发言
/// internal_thought 只落库，不返回给玩家
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialogue {
    pub model_name: String,
    pub message: String,
    #[serde(default)]
    pub internal_thought: String,
}

/// 面向玩家的发言视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicDialogue {
    pub model_name: String,
    pub message: String,
}

impl From<&Dialogue> for PublicDialogue {
    fn from(d: &Dialogue) -> Self {
        Self {
            model_name: d.model_name.clone(),
            message: d.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub state_hash: String,
    pub date: NaiveDate,
    pub round_number: u32,
    pub remaining_models: Vec<String>,
    pub action: Action,
    pub eliminated_model: Option<String>,
    pub dialogues: Vec<Dialogue>,
    pub game_over: bool,
    pub winner: Option<Winner>,
}

impl GameState {
    pub fn public_dialogues(&self) -> Vec<PublicDialogue> {
        self.dialogues.iter().map(PublicDialogue::from).collect()
    }
}
