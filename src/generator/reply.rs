use crate::model::Dialogue;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// JSON 解析失败时保留的原文长度
const RAW_MESSAGE_LIMIT: usize = 200;

/// 模型回复: 公开发言 + 隐藏想法
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub message: String,
    pub internal_thought: String,
}

impl Reply {
    pub fn into_dialogue(self, model_name: &str) -> Dialogue {
        Dialogue {
            model_name: model_name.to_string(),
            message: self.message,
            internal_thought: self.internal_thought,
        }
    }
}

#[derive(Deserialize)]
struct RawReply {
    message: Option<String>,
    internal_thought: Option<String>,
}

fn open_fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[A-Za-z]*\s*").unwrap())
}

fn close_fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```$").unwrap())
}

fn object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap())
}

/// 去掉 Markdown 代码块包裹
///
/// 开头与结尾分别处理，被长度上限截断的回复只有开头的围栏。
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let body = match open_fence_regex().find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    };
    match close_fence_regex().find(body) {
        Some(m) => body[..m.start()].trim(),
        None => body.trim(),
    }
}

/// 解析模型输出的 `{"message", "internal_thought"}`
///
/// 也接受代码块包裹或前后夹杂说明文字的 JSON；
/// 完全无法解析时截取原文作为发言。
pub fn parse_reply(content: &str) -> Reply {
    let body = strip_fences(content);

    let parsed = serde_json::from_str::<RawReply>(body).ok().or_else(|| {
        object_regex()
            .find(body)
            .and_then(|m| serde_json::from_str::<RawReply>(m.as_str()).ok())
    });

    match parsed {
        Some(raw) => Reply {
            message: raw.message.unwrap_or_else(|| body.to_string()),
            internal_thought: raw.internal_thought.unwrap_or_default(),
        },
        None => Reply {
            message: body.chars().take(RAW_MESSAGE_LIMIT).collect(),
            internal_thought: "JSON parse failure".to_string(),
        },
    }
}
