use crate::model::{Dialogue, WordPair};
use crate::{debug, warn};
use futures_util::future::BoxFuture;
use std::sync::Arc;

pub mod openai;
pub mod reply;

pub use openai::OpenAiGenerator;
pub use reply::Reply;

/// 单个角色的一次生成请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model_name: String,
    pub assigned_word: String,
    pub category: String,
    pub round_number: u32,
    /// 上一轮的发言，第一轮为空
    pub previous_dialogues: Vec<Dialogue>,
}

/// 回复生成协作方
///
/// 失败不会中断整轮，由 [`generate_round`] 替换为占位发言。
pub trait ResponseGenerator: Send + Sync {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, anyhow::Result<Reply>>;
}

/// 一轮生成所需的公共信息
#[derive(Debug, Clone)]
pub struct RoundBrief<'a> {
    pub word_pair: &'a WordPair,
    pub mole_model: &'a str,
    pub round_number: u32,
    pub previous_dialogues: &'a [Dialogue],
}

/// 为每个存活角色并发生成发言，等待全部完成后按传入顺序返回
///
/// 每个角色一个独立任务，互不取消；失败（包括任务 panic）的角色得到占位发言。
pub async fn generate_round(
    generator: Arc<dyn ResponseGenerator>,
    participants: &[String],
    brief: &RoundBrief<'_>,
    fallback_message: &str,
) -> Vec<Dialogue> {
    let handles: Vec<_> = participants
        .iter()
        .map(|name| {
            let request = GenerationRequest {
                model_name: name.clone(),
                assigned_word: brief.word_pair.word_for(name, brief.mole_model).to_string(),
                category: brief.word_pair.category.clone(),
                round_number: brief.round_number,
                previous_dialogues: brief.previous_dialogues.to_vec(),
            };
            let generator = generator.clone();
            tokio::spawn(async move { generator.generate(request).await })
        })
        .collect();

    let outcomes = futures_util::future::join_all(handles).await;

    participants
        .iter()
        .zip(outcomes)
        .map(|(name, outcome)| {
            let failure = match outcome {
                Ok(Ok(reply)) => {
                    debug!(target: "Generator", "[{}] 第 {} 轮发言完成", name, brief.round_number);
                    return reply.into_dialogue(name);
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("generation task aborted: {}", e),
            };
            warn!(target: "Generator", "[{}] 生成失败，使用占位发言: {}", name, failure);
            Dialogue {
                model_name: name.clone(),
                message: fallback_message.to_string(),
                internal_thought: failure,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// 记录每次请求；名单内的角色直接失败
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<GenerationRequest>>,
        failing: HashSet<String>,
        panicking: HashSet<String>,
    }

    impl ResponseGenerator for Recorder {
        fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, anyhow::Result<Reply>> {
            Box::pin(async move {
                if let Ok(mut seen) = self.seen.lock() {
                    seen.push(request.clone());
                }
                if self.panicking.contains(&request.model_name) {
                    panic!("boom");
                }
                if self.failing.contains(&request.model_name) {
                    anyhow::bail!("upstream 502");
                }
                Ok(Reply {
                    message: format!("{} hakkında bir ipucu", request.assigned_word),
                    internal_thought: format!("{} düşünüyor", request.model_name),
                })
            })
        }
    }

    fn pair() -> WordPair {
        WordPair {
            id: 1,
            category: "Meyve".into(),
            innocent_word: "Elma".into(),
            mole_word: "Armut".into(),
            difficulty: 3,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn one_call_per_participant_in_order() {
        let recorder = Arc::new(Recorder::default());
        let pair = pair();
        let previous = vec![Dialogue {
            model_name: "Claude".into(),
            message: "Kırmızı".into(),
            internal_thought: String::new(),
        }];
        let brief = RoundBrief {
            word_pair: &pair,
            mole_model: "Grok",
            round_number: 2,
            previous_dialogues: &previous,
        };
        let participants = names(&["Llama", "Grok", "Claude"]);

        let dialogues = generate_round(recorder.clone(), &participants, &brief, "-").await;

        let order: Vec<&str> = dialogues.iter().map(|d| d.model_name.as_str()).collect();
        assert_eq!(order, ["Llama", "Grok", "Claude"]);
        assert_eq!(dialogues[1].message, "Armut hakkında bir ipucu");
        assert_eq!(dialogues[0].message, "Elma hakkında bir ipucu");

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|r| r.previous_dialogues == previous));
        assert!(seen.iter().all(|r| r.category == "Meyve" && r.round_number == 2));
    }

    #[tokio::test]
    async fn failures_become_fallback_entries() {
        let recorder = Arc::new(Recorder {
            failing: HashSet::from(["Gemini".to_string()]),
            panicking: HashSet::from(["DeepSeek".to_string()]),
            ..Default::default()
        });
        let pair = pair();
        let brief = RoundBrief {
            word_pair: &pair,
            mole_model: "Grok",
            round_number: 1,
            previous_dialogues: &[],
        };
        let participants = names(&["Gemini", "Claude", "DeepSeek"]);

        let dialogues = generate_round(recorder, &participants, &brief, "yanıt yok").await;

        assert_eq!(dialogues.len(), 3);
        assert_eq!(dialogues[0].message, "yanıt yok");
        assert!(dialogues[0].internal_thought.contains("upstream 502"));
        assert_eq!(dialogues[1].message, "Elma hakkında bir ipucu");
        assert_eq!(dialogues[2].message, "yanıt yok");
        assert_eq!(dialogues[2].model_name, "DeepSeek");
    }
}
