use super::reply::{Reply, parse_reply};
use super::{GenerationRequest, ResponseGenerator};
use crate::config::{GeneratorConfig, ParticipantConfig};
use anyhow::anyhow;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::fmt::Write;
use std::time::Duration;

/// 通过 OpenAI 兼容接口 (默认 OpenRouter) 生成角色发言
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    models: HashMap<String, String>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(config: &GeneratorConfig, participants: &[ParticipantConfig]) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_base(config.api_base.clone())
                .with_api_key(config.api_key.clone()),
        );
        Self {
            client,
            models: participants
                .iter()
                .map(|p| (p.name.clone(), p.model.clone()))
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn complete(&self, request: GenerationRequest) -> anyhow::Result<Reply> {
        let model = self
            .models
            .get(&request.model_name)
            .ok_or_else(|| anyhow!("unknown model: {}", request.model_name))?;

        let req = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt(&request))
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt(request.round_number))
                    .build()?
                    .into(),
            ])
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(req))
            .await
            .map_err(|_| anyhow!("request timed out after {}s", self.timeout.as_secs()))??;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!("empty completion from {}", model))?;

        Ok(parse_reply(content))
    }
}

impl ResponseGenerator for OpenAiGenerator {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, anyhow::Result<Reply>> {
        Box::pin(self.complete(request))
    }
}

pub(crate) fn system_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "You are \"{}\", one of several AI players in a social deduction word game.\n\
         Category: {}\n\
         Your word: \"{}\"\n\
         Round: {}\n\
         Every player but one shares the same word; the odd one out is the mole.\n\
         Describe your word indirectly in under 40 words and never say it outright.\n",
        request.model_name, request.category, request.assigned_word, request.round_number
    );

    if !request.previous_dialogues.is_empty() {
        prompt.push_str("\nPrevious round:\n");
        for d in &request.previous_dialogues {
            let _ = writeln!(prompt, "- {}: {}", d.model_name, d.message);
        }
    }

    prompt.push_str(
        "\nAnswer with strict JSON only: \
         {\"message\": \"what the players see\", \"internal_thought\": \"your hidden reasoning\"}",
    );
    prompt
}

pub(crate) fn user_prompt(round_number: u32) -> String {
    if round_number <= 1 {
        "Give your first hint.".to_string()
    } else {
        format!("Round {}: give a new hint, taking the previous round into account.", round_number)
    }
}
