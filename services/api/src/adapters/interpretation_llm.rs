//! services/api/src/adapters/interpretation_llm.rs
//!
//! This module contains the adapter for the tarot interpretation LLM.
//! It implements the `InterpretationService` port from the `core` crate.
//!
//! Every supported vendor exposes an OpenAI-compatible chat endpoint, so one
//! client type serves them all; only the base URL and key differ per request.

const SYSTEM_INSTRUCTIONS_ZH: &str = "你是一位极具洞察力的塔罗占卜师。";

const SYSTEM_INSTRUCTIONS_EN: &str = "You are a deeply insightful tarot reader.";

const USER_INPUT_TEMPLATE_ZH: &str = r#"用户的问题: "{question}"
牌阵: "{spread}"

抽出的牌及其位置:
{cards}

请给出一份精准、精炼且富有启发性的解读。

要求:
1. 紧扣用户的问题，不说空话。
2. 语言优美而简洁，不要冗长的开场白。
3. 解读每个位置的牌时插入该牌的图片，格式为: ![牌名](图片地址)
4. 风格专业、神秘、给人力量。
5. 使用 Markdown，排版整洁，不要多余的符号。
6. 结尾给出一个明确的行动建议。"#;

const USER_INPUT_TEMPLATE_EN: &str = r#"The seeker's question: "{question}"
Spread: "{spread}"

Cards drawn and their positions:
{cards}

Give a precise, concise and illuminating interpretation.

Requirements:
1. Answer the question directly, no filler.
2. Keep the language graceful but brief, with no long preamble.
3. When interpreting each position, embed the card image as: ![card name](image url)
4. Keep the tone professional, mystical and empowering.
5. Use clean Markdown without stray symbols.
6. End with one clear, actionable piece of advice."#;

use std::collections::HashMap;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use aura_tarot_core::{
    ports::{InterpretationService, PortError, PortResult},
    AiProvider, InterpretationRequest, Language,
};
use tracing::{debug, error};

/// OpenAI-compatible base URL of each vendor.
pub fn endpoint(provider: AiProvider) -> &'static str {
    match provider {
        AiProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        AiProvider::Deepseek => "https://api.deepseek.com/v1",
        AiProvider::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
        AiProvider::Kimi => "https://api.moonshot.cn/v1",
    }
}

/// Model used when the profile left the model field blank.
pub fn default_model(provider: AiProvider) -> &'static str {
    match provider {
        AiProvider::Gemini => "gemini-3-flash-preview",
        AiProvider::Deepseek => "deepseek-chat",
        AiProvider::Qwen => "qwen-plus",
        AiProvider::Kimi => "moonshot-v1-8k",
    }
}

/// Renders the user message for one reading.
pub fn build_prompt(request: &InterpretationRequest) -> String {
    let cards = request
        .cards
        .iter()
        .map(|drawn| match request.language {
            Language::Zh => format!(
                "位置: {}, 牌名: {}, 含义: {}, 图片地址: {}",
                drawn.position, drawn.card.name, drawn.card.meaning, drawn.card.image
            ),
            Language::En => format!(
                "Position: {}, Card: {}, Meaning: {}, Image: {}",
                drawn.position,
                if drawn.card.name_en.is_empty() {
                    &drawn.card.name
                } else {
                    &drawn.card.name_en
                },
                drawn.card.meaning,
                drawn.card.image
            ),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let template = match request.language {
        Language::Zh => USER_INPUT_TEMPLATE_ZH,
        Language::En => USER_INPUT_TEMPLATE_EN,
    };
    template
        .replace("{question}", &request.question)
        .replace("{spread}", &request.spread.name)
        .replace("{cards}", &cards)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `InterpretationService` over OpenAI-compatible APIs.
#[derive(Clone, Default)]
pub struct OpenAiInterpretationAdapter {
    fallback_keys: HashMap<AiProvider, String>,
}

impl OpenAiInterpretationAdapter {
    /// Creates a new adapter. `fallback_keys` are used for profiles that have
    /// not entered a key of their own.
    pub fn new(fallback_keys: HashMap<AiProvider, String>) -> Self {
        Self { fallback_keys }
    }

    fn resolve_key(&self, request: &InterpretationRequest) -> Option<String> {
        let own = request.settings.api_key.trim();
        if !own.is_empty() {
            return Some(own.to_string());
        }
        self.fallback_keys.get(&request.settings.provider).cloned()
    }
}

//=========================================================================================
// `InterpretationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl InterpretationService for OpenAiInterpretationAdapter {
    async fn interpret(&self, request: &InterpretationRequest) -> PortResult<String> {
        let provider = request.settings.provider;
        let api_key = self.resolve_key(request).ok_or(PortError::Unauthorized)?;
        let model = match request.settings.model.trim() {
            "" => default_model(provider),
            model => model,
        };
        debug!(?provider, model, "Requesting interpretation");

        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_base(endpoint(provider))
                .with_api_key(api_key),
        );

        let system = match request.language {
            Language::Zh => SYSTEM_INSTRUCTIONS_ZH,
            Language::En => SYSTEM_INSTRUCTIONS_EN,
        };
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(request))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(0.7)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Every vendor failure, including a rejected key, surfaces as the generic apology.
        let response = client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| {
                error!(?provider, "Interpretation request failed: {}", e);
                PortError::Unexpected(e.to_string())
            })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                PortError::Unexpected("Interpretation response contained no text".to_string())
            })
    }
}
