//! Token estimation for the checked selection.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};

use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base};

use crate::infra::config::Config;

/// Supported token estimation models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenModel {
    /// OpenAI GPT-4o.
    OpenAiGpt4o,
    /// OpenAI GPT-4o mini.
    #[default]
    OpenAiGpt4oMini,
    /// Anthropic Claude 3.5 Sonnet.
    AnthropicClaude35Sonnet,
    /// Character/word heuristic fallback.
    CharacterFallback,
}

impl TokenModel {
    /// Stable identifier for configuration and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenModel::OpenAiGpt4o => "openai:gpt-4o",
            TokenModel::OpenAiGpt4oMini => "openai:gpt-4o-mini",
            TokenModel::AnthropicClaude35Sonnet => "anthropic:claude-3.5-sonnet",
            TokenModel::CharacterFallback => "fallback:characters",
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            TokenModel::OpenAiGpt4o | TokenModel::OpenAiGpt4oMini => "OpenAI",
            TokenModel::AnthropicClaude35Sonnet => "Anthropic",
            TokenModel::CharacterFallback => "Heuristic",
        }
    }
}

impl fmt::Display for TokenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenModel {
    type Err = TokenModelParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai:gpt-4o" => Ok(TokenModel::OpenAiGpt4o),
            "openai:gpt-4o-mini" => Ok(TokenModel::OpenAiGpt4oMini),
            "anthropic:claude-3.5-sonnet" => Ok(TokenModel::AnthropicClaude35Sonnet),
            "fallback:characters" | "heuristic" | "fallback" => Ok(TokenModel::CharacterFallback),
            other => Err(TokenModelParseError::UnknownModel(other.to_string())),
        }
    }
}

/// Error returned when parsing a [`TokenModel`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TokenModelParseError {
    #[error("unknown token model '{0}'")]
    UnknownModel(String),
}

/// Heuristics used when no deterministic tokenizer is available. Code skews
/// denser than prose, hence the multiplier.
#[derive(Debug, Clone)]
pub struct HeuristicConfig {
    pub chars_per_token: f32,
    pub tokens_per_word: f32,
    pub code_multiplier: f32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            chars_per_token: 4.0,
            tokens_per_word: 1.0,
            code_multiplier: 1.25,
        }
    }
}

impl HeuristicConfig {
    fn estimate(&self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }
        let chars = text.chars().count() as f32;
        let words = text.split_whitespace().count() as f32;
        let char_based = (chars / self.chars_per_token).ceil();
        let word_based = (words * self.tokens_per_word).ceil();
        let estimate = char_based.max(word_based) * self.code_multiplier;
        (estimate.ceil() as usize).max(1)
    }
}

/// Estimates token usage of the would-be export.
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    model: TokenModel,
    token_budget: u32,
    heuristics: HeuristicConfig,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(TokenModel::default())
    }
}

impl TokenEstimator {
    pub fn new(model: TokenModel) -> Self {
        Self {
            model,
            token_budget: 120_000,
            heuristics: HeuristicConfig::default(),
        }
    }

    /// Initialize from the layered application configuration.
    pub fn from_config(config: &Config) -> Self {
        let model = config
            .defaults
            .model
            .parse()
            .unwrap_or_else(|_| TokenModel::default());
        let mut estimator = Self::new(model);
        estimator.token_budget = config.defaults.token_budget;
        estimator
    }

    pub fn model(&self) -> TokenModel {
        self.model
    }

    pub fn token_budget(&self) -> u32 {
        self.token_budget
    }

    /// Token count for one piece of text.
    pub fn estimate(&self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }
        match tokenizer_for(self.model) {
            Some(bpe) => bpe.lock().unwrap().encode_ordinary(text).len(),
            None => self.heuristics.estimate(text),
        }
    }

    /// Per-section breakdown plus totals for labeled export sections.
    pub fn summarize(&self, sections: &[(String, String)]) -> SelectionTokenSummary {
        let mut items = Vec::with_capacity(sections.len());
        let mut total_tokens = 0usize;
        let mut total_characters = 0usize;

        for (label, text) in sections {
            let tokens = self.estimate(text);
            let characters = text.chars().count();
            total_tokens += tokens;
            total_characters += characters;
            items.push(SectionTokenEstimate {
                label: label.clone(),
                tokens,
                characters,
            });
        }

        SelectionTokenSummary {
            model: self.model,
            token_budget: self.token_budget,
            total_tokens,
            total_characters,
            items,
        }
    }
}

/// Token totals for the current checked selection.
#[derive(Debug, Clone)]
pub struct SelectionTokenSummary {
    pub model: TokenModel,
    pub token_budget: u32,
    pub total_tokens: usize,
    pub total_characters: usize,
    pub items: Vec<SectionTokenEstimate>,
}

/// Per-structure token estimate.
#[derive(Debug, Clone)]
pub struct SectionTokenEstimate {
    pub label: String,
    pub tokens: usize,
    pub characters: usize,
}

fn tokenizer_for(model: TokenModel) -> Option<Arc<Mutex<CoreBPE>>> {
    match model {
        TokenModel::OpenAiGpt4o | TokenModel::OpenAiGpt4oMini => {
            static O200K: OnceLock<Option<Arc<Mutex<CoreBPE>>>> = OnceLock::new();
            O200K
                .get_or_init(|| match o200k_base() {
                    Ok(bpe) => Some(Arc::new(Mutex::new(bpe))),
                    Err(err) => {
                        tracing::warn!(error = %err, "o200k tokenizer unavailable");
                        None
                    }
                })
                .clone()
        }
        TokenModel::AnthropicClaude35Sonnet => {
            static CL100K: OnceLock<Option<Arc<Mutex<CoreBPE>>>> = OnceLock::new();
            CL100K
                .get_or_init(|| match cl100k_base() {
                    Ok(bpe) => Some(Arc::new(Mutex::new(bpe))),
                    Err(err) => {
                        tracing::warn!(error = %err, "cl100k tokenizer unavailable");
                        None
                    }
                })
                .clone()
        }
        TokenModel::CharacterFallback => None,
    }
}
