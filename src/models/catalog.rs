use serde::{Deserialize, Serialize};

/// Descriptor for a selectable model, as surfaced in the model picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiModel {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "maxLength")]
    pub max_length: u32,
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
    pub capabilities: Vec<String>,
    #[serde(rename = "isAvailable")]
    pub is_available: bool,
}

struct BuiltinModel {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    max_length: u32,
    max_tokens: u32,
    capabilities: &'static [&'static str],
}

const BUILTIN_MODELS: &[BuiltinModel] = &[
    BuiltinModel {
        id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        description: "Optimized for chat at 1/10th the cost of GPT-4.",
        max_length: 16000,
        max_tokens: 4096,
        capabilities: &["Natural language processing", "Chat completions", "Text generation"],
    },
    BuiltinModel {
        id: "gpt-4",
        name: "GPT-4",
        description: "Our most advanced model, optimized for chat.",
        max_length: 24000,
        max_tokens: 8192,
        capabilities: &["Advanced reasoning", "Complex instructions", "Expert knowledge"],
    },
    BuiltinModel {
        id: "gpt-4-turbo",
        name: "GPT-4 Turbo",
        description: "Our latest GPT-4 model with improved performance.",
        max_length: 128000,
        max_tokens: 128000,
        capabilities: &["Advanced reasoning", "Complex instructions", "Up-to-date knowledge"],
    },
    BuiltinModel {
        id: "claude-3-opus",
        name: "Claude 3 Opus",
        description: "Anthropic's most powerful model for highly complex tasks.",
        max_length: 200000,
        max_tokens: 200000,
        capabilities: &["Sophisticated reasoning", "Advanced coding", "Detailed analysis"],
    },
    BuiltinModel {
        id: "claude-3-sonnet",
        name: "Claude 3 Sonnet",
        description: "Anthropic's balanced model for performance and efficiency.",
        max_length: 180000,
        max_tokens: 180000,
        capabilities: &["Strong reasoning", "Detailed responses", "Balanced performance"],
    },
    BuiltinModel {
        id: "llama-3",
        name: "Llama 3",
        description: "Meta's latest open-source large language model.",
        max_length: 8192,
        max_tokens: 8192,
        capabilities: &["General purpose", "Open source", "Efficient performance"],
    },
];

pub fn available_models() -> Vec<AiModel> {
    BUILTIN_MODELS
        .iter()
        .map(|m| AiModel {
            id: m.id.to_string(),
            name: m.name.to_string(),
            description: m.description.to_string(),
            max_length: m.max_length,
            max_tokens: m.max_tokens,
            capabilities: m.capabilities.iter().map(|c| c.to_string()).collect(),
            is_available: true,
        })
        .collect()
}

pub fn default_model() -> AiModel {
    available_models().remove(0)
}
