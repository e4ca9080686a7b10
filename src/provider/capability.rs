//! Model capability lookup
//!
//! Backends do not advertise what a model accepts, so this is a hand-kept
//! table of model-id prefixes. It is never complete: models that match no
//! entry are treated as lacking the capability.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Accepts image parts in user messages
    Vision,
}

/// Model families known to accept image input
const VISION_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4.1",
    "gpt-4-turbo",
    "gpt-4-vision",
    "gpt-5",
    "o4-mini",
    "chatgpt-4o",
    "claude-3",
    "claude-sonnet-4",
    "claude-opus-4",
    "gemini-",
    "glm-4v",
    "qwen-vl",
    "qwen2-vl",
    "qwen2.5-vl",
    "llava",
    "bakllava",
    "llama3.2-vision",
    "pixtral",
    "minicpm-v",
];

#[derive(Debug, Clone)]
pub struct CapabilityTable {
    entries: Vec<(String, BTreeSet<Capability>)>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        let mut table = Self {
            entries: Vec::new(),
        };
        for model in VISION_MODELS {
            table.insert(*model, Capability::Vision);
        }
        table
    }
}

impl CapabilityTable {
    /// Table with no entries; every lookup fails.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `capability` for every model whose id starts with `prefix`.
    pub fn insert(&mut self, prefix: impl Into<String>, capability: Capability) {
        let prefix = prefix.into().to_lowercase();
        match self.entries.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, caps)) => {
                caps.insert(capability);
            }
            None => self.entries.push((prefix, BTreeSet::from([capability]))),
        }
    }

    /// Whether `model` is known to have `capability`.
    ///
    /// Matching is case-insensitive on the id prefix. An owner namespace such
    /// as `openai/` or `lmstudio-community/` is ignored.
    pub fn supports(&self, model: &str, capability: Capability) -> bool {
        let model = model.to_lowercase();
        let name = model.rsplit('/').next().unwrap_or(&model);

        self.entries
            .iter()
            .any(|(prefix, caps)| name.starts_with(prefix.as_str()) && caps.contains(&capability))
    }
}
