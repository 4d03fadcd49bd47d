use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::engine::SummarizeEngine;
use crate::{EngineFault, ModelSelector, SummarizeError};

/// Instruction prefix required by T5-family models.
pub const T5_PREFIX: &str = "summarize: ";
/// Word count above which T5 inputs are cut before the first call.
pub const T5_INPUT_CEILING: usize = 1500;

/// A registered engine together with its calling convention.
#[derive(Clone)]
pub struct EngineEntry {
    selector: ModelSelector,
    engine: Arc<dyn SummarizeEngine>,
    prefix: Option<String>,
    input_ceiling: Option<usize>,
}

impl EngineEntry {
    pub fn new(selector: ModelSelector, engine: Arc<dyn SummarizeEngine>) -> Self {
        Self {
            selector,
            engine,
            prefix: None,
            input_ceiling: None,
        }
    }

    /// Entry with the conventions the selector's model family expects.
    pub fn with_defaults(selector: ModelSelector, engine: Arc<dyn SummarizeEngine>) -> Self {
        let entry = Self::new(selector, engine);
        match selector {
            ModelSelector::Bart => entry,
            ModelSelector::T5 => entry
                .with_prefix(Some(T5_PREFIX))
                .with_input_ceiling(Some(T5_INPUT_CEILING)),
        }
    }

    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.filter(|value| !value.is_empty()).map(str::to_string);
        self
    }

    pub fn with_input_ceiling(mut self, ceiling: Option<usize>) -> Self {
        self.input_ceiling = ceiling.filter(|value| *value > 0);
        self
    }

    pub fn selector(&self) -> ModelSelector {
        self.selector
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn input_ceiling(&self) -> Option<usize> {
        self.input_ceiling
    }

    /// Submit `text` to the engine, applying the entry's prefix.
    pub fn invoke(
        &self,
        text: &str,
        max_length: usize,
        min_length: usize,
    ) -> Result<Value, EngineFault> {
        match &self.prefix {
            Some(prefix) => self
                .engine
                .summarize(&format!("{prefix}{text}"), max_length, min_length),
            None => self.engine.summarize(text, max_length, min_length),
        }
    }
}

/// Engines loaded at startup, shared read-only by every request.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    entries: HashMap<ModelSelector, EngineEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: EngineEntry) {
        info!(
            model = %entry.selector,
            engine = entry.engine_name(),
            prefix = entry.prefix().unwrap_or(""),
            ceiling = entry.input_ceiling().unwrap_or(0),
            "registered summarization engine"
        );
        self.entries.insert(entry.selector, entry);
    }

    pub fn get(&self, selector: ModelSelector) -> Option<&EngineEntry> {
        self.entries.get(&selector)
    }

    /// Resolve a selector string to its entry.
    ///
    /// Unknown names and known names without a loaded engine both fail with
    /// [`SummarizeError::UnknownModel`]; there is no default substitution.
    pub fn lookup(&self, name: &str) -> Result<&EngineEntry, SummarizeError> {
        let selector: ModelSelector = name.parse()?;
        self.get(selector)
            .ok_or_else(|| SummarizeError::UnknownModel(name.to_string()))
    }

    pub fn selectors(&self) -> Vec<ModelSelector> {
        ModelSelector::ALL
            .into_iter()
            .filter(|selector| self.entries.contains_key(selector))
            .collect()
    }
}
