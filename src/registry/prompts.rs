//! Prompt registry: named templates rendered with variables.

use std::collections::HashMap;

use crate::error::{McpError, McpResult};
use crate::protocol::{PromptDefinition, PromptMessage, PromptVariable, RenderedPrompt};

struct Entry {
    definition: PromptDefinition,
    template: String,
}

/// In-memory prompt index, keyed by name.
#[derive(Default)]
pub struct PromptRegistry {
    entries: HashMap<String, Entry>,
}

impl PromptRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: PromptDefinition, template: impl Into<String>) {
        self.entries.insert(
            definition.name.clone(),
            Entry {
                definition,
                template: template.into(),
            },
        );
    }

    /// A snapshot of all registered prompt definitions.
    #[must_use]
    pub fn list(&self) -> Vec<PromptDefinition> {
        self.entries.values().map(|e| e.definition.clone()).collect()
    }

    /// Render `name` against `variables`. Every `{{identifier}}` occurrence
    /// in the template is replaced with the string coercion of
    /// `variables[identifier]`, or the empty string if the key is absent.
    /// No escaping, nesting, or conditionals are performed.
    ///
    /// # Errors
    ///
    /// [`McpError::PromptNotFound`] if `name` is not registered.
    pub fn get(&self, name: &str, variables: &serde_json::Value) -> McpResult<RenderedPrompt> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| McpError::PromptNotFound { name: name.to_owned() })?;

        let empty = serde_json::Map::new();
        let vars = variables.as_object().unwrap_or(&empty);
        let content = render(&entry.template, vars);

        Ok(RenderedPrompt {
            name: name.to_owned(),
            messages: vec![PromptMessage {
                role: "system".to_owned(),
                content,
            }],
        })
    }
}

fn coerce(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace every `{{identifier}}` in `template`. An unterminated `{{` is
/// left verbatim in the output rather than silently dropped.
fn render(template: &str, variables: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let ident = after_open[..end].trim();
                let replacement = variables.get(ident).map_or_else(String::new, coerce);
                out.push_str(&replacement);
                rest = &after_open[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Built-in prompts
// ---------------------------------------------------------------------------

pub fn summarize_definition() -> PromptDefinition {
    PromptDefinition {
        name: "summarize".to_owned(),
        description: Some("Summarize a block of text.".to_owned()),
        variables: vec![PromptVariable {
            name: "text".to_owned(),
            description: None,
            required: Some(true),
        }],
    }
}

pub const SUMMARIZE_TEMPLATE: &str =
    "Summarize the following text:\n\n{{text}}\n\nReturn a concise summary.";

pub fn system_instructions_definition() -> PromptDefinition {
    PromptDefinition {
        name: "system-instructions".to_owned(),
        description: Some("Render a system prompt for a given persona.".to_owned()),
        variables: vec![PromptVariable {
            name: "persona".to_owned(),
            description: None,
            required: Some(false),
        }],
    }
}

pub const SYSTEM_INSTRUCTIONS_TEMPLATE: &str = "You are a helpful assistant. Persona: {{persona}}";

/// Register `summarize` and `system-instructions` into `registry`.
pub fn register_builtins(registry: &mut PromptRegistry) {
    registry.register(summarize_definition(), SUMMARIZE_TEMPLATE);
    registry.register(system_instructions_definition(), SYSTEM_INSTRUCTIONS_TEMPLATE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prompt_is_not_found() {
        let registry = PromptRegistry::new();
        let err = registry.get("nope", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, McpError::PromptNotFound { .. }));
    }

    #[test]
    fn summarize_substitutes_text_variable() {
        let mut registry = PromptRegistry::new();
        register_builtins(&mut registry);

        let rendered = registry
            .get("summarize", &serde_json::json!({"text": "hello world"}))
            .expect("get");
        assert!(rendered.messages[0].content.contains("hello world"));
        assert_eq!(rendered.messages[0].role, "system");
    }

    #[test]
    fn missing_variable_renders_as_empty_string() {
        let mut registry = PromptRegistry::new();
        register_builtins(&mut registry);

        let rendered = registry
            .get("system-instructions", &serde_json::json!({}))
            .expect("get");
        assert_eq!(rendered.messages[0].content, "You are a helpful assistant. Persona: ");
    }

    #[test]
    fn non_string_variable_is_coerced() {
        let mut registry = PromptRegistry::new();
        registry.register(
            PromptDefinition {
                name: "count".to_owned(),
                description: None,
                variables: vec![],
            },
            "n = {{n}}",
        );

        let rendered = registry.get("count", &serde_json::json!({"n": 42})).expect("get");
        assert_eq!(rendered.messages[0].content, "n = 42");
    }

    #[test]
    fn no_nested_or_conditional_expansion() {
        let mut registry = PromptRegistry::new();
        registry.register(
            PromptDefinition {
                name: "literal".to_owned(),
                description: None,
                variables: vec![],
            },
            "{{a}} and {{{{b}}}}",
        );

        let rendered = registry
            .get("literal", &serde_json::json!({"a": "X", "b": "Y", "{{b}}": "Z"}))
            .expect("get");
        // "{{a}}" substitutes; the doubled braces around b are parsed as
        // "{{" + "{b}" + "}}" with no lookup for the literal key "{{b}}".
        assert!(rendered.messages[0].content.starts_with("X and "));
    }
}
