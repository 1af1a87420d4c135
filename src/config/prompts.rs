//! Prompt templates for Maestro.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub selection: SelectionPrompts,
    pub clarify: ClarifyPrompts,
    pub explain: ExplainPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompt for choosing one tool and resolving its invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPrompts {
    pub user: String,
}

impl Default for SelectionPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are a tool selection engine.

Candidate tool schemas, one JSON document per line:
{{schemas}}

Choose exactly one tool and resolve its invocation from the user query:
- "url" and "method" come from the chosen tool's http binding
- "payload" maps each parameter name to the value derived from the query
- any parameter the query does not provide must be null, never guessed
- "guidance_note" may carry a short hint for the final explanation, or null

User query: {{query}}"#
                .to_string(),
        }
    }
}

/// Prompt for asking the user for missing required fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClarifyPrompts {
    pub user: String,
}

impl Default for ClarifyPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are gathering the information a tool call still needs.

The request cannot be completed yet. These required fields are missing:
{{fields}}

User query: {{query}}

In the language of the user query, explain exactly which fields are still
needed and ask the user to provide them. Do not invent values."#
                .to_string(),
        }
    }
}

/// Prompt for narrating a raw answer back to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainPrompts {
    pub user: String,
}

impl Default for ExplainPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are an explainer.

Previously the user asked: {{query}}

Answer: {{answer}}

{{guidance}}
Explain the answer in the language of the user query."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from defaults, with optional custom directory and
    /// variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let selection_path = custom_path.join("selection.toml");
            if selection_path.exists() {
                let content = std::fs::read_to_string(&selection_path)?;
                prompts.selection = toml::from_str(&content)?;
            }

            let clarify_path = custom_path.join("clarify.toml");
            if clarify_path.exists() {
                let content = std::fs::read_to_string(&clarify_path)?;
                prompts.clarify = toml::from_str(&content)?;
            }

            let explain_path = custom_path.join("explain.toml");
            if explain_path.exists() {
                let content = std::fs::read_to_string(&explain_path)?;
                prompts.explain = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom
    /// config variables. Provided variables take precedence.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
