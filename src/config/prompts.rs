//! Prompt templates for Tekst.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// Prompts for sentence reconstruction and speaker attribution.
    pub refinement: RefinementPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the chunked refinement engine.
///
/// Available placeholders: `{{language}}`, `{{count}}`, `{{speaker}}`, `{{text}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RefinementPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert language tutor preparing auto-generated {{language}} video captions for language learners.

The captions are messy: they lack punctuation, split sentences at arbitrary points and carry no speaker labels.

For every caption line you receive, you produce exactly one output object:
- "fullSentence": the complete, grammatically correct sentence this line belongs to, with proper punctuation and capitalization. Keep the vocabulary authentic; do not simplify or translate.
- "speaker": a label such as "Speaker 1" or "Speaker 2".

Be liberal about detecting speaker changes. Questions followed by answers, direct address ("du", "Sie", "you"), greetings and abrupt topic shifts usually mean a different person is talking.

Never merge, split, drop or reorder lines. The output array must have exactly one object per input line, in the same order."#
                .to_string(),

            user: r#"Language: {{language}}
The previous part of this transcript ended with: {{speaker}}

Caption lines ({{count}} total):
{{text}}

Return ONLY a JSON array of exactly {{count}} objects, one per numbered line, in order:
[{"fullSentence": "...", "speaker": "Speaker 1"}]"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let refinement_path = custom_path.join("refinement.toml");
            if refinement_path.exists() {
                let content = std::fs::read_to_string(&refinement_path)?;
                prompts.refinement = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
