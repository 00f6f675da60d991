//! Interactive prompts.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};

use crate::error::{PyscopeError, Result};

use super::{Prompt, PromptOption, PromptResult, PromptType};

fn map_dialoguer_err(e: dialoguer::Error) -> PyscopeError {
    PyscopeError::Io(e.into())
}

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style(String::new()),
        ..ColorfulTheme::default()
    }
}

/// Ask the question on `term` and wait for an answer.
pub fn prompt_user(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    match &prompt.prompt_type {
        PromptType::Confirm => prompt_confirm(prompt, term),
        PromptType::Select { options } => prompt_select(prompt, options, term),
    }
}

/// Interpret a default string as a yes/no answer.
pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}

fn prompt_confirm(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    let default = prompt.default.as_deref().map(parse_bool).unwrap_or(false);

    let answer = Confirm::with_theme(&prompt_theme())
        .with_prompt(&prompt.question)
        .default(default)
        .interact_on(term)
        .map_err(map_dialoguer_err)?;

    Ok(PromptResult::Bool(answer))
}

fn prompt_select(prompt: &Prompt, options: &[PromptOption], term: &Term) -> Result<PromptResult> {
    let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();

    let default_idx = prompt
        .default
        .as_ref()
        .and_then(|d| options.iter().position(|o| o.value == *d))
        .unwrap_or(0);

    let selection = Select::with_theme(&prompt_theme())
        .with_prompt(&prompt.question)
        .items(&labels)
        .default(default_idx)
        .interact_on(term)
        .map_err(map_dialoguer_err)?;

    options
        .get(selection)
        .map(|o| PromptResult::String(o.value.clone()))
        .ok_or_else(|| PyscopeError::Other(anyhow::anyhow!("selection out of range")))
}
