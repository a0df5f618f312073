//! Confirmation and selection prompts

use crate::project::EnvType;
use anyhow::Result;
use console::Term;

/// Ask a yes/no question; defaults to "no"
///
/// Without a terminal the question cannot be answered and counts as declined.
pub fn confirm(question: &str) -> Result<bool> {
    if !Term::stderr().is_term() {
        return Ok(false);
    }
    let answer: bool = cliclack::confirm(question)
        .initial_value(false)
        .interact()?;
    Ok(answer)
}

/// Answer every question with "yes" (`--assume-yes`)
pub fn confirm_yes(question: &str) -> Result<bool> {
    cliclack::log::info(format!("{} yes", question))?;
    Ok(true)
}

/// Pick an environment type interactively
pub fn select_env_type() -> Result<EnvType> {
    let mut select = cliclack::select("Select an environment type");
    for env_type in EnvType::ALL {
        select = select.item(env_type, env_type.as_str(), "");
    }
    let picked: EnvType = select.initial_value(EnvType::Magento2).interact()?;
    Ok(picked)
}
