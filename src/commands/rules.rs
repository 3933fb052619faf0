use clap::Args;
use serde::Serialize;

use upgrader::rules::RULES;

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct RulesArgs {}

#[derive(Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub description: String,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum RulesOutput {
    #[serde(rename = "rules")]
    List { rules: Vec<RuleSummary> },
}

pub fn run(_args: RulesArgs, _global: &GlobalArgs) -> CmdResult<RulesOutput> {
    let rules = RULES
        .iter()
        .map(|(name, description)| RuleSummary {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect();

    Ok((RulesOutput::List { rules }, 0))
}
