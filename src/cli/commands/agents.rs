//! `provost agents`: show the agent registry.

use anyhow::Result;
use serde::Serialize;

use crate::adapters::llm::build_llm_client;
use crate::application::bootstrap::build_registry;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
pub struct AgentRow {
    pub intent: String,
    pub agent_type: String,
}

#[derive(Debug, Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<AgentRow>,
    pub fallback_agent: String,
    pub total: usize,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        if self.agents.is_empty() {
            return "No agents registered.".to_string();
        }
        let mut table = list_table(&["intent", "agent"]);
        for agent in &self.agents {
            let marker = if agent.intent == self.fallback_agent { " (fallback)" } else { "" };
            table.add_row(vec![format!("{}{marker}", agent.intent), agent.agent_type.clone()]);
        }
        format!("{} agent(s):\n{table}", self.total)
    }
}

pub fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let registry = build_registry(config, build_llm_client(&config.llm)?)?;
    let agents: Vec<AgentRow> = registry
        .list()
        .into_iter()
        .map(|(intent, agent_type)| AgentRow { intent, agent_type })
        .collect();
    output(
        &AgentListOutput {
            total: agents.len(),
            agents,
            fallback_agent: config.orchestration.fallback_agent.clone(),
        },
        json_mode,
    );
    Ok(())
}
