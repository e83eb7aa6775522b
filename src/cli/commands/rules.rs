//! `provost rules`: list the loaded rule catalog.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::Config;
use crate::services::RuleCatalog;

#[derive(Debug, Serialize)]
pub struct RuleRow {
    pub name: String,
    pub intent: String,
    pub priority: i32,
    pub action: String,
    pub urgency: String,
    pub confidence: f64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RuleListOutput {
    pub source: String,
    pub rules: Vec<RuleRow>,
}

impl CommandOutput for RuleListOutput {
    fn to_human(&self) -> String {
        if self.rules.is_empty() {
            return "No rules loaded.".to_string();
        }
        let mut table = list_table(&["name", "intent", "priority", "action", "urgency", "keywords"]);
        for rule in &self.rules {
            table.add_row(vec![
                rule.name.clone(),
                rule.intent.clone(),
                rule.priority.to_string(),
                rule.action.clone(),
                rule.urgency.clone(),
                truncate(&rule.keywords.join(", "), 40),
            ]);
        }
        format!("{} rule(s) from {}:\n{table}", self.rules.len(), self.source)
    }
}

pub fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let catalog = RuleCatalog::load(&config.rules).context("Failed to load rule catalog")?;
    let rules = catalog
        .rules()
        .map(|rule| RuleRow {
            name: rule.name.clone(),
            intent: rule.intent.clone(),
            priority: rule.priority,
            action: rule.action.as_str(),
            urgency: rule.urgency.as_str().to_string(),
            confidence: rule.confidence,
            keywords: rule.keywords.clone(),
        })
        .collect();
    output(
        &RuleListOutput {
            source: config
                .rules
                .catalog_path
                .clone()
                .unwrap_or_else(|| "built-in catalog".to_string()),
            rules,
        },
        json_mode,
    );
    Ok(())
}
