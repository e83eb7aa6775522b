//! `provost classify`: run the rule engine on one message.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::application::bootstrap::build_engine;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{Config, IntentDecision};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Message to classify
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub text: String,
    pub decision: IntentDecision,
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        let d = &self.decision;
        let mut lines = vec![
            format!("Intent:     {}", d.intent),
            format!("Action:     {}", d.action),
            format!("Confidence: {:.2}", d.confidence),
            format!("Urgency:    {} ({:.2})", d.urgency.as_str(), d.urgency_confidence),
        ];
        if let (Some(rule), Some(keyword)) = (&d.matched_rule_name, &d.matched_keyword) {
            lines.push(format!("Matched:    {rule} on \"{keyword}\""));
        }

        if !d.alternative_matches.is_empty() {
            let mut table = list_table(&["rule", "intent", "priority", "confidence", "keyword"]);
            for alt in &d.alternative_matches {
                table.add_row(vec![
                    alt.rule_name.clone(),
                    alt.intent.clone(),
                    alt.priority.to_string(),
                    format!("{:.2}", alt.confidence),
                    alt.matched_keyword.clone(),
                ]);
            }
            lines.push(format!("\nAlternatives:\n{table}"));
        }
        lines.join("\n")
    }
}

pub fn execute(args: ClassifyArgs, config: &Config, json_mode: bool) -> Result<()> {
    let engine = build_engine(config)?;
    let decision = engine.evaluate(&args.text);
    output(
        &ClassifyOutput {
            text: args.text,
            decision,
        },
        json_mode,
    );
    Ok(())
}
