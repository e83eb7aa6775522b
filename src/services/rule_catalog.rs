//! Rule catalog: the static set of heuristic rules loaded at startup.
//!
//! Malformed rules are rejected here, at load time, so evaluation never
//! has to fail.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::models::{HeuristicRule, RulesConfig, UNKNOWN_INTENT};

const BUILTIN_CATALOG: &str = include_str!("../../rules/default.yaml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read rule catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Rule name cannot be empty")]
    EmptyName,

    #[error("Duplicate rule name: {0}")]
    DuplicateName(String),

    #[error("Rule '{0}' has no keywords")]
    EmptyKeywords(String),

    #[error("Rule '{0}' has a blank keyword")]
    BlankKeyword(String),

    #[error("Rule '{0}' has an empty intent")]
    EmptyIntent(String),

    #[error("Rule '{0}' targets the reserved intent 'unknown'")]
    ReservedIntent(String),

    #[error("Rule '{rule}' has {field} {value} outside 0..=1")]
    OutOfRange {
        rule: String,
        field: &'static str,
        value: f64,
    },

    #[error("Invalid keyword pattern in rule '{rule}': {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    rules: Vec<HeuristicRule>,
}

#[derive(Debug)]
enum KeywordMatcher {
    Boundary { keyword: String, pattern: Regex },
    Substring(String),
}

impl KeywordMatcher {
    fn keyword(&self) -> &str {
        match self {
            Self::Boundary { keyword, .. } | Self::Substring(keyword) => keyword,
        }
    }

    fn is_match(&self, normalized: &str) -> bool {
        match self {
            Self::Boundary { pattern, .. } => pattern.is_match(normalized),
            Self::Substring(keyword) => normalized.contains(keyword.as_str()),
        }
    }
}

/// A validated rule with its keyword matchers built.
#[derive(Debug)]
pub struct CompiledRule {
    pub rule: HeuristicRule,
    /// Position in the catalog; final tie-break.
    pub declaration_index: usize,
    matchers: Vec<KeywordMatcher>,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-word pattern for a keyword. `\b` only holds next to a word
/// character, so edges like the `#` in `c#` use a non-word/end anchor.
fn boundary_pattern(keyword: &str) -> String {
    let starts_word = keyword.chars().next().is_some_and(is_word_char);
    let ends_word = keyword.chars().last().is_some_and(is_word_char);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { r"(?:^|\W)" },
        regex::escape(keyword),
        if ends_word { r"\b" } else { r"(?:\W|$)" },
    )
}

impl CompiledRule {
    fn compile(rule: HeuristicRule, declaration_index: usize) -> Result<Self, CatalogError> {
        let mut matchers = Vec::with_capacity(rule.keywords.len());
        for raw in &rule.keywords {
            let keyword = raw.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(CatalogError::BlankKeyword(rule.name.clone()));
            }
            let matcher = if rule.word_boundary {
                let pattern = Regex::new(&boundary_pattern(&keyword)).map_err(
                    |source| CatalogError::Pattern {
                        rule: rule.name.clone(),
                        source,
                    },
                )?;
                KeywordMatcher::Boundary { keyword, pattern }
            } else {
                KeywordMatcher::Substring(keyword)
            };
            matchers.push(matcher);
        }

        Ok(Self {
            rule,
            declaration_index,
            matchers,
        })
    }

    /// First keyword (in declaration order) found in already-normalized text.
    pub fn first_match(&self, normalized: &str) -> Option<&str> {
        self.matchers
            .iter()
            .find(|m| m.is_match(normalized))
            .map(KeywordMatcher::keyword)
    }
}

/// Immutable, validated rule set shared by every request.
#[derive(Debug)]
pub struct RuleCatalog {
    rules: Vec<CompiledRule>,
}

impl RuleCatalog {
    /// Validate and compile rules, keeping their declaration order.
    pub fn from_rules(rules: Vec<HeuristicRule>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for (index, rule) in rules.into_iter().enumerate() {
            validate_rule(&rule)?;
            if !seen.insert(rule.name.clone()) {
                return Err(CatalogError::DuplicateName(rule.name));
            }
            compiled.push(CompiledRule::compile(rule, index)?);
        }

        Ok(Self { rules: compiled })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::from_rules(file.rules)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    pub fn load(config: &RulesConfig) -> Result<Self, CatalogError> {
        let catalog = match &config.catalog_path {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin()?,
        };
        tracing::info!(
            rules = catalog.len(),
            source = config.catalog_path.as_deref().unwrap_or("builtin"),
            "rule catalog loaded"
        );
        Ok(catalog)
    }

    pub fn compiled(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn rules(&self) -> impl Iterator<Item = &HeuristicRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn get(&self, name: &str) -> Option<&HeuristicRule> {
        self.rules().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn validate_rule(rule: &HeuristicRule) -> Result<(), CatalogError> {
    if rule.name.trim().is_empty() {
        return Err(CatalogError::EmptyName);
    }
    let intent = rule.intent.trim();
    if intent.is_empty() {
        return Err(CatalogError::EmptyIntent(rule.name.clone()));
    }
    if intent.eq_ignore_ascii_case(UNKNOWN_INTENT) {
        return Err(CatalogError::ReservedIntent(rule.name.clone()));
    }
    if rule.keywords.is_empty() {
        return Err(CatalogError::EmptyKeywords(rule.name.clone()));
    }
    for (field, value) in [
        ("confidence", rule.confidence),
        ("urgency_confidence", rule.urgency_confidence),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(CatalogError::OutOfRange {
                rule: rule.name.clone(),
                field,
                value,
            });
        }
    }
    Ok(())
}
