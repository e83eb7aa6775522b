//! Property-based tests for heuristic intent resolution
//!
//! Uses proptest to check ranking and determinism over generated rules and
//! input text.

use std::sync::Arc;

use proptest::prelude::*;
use provost::domain::models::HeuristicRule;
use provost::services::{HeuristicRuleEngine, RuleCatalog};

fn builtin_engine() -> HeuristicRuleEngine {
    HeuristicRuleEngine::new(Arc::new(RuleCatalog::builtin().unwrap()))
}

fn two_rule_engine(first: (i32, f64), second: (i32, f64)) -> HeuristicRuleEngine {
    let rules = vec![
        HeuristicRule::new("first", "alpha", first.0, &["alpha"], first.1),
        HeuristicRule::new("second", "beta", second.0, &["beta"], second.1),
    ];
    HeuristicRuleEngine::new(Arc::new(RuleCatalog::from_rules(rules).unwrap()))
}

fn district_words() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "show", "students", "staff", "attendance", "bus", "fight", "create", "student",
            "budget", "the", "for", "withdrawn", "absent", "teachers", "route", "today",
        ]),
        0..8,
    )
    .prop_map(|words| words.join(" "))
}

proptest! {
    /// The same text always resolves to the same decision.
    #[test]
    fn prop_evaluation_is_deterministic(text in district_words()) {
        let engine = builtin_engine();
        prop_assert_eq!(engine.evaluate(&text), engine.evaluate(&text));
    }

    /// Surrounding whitespace and letter case never change the decision.
    #[test]
    fn prop_case_and_padding_are_ignored(text in district_words()) {
        let engine = builtin_engine();
        let padded = format!("  {}\t", text.to_uppercase());
        prop_assert_eq!(engine.evaluate(&text), engine.evaluate(&padded));
    }

    /// Lower priority wins, then higher confidence, then declaration order.
    #[test]
    fn prop_winner_follows_ranking(
        first_priority in 0i32..5,
        second_priority in 0i32..5,
        first_confidence in prop::sample::select(vec![0.5, 0.7, 0.9]),
        second_confidence in prop::sample::select(vec![0.5, 0.7, 0.9]),
    ) {
        let engine = two_rule_engine(
            (first_priority, first_confidence),
            (second_priority, second_confidence),
        );
        let decision = engine.evaluate("beta then alpha");

        let expected = if first_priority != second_priority {
            if first_priority < second_priority { "alpha" } else { "beta" }
        } else if (first_confidence - second_confidence).abs() > f64::EPSILON {
            if first_confidence > second_confidence { "alpha" } else { "beta" }
        } else {
            "alpha"
        };
        prop_assert_eq!(decision.intent.as_str(), expected);
        prop_assert_eq!(decision.alternative_matches.len(), 1);
        prop_assert_ne!(decision.alternative_matches[0].intent.as_str(), expected);
    }

    /// Text that fires no rule is the unknown intent with zero confidence.
    #[test]
    fn prop_unmatched_text_is_unknown(text in "[0-9 ]{0,24}") {
        let decision = builtin_engine().evaluate(&text);
        prop_assert!(decision.is_unknown());
        prop_assert!(decision.confidence.abs() < f64::EPSILON);
        prop_assert!(decision.alternative_matches.is_empty());
        prop_assert!(decision.matched_rule_name.is_none());
    }

    /// Every fired rule is reported exactly once, winner first.
    #[test]
    fn prop_alternatives_exclude_winner(text in district_words()) {
        let engine = builtin_engine();
        let decision = engine.evaluate(&text);
        let candidates = engine.candidates(&text);
        prop_assert_eq!(candidates.len(), if decision.is_unknown() { 0 } else { decision.alternative_matches.len() + 1 });
        if let Some(winner) = decision.matched_rule_name.as_deref() {
            prop_assert!(decision.alternative_matches.iter().all(|m| m.rule_name != winner));
        }
    }
}

#[test]
fn test_word_boundaries_block_partial_words() {
    let engine = builtin_engine();
    // "busy" must not fire the "bus" keyword.
    assert!(engine.evaluate("a busy afternoon").is_unknown());
    assert_eq!(engine.evaluate("the late bus").intent, "transportation");
}

#[tokio::test]
async fn test_shared_engine_is_deterministic_across_tasks() {
    let engine = Arc::new(builtin_engine());
    let inputs = [
        "show students",
        "attendance for students and staff",
        "please create student record for Ana Lopez",
        "there was a fight near the gym",
        "what is the dress code?",
    ];
    let expected: Vec<_> = inputs.iter().map(|text| engine.evaluate(text)).collect();

    let tasks = (0..16).map(|_| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            (0..50)
                .map(|_| inputs.iter().map(|text| engine.evaluate(text)).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        })
    });

    for runs in futures::future::join_all(tasks).await {
        for decisions in runs.unwrap() {
            assert_eq!(decisions, expected);
        }
    }
}
