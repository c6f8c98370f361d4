// crates/core/src/anticheat.rs
//! Anti-cheat analysis of a single answer.
//!
//! [`analyze`] is a pure function over the answer text, the question/answer
//! timestamps, and optional client activity metadata. It fires independent
//! signals (several can fire on one answer), sums fixed per-signal weights
//! into a risk score clamped to [0, 1], and decides whether the turn needs
//! human review. There is no shared mutable state, so concurrent calls for
//! different answers are safe.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::activity::ActivityLog;

/// Case-insensitive pattern for answers that disclose an AI author.
const AI_PATTERN: &str = "(?i)(as an ai|i am an ai|i'm an ai|artificial intelligence\
|machine learning model|as a language model|i cannot|i don't have)";

/// Hedging phrases; an answer containing more than
/// [`AnalyzerConfig::max_generic_phrases`] distinct ones is flagged generic.
const GENERIC_PHRASES: [&str; 6] = [
    "it depends",
    "generally speaking",
    "in most cases",
    "typically",
    "usually",
    "commonly",
];

fn ai_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(AI_PATTERN).expect("AI pattern compiles"))
}

/// Tunable thresholds and weights.
///
/// The values are carried over from production verbatim; they are heuristic
/// constants pending product-owner review, so they live here in one struct
/// rather than scattered through the scoring code.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Answers shorter than this many characters fire TOO_SHORT.
    pub min_answer_len: usize,
    /// Answers longer than this many characters fire TOO_LONG.
    pub max_answer_len: usize,
    /// Answers arriving faster than this fire SUSPICIOUS_RESPONSE_TIME.
    pub too_fast_ms: i64,
    /// Answers arriving slower than this fire LONG_DELAY.
    pub long_delay_ms: i64,
    /// More than this many distinct generic phrases fire TOO_GENERIC.
    pub max_generic_phrases: usize,
    /// More than this many tab switches fire EXCESSIVE_TAB_SWITCHES.
    pub max_tab_switches: u32,
    /// At least this many interruptions fire EXCESSIVE_INTERRUPTIONS.
    pub min_interruptions: u32,
    /// Risk score above which the turn always requires review.
    pub review_score_threshold: f64,
    /// Number of fired signals at which review is required regardless of score.
    pub review_signal_floor: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_answer_len: 20,
            max_answer_len: 5000,
            too_fast_ms: 2_000,
            long_delay_ms: 10_000,
            max_generic_phrases: 3,
            max_tab_switches: 5,
            min_interruptions: 3,
            review_score_threshold: 0.7,
            review_signal_floor: 3,
        }
    }
}

/// Named indicator that an answer may not be the candidate's own unaided
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    AiLanguageDetected,
    TooShort,
    TooLong,
    SuspiciousResponseTime,
    LongDelay,
    TooGeneric,
    ExcessiveTabSwitches,
    PasteDetected,
    ExcessiveInterruptions,
}

impl SignalKind {
    /// Fixed additive contribution to the risk score.
    pub fn weight(self) -> f64 {
        match self {
            SignalKind::AiLanguageDetected => 0.4,
            SignalKind::PasteDetected => 0.3,
            SignalKind::ExcessiveTabSwitches => 0.2,
            SignalKind::SuspiciousResponseTime => 0.2,
            SignalKind::ExcessiveInterruptions => 0.15,
            SignalKind::TooShort | SignalKind::TooLong => 0.1,
            SignalKind::LongDelay => 0.1,
            SignalKind::TooGeneric => 0.1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::AiLanguageDetected => "AI_LANGUAGE_DETECTED",
            SignalKind::TooShort => "TOO_SHORT",
            SignalKind::TooLong => "TOO_LONG",
            SignalKind::SuspiciousResponseTime => "SUSPICIOUS_RESPONSE_TIME",
            SignalKind::LongDelay => "LONG_DELAY",
            SignalKind::TooGeneric => "TOO_GENERIC",
            SignalKind::ExcessiveTabSwitches => "EXCESSIVE_TAB_SWITCHES",
            SignalKind::PasteDetected => "PASTE_DETECTED",
            SignalKind::ExcessiveInterruptions => "EXCESSIVE_INTERRUPTIONS",
        }
    }
}

/// One fired signal with its human-readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub kind: SignalKind,
    pub message: String,
}

/// Result of analyzing one answer. Ephemeral — the turn record persists only
/// the flag and the serialized details string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiCheatResult {
    pub signals: Vec<Signal>,
    pub risk_score: f64,
    pub requires_review: bool,
}

impl AntiCheatResult {
    pub fn has_signals(&self) -> bool {
        !self.signals.is_empty()
    }

    /// Serialized form stored on the turn: `KIND: message; KIND: message`.
    pub fn details(&self) -> String {
        self.signals
            .iter()
            .map(|s| format!("{}: {}", s.kind.as_str(), s.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Analyze one answer with the default configuration.
pub fn analyze(
    answer: &str,
    question_at_ms: i64,
    answer_at_ms: i64,
    activity: Option<&ActivityLog>,
) -> AntiCheatResult {
    analyze_with(
        &AnalyzerConfig::default(),
        answer,
        question_at_ms,
        answer_at_ms,
        activity,
    )
}

/// Analyze one answer against an explicit configuration.
pub fn analyze_with(
    config: &AnalyzerConfig,
    answer: &str,
    question_at_ms: i64,
    answer_at_ms: i64,
    activity: Option<&ActivityLog>,
) -> AntiCheatResult {
    let mut signals = Vec::new();
    let mut fire = |kind: SignalKind, message: String| {
        signals.push(Signal { kind, message });
    };

    if ai_pattern().is_match(answer) {
        fire(
            SignalKind::AiLanguageDetected,
            "Answer contains AI-related language".into(),
        );
    }

    let len = answer.chars().count();
    if len < config.min_answer_len {
        fire(SignalKind::TooShort, "Answer is too brief".into());
    } else if len > config.max_answer_len {
        fire(SignalKind::TooLong, "Answer is unusually long".into());
    }

    let delay_ms = answer_at_ms - question_at_ms;
    if delay_ms < config.too_fast_ms {
        fire(
            SignalKind::SuspiciousResponseTime,
            "Answer submitted too quickly".into(),
        );
    } else if delay_ms > config.long_delay_ms {
        fire(
            SignalKind::LongDelay,
            "Unusually long delay before answering".into(),
        );
    }

    let lower = answer.to_lowercase();
    let generic_count = GENERIC_PHRASES
        .iter()
        .filter(|phrase| lower.contains(*phrase))
        .count();
    if generic_count > config.max_generic_phrases {
        fire(
            SignalKind::TooGeneric,
            "Answer contains too many generic phrases".into(),
        );
    }

    if let Some(activity) = activity {
        if activity.tab_switches > config.max_tab_switches {
            fire(
                SignalKind::ExcessiveTabSwitches,
                format!("Multiple tab switches detected: {}", activity.tab_switches),
            );
        }
        if activity.paste_detected {
            fire(SignalKind::PasteDetected, "Paste operation detected".into());
        }
        if activity.interruptions >= config.min_interruptions {
            fire(
                SignalKind::ExcessiveInterruptions,
                format!("Excessive interruptions: {}", activity.interruptions),
            );
        }
    }

    let weighted: f64 = signals.iter().map(|s| s.kind.weight()).sum();
    let risk_score = weighted.clamp(0.0, 1.0);
    let requires_review = risk_score > config.review_score_threshold
        || signals.len() >= config.review_signal_floor;

    AntiCheatResult {
        signals,
        risk_score,
        requires_review,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(result: &AntiCheatResult) -> Vec<SignalKind> {
        result.signals.iter().map(|s| s.kind).collect()
    }

    /// A competent answer: long enough, timely, no hedging.
    const CLEAN_ANSWER: &str = "I would profile the query first, then add an index on the \
                                join column and verify the plan changed before shipping.";

    #[test]
    fn test_clean_answer_has_no_signals() {
        let result = analyze(CLEAN_ANSWER, 0, 5_000, None);
        assert!(!result.has_signals());
        assert_eq!(result.risk_score, 0.0);
        assert!(!result.requires_review);
        assert_eq!(result.details(), "");
    }

    #[test]
    fn test_ai_language_detected_case_insensitive() {
        let result = analyze(
            "As An AI language model I would suggest checking the documentation first.",
            0,
            5_000,
            None,
        );
        assert!(kinds(&result).contains(&SignalKind::AiLanguageDetected));
    }

    #[test]
    fn test_too_short_and_too_long_are_exclusive() {
        let short = analyze("yes", 0, 5_000, None);
        assert!(kinds(&short).contains(&SignalKind::TooShort));
        assert!(!kinds(&short).contains(&SignalKind::TooLong));

        let long = analyze(&"a ".repeat(3000), 0, 5_000, None);
        assert!(kinds(&long).contains(&SignalKind::TooLong));
        assert!(!kinds(&long).contains(&SignalKind::TooShort));
    }

    #[test]
    fn test_timing_boundaries() {
        // 1999ms is too fast, 2000ms is fine.
        assert!(kinds(&analyze(CLEAN_ANSWER, 0, 1_999, None))
            .contains(&SignalKind::SuspiciousResponseTime));
        assert!(!analyze(CLEAN_ANSWER, 0, 2_000, None).has_signals());

        // 10000ms is fine, 10001ms is a long delay.
        assert!(!analyze(CLEAN_ANSWER, 0, 10_000, None).has_signals());
        assert!(kinds(&analyze(CLEAN_ANSWER, 0, 10_001, None)).contains(&SignalKind::LongDelay));
    }

    #[test]
    fn test_generic_phrases_need_more_than_three_distinct() {
        // Exactly 3 distinct phrases: not flagged.
        let three = "Well, it depends on context. Generally speaking this is true, \
                     and typically you would measure first.";
        assert!(!kinds(&analyze(three, 0, 5_000, None)).contains(&SignalKind::TooGeneric));

        // 4 distinct phrases: flagged.
        let four = "It depends; generally speaking, typically and usually you would \
                    want to measure the workload before deciding anything here.";
        assert!(kinds(&analyze(four, 0, 5_000, None)).contains(&SignalKind::TooGeneric));
    }

    #[test]
    fn test_activity_signals() {
        let activity = ActivityLog {
            tab_switches: 6,
            paste_detected: true,
            interruptions: 3,
        };
        let result = analyze(CLEAN_ANSWER, 0, 5_000, Some(&activity));
        let k = kinds(&result);
        assert!(k.contains(&SignalKind::ExcessiveTabSwitches));
        assert!(k.contains(&SignalKind::PasteDetected));
        assert!(k.contains(&SignalKind::ExcessiveInterruptions));
        // Tab-switch message carries the observed count.
        assert!(result.details().contains("tab switches detected: 6"));
    }

    #[test]
    fn test_activity_below_thresholds_is_silent() {
        let activity = ActivityLog {
            tab_switches: 5,
            paste_detected: false,
            interruptions: 2,
        };
        assert!(!analyze(CLEAN_ANSWER, 0, 5_000, Some(&activity)).has_signals());
    }

    #[test]
    fn test_score_clamped_to_one() {
        // AI (0.4) + paste (0.3) + tab switches (0.2) + too fast (0.2) = 1.1
        // weighted, reported as exactly 1.0.
        let activity = ActivityLog {
            tab_switches: 10,
            paste_detected: true,
            interruptions: 0,
        };
        let result = analyze(
            "As an AI language model I can explain this topic in however much depth you need.",
            0,
            500,
            Some(&activity),
        );
        let k = kinds(&result);
        assert!(k.contains(&SignalKind::AiLanguageDetected));
        assert!(k.contains(&SignalKind::PasteDetected));
        assert!(k.contains(&SignalKind::ExcessiveTabSwitches));
        assert!(k.contains(&SignalKind::SuspiciousResponseTime));
        assert_eq!(result.risk_score, 1.0);
        assert!(result.requires_review);
    }

    #[test]
    fn test_score_monotone_in_signals() {
        let base = analyze(CLEAN_ANSWER, 0, 1_000, None); // too fast only
        let more = analyze(
            CLEAN_ANSWER,
            0,
            1_000,
            Some(&ActivityLog {
                paste_detected: true,
                ..Default::default()
            }),
        );
        assert!(more.risk_score > base.risk_score);
        assert!(more.risk_score <= 1.0);
    }

    #[test]
    fn test_three_signals_require_review_even_with_low_score() {
        // long delay (0.1) + too generic (0.1) + interruptions (0.15) = 0.35,
        // but 3 distinct signals force review.
        let answer = "it depends, usually it varies, typically and commonly both apply";
        let activity = ActivityLog {
            interruptions: 3,
            ..Default::default()
        };
        let result = analyze(answer, 0, 20_000, Some(&activity));
        assert_eq!(result.signals.len(), 3, "{:?}", kinds(&result));
        assert!(result.risk_score <= 0.7);
        assert!(result.requires_review);
    }

    #[test]
    fn test_disclosed_ai_hedging_fast_answer_scenario() {
        let answer =
            "As an AI language model, it depends, generally speaking, typically, usually this varies";
        let result = analyze(answer, 0, 1_000, None);
        let k = kinds(&result);
        assert!(k.contains(&SignalKind::AiLanguageDetected));
        assert!(k.contains(&SignalKind::SuspiciousResponseTime));
        assert!(k.contains(&SignalKind::TooGeneric));
        assert!(result.requires_review);
    }

    #[test]
    fn test_details_serialization() {
        let result = analyze("ok", 0, 500, None);
        let details = result.details();
        assert!(details.contains("TOO_SHORT: Answer is too brief"));
        assert!(details.contains("; SUSPICIOUS_RESPONSE_TIME: "));
    }

    #[test]
    fn test_explicit_config_is_honored() {
        let config = AnalyzerConfig {
            min_answer_len: 1,
            too_fast_ms: 0,
            ..Default::default()
        };
        let result = analyze_with(&config, "ok", 0, 500, None);
        assert!(!result.has_signals());
    }
}
