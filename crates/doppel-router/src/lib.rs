// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic style routing.
//!
//! Classifies a message into a persona style using keyword-rule scoring.
//! Zero cost, zero latency, no learning, no external calls: a manual
//! override wins outright, otherwise each rule's keywords are counted
//! against the lowercased text and the confidence gate decides between the
//! winner and the fallback style.

use std::collections::HashSet;

use doppel_config::model::{RouterConfig, StyleConfig};
use tracing::debug;

/// Why a style was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    ManualOverride,
    RuleMatch,
    LowConfidence,
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionReason::ManualOverride => write!(f, "manual_override"),
            DecisionReason::RuleMatch => write!(f, "rule_match"),
            DecisionReason::LowConfidence => write!(f, "low_confidence"),
        }
    }
}

/// Result of routing a message to a style.
#[derive(Debug, Clone)]
pub struct StyleDecision {
    pub style_id: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub reason: DecisionReason,
    pub manual: bool,
}

/// One scoring rule: a style id and the keywords that vote for it.
///
/// Rules are evaluated in declaration order, and only a strictly greater
/// score replaces the running best -- equal scores keep the earlier-declared
/// style. That tie-break is part of the contract, not an iteration accident.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub style_id: String,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(style_id: &str, keywords: &[&str]) -> Self {
        Self {
            style_id: style_id.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// The shipped rule table, matching the four default personas.
pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "techie",
            &["debug", "代码", "bug", "算法", "deploy", "api", "server"],
        ),
        KeywordRule::new(
            "warm",
            &["谢谢", "辛苦", "开心", "抱抱", "love", "困", "emo"],
        ),
        KeywordRule::new(
            "snark",
            &["无语", "离谱", "真的假的", "吐槽", "？", "??", "lol"],
        ),
        KeywordRule::new(
            "formal",
            &["请", "麻烦", "安排", "文档", "确认", "合同", "报告", "通知"],
        ),
    ]
}

/// Deterministic, stateless style classifier.
pub struct StyleRouter {
    config: RouterConfig,
    rules: Vec<KeywordRule>,
    known_styles: HashSet<String>,
}

impl StyleRouter {
    /// Build a router over the configured styles with the shipped rule table.
    pub fn new(config: RouterConfig, styles: &[StyleConfig]) -> Self {
        Self::with_rules(config, styles, default_rules())
    }

    /// Build a router with a custom rule table (scoring is pluggable; the
    /// dispatcher never sees the rules).
    pub fn with_rules(
        config: RouterConfig,
        styles: &[StyleConfig],
        rules: Vec<KeywordRule>,
    ) -> Self {
        let known_styles = styles.iter().map(|s| s.id.clone()).collect();
        Self {
            config,
            rules,
            known_styles,
        }
    }

    /// Choose a style for `content`.
    ///
    /// A manual override naming a known style wins with confidence 1.0.
    /// Otherwise the best-scoring rule wins; `confidence = min(1.0,
    /// 0.2 + 0.2 * best_score)`. Below the threshold, or when the winner is
    /// not a configured style, the fallback style is substituted.
    pub fn decide(&self, content: &str, manual_style: Option<&str>) -> StyleDecision {
        if let Some(manual) = manual_style
            && self.known_styles.contains(manual)
        {
            return StyleDecision {
                style_id: manual.to_string(),
                confidence: 1.0,
                reason: DecisionReason::ManualOverride,
                manual: true,
            };
        }

        let text = content.to_lowercase();
        let mut best_style = self.config.default_style.as_str();
        let mut best_score = 0usize;
        for rule in &self.rules {
            let score = rule
                .keywords
                .iter()
                .filter(|kw| text.contains(kw.as_str()))
                .count();
            if score > best_score {
                best_score = score;
                best_style = rule.style_id.as_str();
            }
        }

        let mut confidence = (0.2 + 0.2 * best_score as f64).min(1.0);
        debug!(best_style, best_score, confidence, "style scored");

        if confidence < self.config.confidence_threshold {
            return StyleDecision {
                style_id: self.config.fallback_style.clone(),
                confidence,
                reason: DecisionReason::LowConfidence,
                manual: false,
            };
        }

        let style_id = if self.known_styles.contains(best_style) {
            best_style.to_string()
        } else {
            confidence = 0.2;
            self.config.fallback_style.clone()
        };

        StyleDecision {
            style_id,
            confidence,
            reason: DecisionReason::RuleMatch,
            manual: false,
        }
    }
}
