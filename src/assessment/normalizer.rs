// src/assessment/normalizer.rs

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::models::question::{MatchItem, MatchingKey, QuestionBody, SubQuestionKind};

/// One "A-2" / "B: 1" / "C = Paris" entry of a string-encoded matching answer.
static MATCH_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z]+)\s*[-:=]\s*(.+?)\s*$").expect("valid matching entry regex")
});

/// A submitted answer in the shape of the stored canonical answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedAnswer {
    /// CLOSED_ENDED: the chosen option text or image reference.
    Choice(String),
    /// MATCHING: left label to 1-based right ordinal.
    Matching(MatchingKey),
    /// TEXT_ANALYSIS / MAP_ANALYSIS, index-aligned with the sub-questions.
    /// `None` marks a part that was skipped or could not be read.
    Parts(Vec<Option<NormalizedAnswer>>),
    /// Left for a human grader.
    HumanGraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("expected the chosen option as a string")]
    ExpectedChoice,
    #[error("expected an object or 'A-1, B-2' string for a matching answer")]
    ExpectedMatching,
    #[error("'{0}' is not a valid left item label")]
    BadLabel(String),
    #[error("left item {0} is answered more than once")]
    DuplicateLabel(String),
    #[error("'{0}' does not name a right item")]
    UnknownRightItem(String),
    #[error("expected a list of sub-answers")]
    ExpectedParts,
}

/// Canonicalizes a raw answer against the question it answers.
pub fn normalize(body: &QuestionBody, raw: &Value) -> Result<NormalizedAnswer, NormalizeError> {
    match body {
        QuestionBody::ClosedEnded { .. } => choice(raw),
        QuestionBody::Matching { right, .. } => matching(raw, right).map(NormalizedAnswer::Matching),
        QuestionBody::TextAnalysis { sub_questions } | QuestionBody::MapAnalysis { sub_questions } => {
            let raw_parts = split_parts(raw, sub_questions.len())?;
            let parts = sub_questions
                .iter()
                .zip(raw_parts)
                .map(|(sub, raw)| match (&sub.kind, raw) {
                    (SubQuestionKind::OpenEnded, _) => Some(NormalizedAnswer::HumanGraded),
                    (SubQuestionKind::ClosedEnded { .. }, Some(raw)) => choice(raw).ok(),
                    (SubQuestionKind::ClosedEnded { .. }, None) => None,
                })
                .collect();
            Ok(NormalizedAnswer::Parts(parts))
        }
        QuestionBody::OpenEnded { .. } => Ok(NormalizedAnswer::HumanGraded),
    }
}

/// Option text is compared verbatim apart from surrounding whitespace.
fn choice(raw: &Value) -> Result<NormalizedAnswer, NormalizeError> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => Ok(NormalizedAnswer::Choice(s.trim().to_string())),
        _ => Err(NormalizeError::ExpectedChoice),
    }
}

/// Accepts `{"A": "2", "b": 1}` as well as `"A-2, B-1"`. Right items may be
/// named by 1-based ordinal or by their text/image value.
pub fn matching(raw: &Value, right: &[MatchItem]) -> Result<MatchingKey, NormalizeError> {
    let entries: Vec<(String, Value)> = match raw {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::String(s) => s
            .split([',', ';', '\n'])
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| {
                MATCH_ENTRY
                    .captures(entry)
                    .map(|caps| (caps[1].to_string(), Value::String(caps[2].to_string())))
                    .ok_or(NormalizeError::ExpectedMatching)
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(NormalizeError::ExpectedMatching),
    };

    let mut key = BTreeMap::new();
    for (label, value) in entries {
        let label = normalize_label(&label)?;
        let ordinal = resolve_right(&value, right)?;
        if key.insert(label.clone(), ordinal).is_some() {
            return Err(NormalizeError::DuplicateLabel(label));
        }
    }
    Ok(MatchingKey(key))
}

fn normalize_label(label: &str) -> Result<String, NormalizeError> {
    let trimmed = label.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(NormalizeError::BadLabel(label.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Numbers in `1..=right.len()` are ordinals; anything else is looked up by value.
/// Validation keeps numeric right items at their own position, so both readings agree.
fn resolve_right(value: &Value, right: &[MatchItem]) -> Result<u32, NormalizeError> {
    let in_range = |n: u64| (1..=right.len() as u64).contains(&n).then_some(n as u32);

    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(in_range)
            .ok_or_else(|| NormalizeError::UnknownRightItem(n.to_string())),
        Value::String(s) => {
            let wanted = s.trim();
            if let Some(ordinal) = wanted.parse::<u64>().ok().and_then(in_range) {
                return Ok(ordinal);
            }
            right
                .iter()
                .position(|item| item.key() == Some(wanted))
                .map(|i| i as u32 + 1)
                .ok_or_else(|| NormalizeError::UnknownRightItem(wanted.to_string()))
        }
        other => Err(NormalizeError::UnknownRightItem(other.to_string())),
    }
}

/// Index-aligned sub-answers from a JSON array or an object keyed by 1-based index.
fn split_parts(raw: &Value, count: usize) -> Result<Vec<Option<&Value>>, NormalizeError> {
    match raw {
        Value::Array(items) => Ok((0..count)
            .map(|i| items.get(i).filter(|v| !v.is_null()))
            .collect()),
        Value::Object(map) => Ok((1..=count)
            .map(|i| map.get(&i.to_string()).filter(|v| !v.is_null()))
            .collect()),
        _ => Err(NormalizeError::ExpectedParts),
    }
}
