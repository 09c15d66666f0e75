// src/assessment/scorer.rs

use serde::Serialize;
use serde_json::Value;

use super::{
    error::ScoringInconsistency,
    normalizer::{NormalizeError, NormalizedAnswer, normalize},
};
use crate::models::question::{
    MatchingKey, NewQuestion, Question, QuestionBody, SubQuestion, SubQuestionKind,
};

/// Outcome of automatic scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Score {
    /// Final points decided without a human.
    Awarded { points: i32, is_correct: bool },
    /// Waiting for a teacher. `provisional` carries what auto-scored parts
    /// already earned; it is `None` when nothing could be scored.
    Pending { provisional: Option<i32> },
}

impl Score {
    pub fn points(&self) -> Option<i32> {
        match self {
            Score::Awarded { points, .. } => Some(*points),
            Score::Pending { provisional } => *provisional,
        }
    }

    pub fn is_correct(&self) -> Option<bool> {
        match self {
            Score::Awarded { is_correct, .. } => Some(*is_correct),
            Score::Pending { .. } => None,
        }
    }

    pub fn needs_review(&self) -> bool {
        matches!(self, Score::Pending { .. })
    }
}

/// Full scoring result for one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub score: Score,
    /// Per sub-question points for multi-part questions; `None` entries await a human.
    pub parts: Option<Vec<Option<i32>>>,
    pub inconsistency: Option<ScoringInconsistency>,
}

impl Scored {
    fn single(score: Score) -> Self {
        Self {
            score,
            parts: None,
            inconsistency: None,
        }
    }
}

/// What the scorer needs to know about a stored question.
#[derive(Debug, Clone, Copy)]
pub struct AnswerKey<'a> {
    pub question_id: Option<i64>,
    pub points: i32,
    pub is_auto_scored: bool,
    pub body: &'a QuestionBody,
}

impl<'a> From<&'a Question> for AnswerKey<'a> {
    fn from(question: &'a Question) -> Self {
        Self {
            question_id: Some(question.id),
            points: question.points,
            is_auto_scored: question.is_auto_scored,
            body: &question.body.0,
        }
    }
}

impl<'a> From<&'a NewQuestion> for AnswerKey<'a> {
    fn from(question: &'a NewQuestion) -> Self {
        Self {
            question_id: None,
            points: question.points,
            is_auto_scored: question.is_auto_scored,
            body: &question.body,
        }
    }
}

/// Normalizes and scores a raw submission.
pub fn score<'a>(key: impl Into<AnswerKey<'a>>, raw: &Value) -> Scored {
    let key = key.into();
    let normalized = normalize(key.body, raw);
    if let Err(e) = &normalized {
        tracing::debug!(question_id = ?key.question_id, "Unreadable answer scored as wrong: {}", e);
    }
    score_normalized(key, normalized)
}

/// Scores an already normalized answer. Unreadable answers earn nothing.
pub fn score_normalized(
    key: AnswerKey<'_>,
    answer: Result<NormalizedAnswer, NormalizeError>,
) -> Scored {
    let answer = answer.ok();

    if let Some(sub_questions) = key.body.sub_questions() {
        return score_parts(key, sub_questions, answer);
    }

    if !key.is_auto_scored {
        return Scored::single(Score::Pending { provisional: None });
    }

    match key.body {
        QuestionBody::ClosedEnded { correct_answer, .. } => {
            let Some(expected) = correct_answer else {
                return inconsistent(key.question_id, None);
            };
            let is_correct = matches!(&answer, Some(NormalizedAnswer::Choice(given)) if given == expected);
            Scored::single(Score::Awarded {
                points: if is_correct { key.points } else { 0 },
                is_correct,
            })
        }
        QuestionBody::Matching { correct_answer, .. } => {
            if correct_answer.is_empty() {
                return inconsistent(key.question_id, None);
            }
            let given = match &answer {
                Some(NormalizedAnswer::Matching(given)) => Some(given),
                _ => None,
            };
            Scored::single(matching_score(key.points, correct_answer, given))
        }
        _ => Scored::single(Score::Pending { provisional: None }),
    }
}

/// Per-pair credit: `floor(points * correct_pairs / total_pairs)`.
pub fn matching_score(points: i32, expected: &MatchingKey, given: Option<&MatchingKey>) -> Score {
    let total = expected.len() as i32;
    let correct = given.map_or(0, |given| {
        expected
            .0
            .iter()
            .filter(|(label, ordinal)| given.get(label) == Some(**ordinal))
            .count() as i32
    });
    Score::Awarded {
        points: if total == 0 { 0 } else { points * correct / total },
        is_correct: total > 0 && correct == total,
    }
}

fn score_parts(
    key: AnswerKey<'_>,
    sub_questions: &[SubQuestion],
    answer: Option<NormalizedAnswer>,
) -> Scored {
    let given = match answer {
        Some(NormalizedAnswer::Parts(parts)) => parts,
        _ => Vec::new(),
    };

    let mut inconsistency = None;
    let parts: Vec<Option<i32>> = sub_questions
        .iter()
        .enumerate()
        .map(|(i, sub)| {
            if !key.is_auto_scored || !sub.is_auto_scored {
                return None;
            }
            match &sub.kind {
                SubQuestionKind::OpenEnded => None,
                SubQuestionKind::ClosedEnded {
                    correct_answer: None,
                    ..
                } => {
                    let found = report(key.question_id, Some(i + 1));
                    inconsistency.get_or_insert(found);
                    Some(0)
                }
                SubQuestionKind::ClosedEnded {
                    correct_answer: Some(expected),
                    ..
                } => {
                    let hit = matches!(given.get(i), Some(Some(NormalizedAnswer::Choice(c))) if c == expected);
                    Some(if hit { sub.points } else { 0 })
                }
            }
        })
        .collect();

    let earned: i32 = parts.iter().flatten().sum();
    let score = if parts.iter().any(Option::is_none) {
        Score::Pending {
            provisional: Some(earned),
        }
    } else {
        let full = sub_questions.iter().map(|s| s.points).sum::<i32>();
        Score::Awarded {
            points: earned,
            is_correct: earned == full,
        }
    };

    Scored {
        score,
        parts: Some(parts),
        inconsistency,
    }
}

fn report(question_id: Option<i64>, part: Option<usize>) -> ScoringInconsistency {
    let inconsistency = ScoringInconsistency { question_id, part };
    tracing::warn!(
        question_id = ?question_id,
        part = ?part,
        "Scoring inconsistency: {}; awarding 0",
        inconsistency
    );
    inconsistency
}

fn inconsistent(question_id: Option<i64>, part: Option<usize>) -> Scored {
    Scored {
        score: Score::Awarded {
            points: 0,
            is_correct: false,
        },
        parts: None,
        inconsistency: Some(report(question_id, part)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::validator::{generate_correct_answer, validate};
    use crate::models::question::{ChoiceOptions, CreateQuestionRequest, MatchItem, PublicBody};
    use serde_json::json;

    fn closed(answer: Option<&str>) -> QuestionBody {
        QuestionBody::ClosedEnded {
            options: ChoiceOptions::Text(vec!["A".into(), "B".into(), "C".into()]),
            correct_answer: answer.map(str::to_string),
        }
    }

    fn key(body: &QuestionBody, points: i32) -> AnswerKey<'_> {
        AnswerKey {
            question_id: Some(1),
            points,
            is_auto_scored: true,
            body,
        }
    }

    #[test]
    fn closed_ended_is_exact_match() {
        let body = closed(Some("B"));
        assert_eq!(
            score(key(&body, 4), &json!("B")).score,
            Score::Awarded {
                points: 4,
                is_correct: true
            }
        );
        assert_eq!(
            score(key(&body, 4), &json!("b")).score,
            Score::Awarded {
                points: 0,
                is_correct: false
            }
        );
        // Unreadable answers are wrong, not errors.
        assert_eq!(score(key(&body, 4), &json!({"x": 1})).score.points(), Some(0));
    }

    #[test]
    fn e2e_capital_of_france() {
        let payload: CreateQuestionRequest = serde_json::from_value(json!({
            "text": "Capital of France?",
            "type": "CLOSED_ENDED",
            "options": ["Paris", "Lyon"],
            "correctAnswer": "Paris",
            "points": 5,
            "subjectId": "geo1",
            "grade": 9,
            "round": 1,
            "isAutoScored": true
        }))
        .unwrap();
        let question = validate(&payload).unwrap();
        assert_eq!(score(&question, &json!("Paris")).score.points(), Some(5));
        assert_eq!(score(&question, &json!("Lyon")).score.points(), Some(0));
    }

    #[test]
    fn missing_canonical_answer_fails_closed() {
        let body = closed(None);
        let scored = score(key(&body, 4), &json!("B"));
        assert_eq!(
            scored.score,
            Score::Awarded {
                points: 0,
                is_correct: false
            }
        );
        assert_eq!(
            scored.inconsistency,
            Some(ScoringInconsistency {
                question_id: Some(1),
                part: None
            })
        );
    }

    #[test]
    fn human_graded_questions_are_pending() {
        let body = QuestionBody::OpenEnded {
            answer_template: None,
        };
        let scored = score(key(&body, 6), &json!("essay"));
        assert_eq!(scored.score, Score::Pending { provisional: None });
        assert_eq!(scored.score.points(), None);

        let body = closed(Some("A"));
        let manual = AnswerKey {
            is_auto_scored: false,
            ..key(&body, 3)
        };
        assert!(score(manual, &json!("A")).score.needs_review());
    }

    fn matching_body() -> QuestionBody {
        let items = |values: &[&str]| -> Vec<MatchItem> {
            values
                .iter()
                .map(|v| MatchItem {
                    text: Some(v.to_string()),
                    image: None,
                })
                .collect()
        };
        let left = items(&["France", "Spain", "Italy"]);
        let right = items(&["Paris", "Madrid", "Rome"]);
        let correct_answer = generate_correct_answer(&left, &right);
        QuestionBody::Matching {
            left,
            right,
            correct_answer,
        }
    }

    #[test]
    fn matching_all_correct_gets_full_points() {
        let body = matching_body();
        let QuestionBody::Matching { correct_answer, .. } = &body else {
            unreachable!()
        };
        // Submitting the generated key itself must score as fully correct.
        let all_correct: serde_json::Map<String, Value> = correct_answer
            .0
            .iter()
            .map(|(label, ordinal)| (label.clone(), json!(ordinal.to_string())))
            .collect();
        assert_eq!(
            score(key(&body, 6), &Value::Object(all_correct)).score,
            Score::Awarded {
                points: 6,
                is_correct: true
            }
        );
        assert_eq!(
            score(key(&body, 6), &json!(correct_answer.to_string())).score.points(),
            Some(6)
        );
    }

    #[test]
    fn matching_answered_from_the_student_view_scores() {
        let payload: CreateQuestionRequest = serde_json::from_value(json!({
            "text": "Pair each country with its capital",
            "type": "MATCHING",
            "points": 4,
            "subjectId": "geography",
            "grade": 9,
            "round": 1,
            "isAutoScored": true,
            "pairs": [
                { "left": "France", "right": "Paris" },
                { "left": "Spain", "right": "Madrid" }
            ]
        }))
        .unwrap();
        let question = validate(&payload).unwrap();
        let capitals = [("France", "Paris"), ("Spain", "Madrid")];

        let PublicBody::Matching { left, right } = question.body.to_public() else {
            panic!("expected matching view");
        };
        // Displayed sorted, so Madrid comes first.
        assert_eq!(right[0].text.as_deref(), Some("Madrid"));

        let answer: serde_json::Map<String, Value> = left
            .iter()
            .map(|item| {
                let capital = capitals
                    .iter()
                    .find(|(country, _)| item.text.as_deref() == Some(*country))
                    .map(|(_, capital)| *capital)
                    .unwrap();
                let shown = right
                    .iter()
                    .find(|r| r.text.as_deref() == Some(capital))
                    .unwrap();
                (item.label.clone(), json!(shown.ordinal.to_string()))
            })
            .collect();

        assert_eq!(
            score(&question, &Value::Object(answer)).score,
            Score::Awarded {
                points: 4,
                is_correct: true
            }
        );
    }

    #[test]
    fn matching_gives_floored_partial_credit() {
        let body = matching_body();
        // 2 of 3 pairs: floor(5 * 2 / 3) = 3
        assert_eq!(
            score(key(&body, 5), &json!({"A": "Paris", "B": "Rome", "C": "Rome"})).score,
            Score::Awarded {
                points: 3,
                is_correct: false
            }
        );
        assert_eq!(score(key(&body, 5), &json!("nonsense")).score.points(), Some(0));
    }

    #[test]
    fn matching_without_key_is_inconsistent() {
        let body = QuestionBody::Matching {
            left: vec![],
            right: vec![],
            correct_answer: MatchingKey::default(),
        };
        let scored = score(key(&body, 5), &json!({"A": 1}));
        assert_eq!(scored.score.points(), Some(0));
        assert!(scored.inconsistency.is_some());
    }

    fn sub(points: i32, answer: &str) -> SubQuestion {
        SubQuestion {
            text: "q".into(),
            points,
            is_auto_scored: true,
            kind: SubQuestionKind::ClosedEnded {
                options: vec!["x".into(), "y".into()],
                correct_answer: Some(answer.into()),
            },
        }
    }

    #[test]
    fn multi_part_sums_sub_scores() {
        let body = QuestionBody::TextAnalysis {
            sub_questions: vec![sub(2, "x"), sub(3, "x"), sub(5, "y")],
        };
        let scored = score(key(&body, 10), &json!(["x", "y", "y"]));
        assert_eq!(
            scored.score,
            Score::Awarded {
                points: 7,
                is_correct: false
            }
        );
        assert_eq!(scored.parts, Some(vec![Some(2), Some(0), Some(5)]));
    }

    #[test]
    fn open_parts_leave_the_answer_pending() {
        let mut essay = sub(4, "x");
        essay.kind = SubQuestionKind::OpenEnded;
        essay.is_auto_scored = false;
        let body = QuestionBody::MapAnalysis {
            sub_questions: vec![sub(2, "x"), essay],
        };
        let scored = score(key(&body, 6), &json!({"1": "x", "2": "long text"}));
        assert_eq!(scored.score, Score::Pending { provisional: Some(2) });
        assert_eq!(scored.parts, Some(vec![Some(2), None]));
    }

    #[test]
    fn multi_part_inconsistency_only_zeroes_that_part() {
        let mut broken = sub(3, "x");
        broken.kind = SubQuestionKind::ClosedEnded {
            options: vec!["x".into(), "y".into()],
            correct_answer: None,
        };
        let body = QuestionBody::TextAnalysis {
            sub_questions: vec![sub(2, "x"), broken],
        };
        let scored = score(key(&body, 5), &json!(["x", "x"]));
        assert_eq!(scored.score.points(), Some(2));
        assert_eq!(scored.inconsistency.and_then(|i| i.part), Some(2));
    }
}
