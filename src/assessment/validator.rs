// src/assessment/validator.rs

use std::{collections::HashSet, ops::RangeInclusive};

use serde_json::Value;

use super::{
    error::{InvalidQuestion, MatchingProblem, OptionSetProblem, QuestionError, Side},
    registry::{self, GRADE_RANGE, POINTS_RANGE, ROUND_RANGE, is_absent, subject_id_of},
};
use crate::{
    models::question::{
        ChoiceOptions, CreateQuestionRequest, MatchItem, MatchingKey, NewQuestion, QuestionBody,
        QuestionType, RawPair, RawSubQuestion, SubQuestion, SubQuestionKind, item_label, non_blank,
    },
    utils::html::clean_html,
};

/// Checks a proposed question and turns it into its typed, storable form.
///
/// All violations are collected in a fixed order (missing fields, numeric
/// bounds, type, answer key, type-specific shape), so validating the same
/// payload twice always yields the same result.
pub fn validate(payload: &CreateQuestionRequest) -> Result<NewQuestion, InvalidQuestion> {
    let mut errors = Vec::new();

    let text = non_blank(payload.text.as_deref());
    let type_name = non_blank(payload.question_type.as_deref());
    let subject_id = subject_id_of(payload.subject_id.as_ref());

    let missing = registry::missing_common_fields(payload);
    if !missing.is_empty() {
        errors.push(QuestionError::MissingField(missing));
    }

    let points = bounded("points", payload.points.as_ref(), POINTS_RANGE, &mut errors);
    let max_points = bounded("maxPoints", payload.max_points.as_ref(), POINTS_RANGE, &mut errors);
    let grade = bounded("grade", payload.grade.as_ref(), GRADE_RANGE, &mut errors);
    let round = bounded("round", payload.round.as_ref(), ROUND_RANGE, &mut errors);

    let question_type = match type_name.map(str::parse::<QuestionType>) {
        Some(Ok(question_type)) => Some(question_type),
        Some(Err(e)) => {
            errors.push(e);
            None
        }
        None => None,
    };

    let body = question_type.and_then(|question_type| {
        let requested = payload.is_auto_scored.unwrap_or(false);
        if requested && !question_type.supports_auto_scoring() {
            tracing::debug!("Ignoring auto-scoring flag on {} question", question_type.as_str());
        }
        let auto = requested && question_type.supports_auto_scoring();

        if auto
            && question_type.has_authored_answer()
            && !registry::is_auto_scorable(question_type, payload)
        {
            errors.push(QuestionError::MissingCorrectAnswer);
        }

        let body = match question_type {
            QuestionType::ClosedEnded => closed_ended(payload, &mut errors),
            QuestionType::Matching => matching(payload, &mut errors),
            QuestionType::TextAnalysis | QuestionType::MapAnalysis => {
                analysis(question_type, payload.sub_questions.as_deref(), &mut errors)
            }
            QuestionType::OpenEnded => Some(QuestionBody::OpenEnded {
                answer_template: non_blank(payload.answer_template.as_deref()).map(clean_html),
            }),
        };
        body.map(|body| (body, auto))
    });

    match (text, subject_id, points, grade, round, body) {
        (Some(text), Some(subject_id), Some(points), Some(grade), Some(round), Some((body, auto)))
            if errors.is_empty() =>
        {
            Ok(NewQuestion {
                text: clean_html(text),
                subject_id,
                points,
                max_points,
                grade,
                round,
                is_auto_scored: auto,
                body,
            })
        }
        _ => Err(InvalidQuestion(errors)),
    }
}

/// Positional answer key for a MATCHING question: left item `i` pairs with right item `i`.
pub fn generate_correct_answer(left: &[MatchItem], right: &[MatchItem]) -> MatchingKey {
    MatchingKey(
        (0..left.len().min(right.len()))
            .map(|i| (item_label(i), i as u32 + 1))
            .collect(),
    )
}

fn closed_ended(
    payload: &CreateQuestionRequest,
    errors: &mut Vec<QuestionError>,
) -> Option<QuestionBody> {
    let images = clean_list(payload.option_images.as_deref());
    let options = if !images.is_empty() {
        if images.len() < 2 {
            errors.push(OptionSetProblem::TooFewImageOptions(images.len()).into());
            return None;
        }
        ChoiceOptions::Images(images)
    } else {
        let texts = clean_list(payload.options.as_deref());
        if texts.len() < 2 {
            errors.push(OptionSetProblem::TooFewTextOptions(texts.len()).into());
            return None;
        }
        ChoiceOptions::Text(texts)
    };

    let correct_answer = non_blank(payload.correct_answer.as_deref()).map(str::to_string);
    if let Some(answer) = &correct_answer {
        if !options.values().contains(answer) {
            errors.push(OptionSetProblem::AnswerNotAnOption(answer.clone()).into());
            return None;
        }
    }

    Some(QuestionBody::ClosedEnded {
        options,
        correct_answer,
    })
}

fn matching(
    payload: &CreateQuestionRequest,
    errors: &mut Vec<QuestionError>,
) -> Option<QuestionBody> {
    let (left, right) = if payload.left_side.is_some() || payload.right_side.is_some() {
        (
            payload.left_side.clone().unwrap_or_default(),
            payload.right_side.clone().unwrap_or_default(),
        )
    } else {
        match payload.pairs.as_deref() {
            Some(pairs) if !pairs.is_empty() => sides_from_pairs(pairs, errors)?,
            _ => {
                errors.push(MatchingProblem::NoInput.into());
                return None;
            }
        }
    };

    let left_ok = check_side(Side::Left, &left, errors);
    let right_ok = check_side(Side::Right, &right, errors);
    if !(left_ok && right_ok) {
        return None;
    }
    if left.len() > right.len() {
        errors.push(
            MatchingProblem::UnpairedLeft {
                left: left.len(),
                right: right.len(),
            }
            .into(),
        );
        return None;
    }

    let left: Vec<MatchItem> = left.iter().map(tidy_item).collect();
    let right: Vec<MatchItem> = right.iter().map(tidy_item).collect();
    if !check_ordinals(&right, errors) {
        return None;
    }
    let correct_answer = generate_correct_answer(&left, &right);

    Some(QuestionBody::Matching {
        left,
        right,
        correct_answer,
    })
}

fn sides_from_pairs(
    pairs: &[RawPair],
    errors: &mut Vec<QuestionError>,
) -> Option<(Vec<MatchItem>, Vec<MatchItem>)> {
    let mut left = Vec::with_capacity(pairs.len());
    let mut right = Vec::with_capacity(pairs.len());
    let mut complete = true;

    for (i, pair) in pairs.iter().enumerate() {
        match (non_blank(pair.left.as_deref()), non_blank(pair.right.as_deref())) {
            (Some(l), Some(r)) => {
                left.push(MatchItem {
                    text: Some(l.to_string()),
                    image: None,
                });
                right.push(MatchItem {
                    text: Some(r.to_string()),
                    image: None,
                });
            }
            _ => {
                errors.push(MatchingProblem::IncompletePair { index: i + 1 }.into());
                complete = false;
            }
        }
    }

    complete.then_some((left, right))
}

/// Every item needs a value; the first repeated value on a side is rejected.
fn check_side(side: Side, items: &[MatchItem], errors: &mut Vec<QuestionError>) -> bool {
    if items.is_empty() {
        errors.push(MatchingProblem::EmptySide(side).into());
        return false;
    }

    let mut seen = HashSet::new();
    let mut ok = true;
    for (i, item) in items.iter().enumerate() {
        match item.key() {
            None => {
                errors.push(MatchingProblem::EmptyItem { side, index: i + 1 }.into());
                ok = false;
            }
            Some(key) => {
                if !seen.insert(key) {
                    errors.push(MatchingProblem::Duplicate { side, index: i + 1 }.into());
                    return false;
                }
            }
        }
    }
    ok
}

/// Answers may name a right item by value or by 1-based position, so a
/// numeric value inside the position range must be its own position.
fn check_ordinals(right: &[MatchItem], errors: &mut Vec<QuestionError>) -> bool {
    let mut ok = true;
    for (i, item) in right.iter().enumerate() {
        let ordinal = item.key().and_then(|key| key.parse::<usize>().ok());
        if let Some(ordinal) = ordinal.filter(|n| (1..=right.len()).contains(n) && *n != i + 1) {
            errors.push(MatchingProblem::AmbiguousOrdinal { index: i + 1, ordinal }.into());
            ok = false;
        }
    }
    ok
}

fn tidy_item(item: &MatchItem) -> MatchItem {
    MatchItem {
        text: non_blank(item.text.as_deref()).map(str::to_string),
        image: non_blank(item.image.as_deref()).map(str::to_string),
    }
}

fn analysis(
    question_type: QuestionType,
    raw: Option<&[RawSubQuestion]>,
    errors: &mut Vec<QuestionError>,
) -> Option<QuestionBody> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            errors.push(QuestionError::NoSubQuestions);
            return None;
        }
    };

    let mut sub_questions = Vec::with_capacity(raw.len());
    for (i, sub) in raw.iter().enumerate() {
        match validate_sub_question(sub) {
            Ok(sub) => sub_questions.push(sub),
            Err(reasons) => errors.extend(reasons.into_iter().map(|reason| {
                QuestionError::InvalidSubQuestion {
                    index: i + 1,
                    reason: Box::new(reason),
                }
            })),
        }
    }

    if sub_questions.len() != raw.len() {
        return None;
    }

    Some(match question_type {
        QuestionType::MapAnalysis => QuestionBody::MapAnalysis { sub_questions },
        _ => QuestionBody::TextAnalysis { sub_questions },
    })
}

fn validate_sub_question(raw: &RawSubQuestion) -> Result<SubQuestion, Vec<QuestionError>> {
    let mut errors = Vec::new();

    let text = non_blank(raw.text.as_deref());
    let type_name = non_blank(raw.question_type.as_deref());

    let mut missing = Vec::new();
    if text.is_none() {
        missing.push("text");
    }
    if type_name.is_none() {
        missing.push("type");
    }
    if is_absent(raw.points.as_ref()) {
        missing.push("points");
    }
    if !missing.is_empty() {
        errors.push(QuestionError::MissingField(missing));
    }

    let points = bounded("points", raw.points.as_ref(), POINTS_RANGE, &mut errors);

    let sub_type = match type_name.map(str::parse::<QuestionType>) {
        Some(Ok(t @ (QuestionType::ClosedEnded | QuestionType::OpenEnded))) => Some(t),
        Some(Ok(_)) | Some(Err(_)) => {
            errors.push(QuestionError::UnknownQuestionType(
                type_name.unwrap_or_default().to_string(),
            ));
            None
        }
        None => None,
    };

    let auto = raw.is_auto_scored.unwrap_or(false)
        && sub_type.is_some_and(QuestionType::supports_auto_scoring);

    let kind = sub_type.and_then(|t| match t {
        QuestionType::ClosedEnded => {
            let options = clean_list(raw.options.as_deref());
            let correct_answer = non_blank(raw.correct_answer.as_deref()).map(str::to_string);
            if auto {
                if options.len() < 2 {
                    errors.push(OptionSetProblem::TooFewTextOptions(options.len()).into());
                    return None;
                }
                match &correct_answer {
                    None => {
                        errors.push(QuestionError::MissingCorrectAnswer);
                        return None;
                    }
                    Some(answer) if !options.contains(answer) => {
                        errors.push(OptionSetProblem::AnswerNotAnOption(answer.clone()).into());
                        return None;
                    }
                    Some(_) => {}
                }
            }
            Some(SubQuestionKind::ClosedEnded {
                options,
                correct_answer,
            })
        }
        _ => Some(SubQuestionKind::OpenEnded),
    });

    match (text, points, kind) {
        (Some(text), Some(points), Some(kind)) if errors.is_empty() => Ok(SubQuestion {
            text: clean_html(text),
            points,
            is_auto_scored: auto,
            kind,
        }),
        _ => Err(errors),
    }
}

/// Parses an integer field and checks its bounds. Absent fields yield `None`
/// without an error; the caller reports them as missing.
fn bounded(
    field: &'static str,
    value: Option<&Value>,
    range: RangeInclusive<i64>,
    errors: &mut Vec<QuestionError>,
) -> Option<i32> {
    if is_absent(value) {
        return None;
    }

    let parsed = match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    let Some(number) = parsed else {
        let shown = match value? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        errors.push(QuestionError::NotAnInteger {
            field,
            value: shown,
        });
        return None;
    };

    if !range.contains(&number) {
        errors.push(QuestionError::OutOfRange {
            field,
            value: number,
            min: *range.start(),
            max: *range.end(),
        });
        return None;
    }

    i32::try_from(number).ok()
}

fn clean_list(values: Option<&[String]>) -> Vec<String> {
    values
        .unwrap_or_default()
        .iter()
        .filter_map(|v| non_blank(Some(v.as_str())))
        .map(str::to_string)
        .collect()
}
