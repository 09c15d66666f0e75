// src/assessment/grading.rs

use super::{error::GradingError, scorer::Scored};
use crate::models::question::{Question, QuestionBody};

/// Grading columns of a stored answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerGrade {
    pub is_correct: Option<bool>,
    pub points: Option<i32>,
    pub part_points: Option<Vec<Option<i32>>>,
    pub needs_review: bool,
}

impl AnswerGrade {
    pub fn from_scored(scored: &Scored) -> Self {
        Self {
            is_correct: scored.score.is_correct(),
            points: scored.score.points(),
            part_points: scored.parts.clone(),
            needs_review: scored.score.needs_review(),
        }
    }

    /// A final answer changes only through a re-grade.
    pub fn is_final(&self) -> bool {
        self.points.is_some() && !self.needs_review
    }
}

/// A teacher's or admin's grade for a whole answer or one of its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualGrade {
    pub points: i32,
    /// 1-based sub-question index; required for multi-part questions.
    pub part: Option<usize>,
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeMode {
    Initial,
    Regrade,
}

/// The parts of a question a grader is bound by.
#[derive(Debug, Clone, Copy)]
pub struct GradingTarget<'a> {
    pub points: i32,
    pub max_points: Option<i32>,
    pub body: &'a QuestionBody,
}

impl<'a> From<&'a Question> for GradingTarget<'a> {
    fn from(question: &'a Question) -> Self {
        Self {
            points: question.points,
            max_points: question.max_points,
            body: &question.body.0,
        }
    }
}

pub fn apply_grade(
    target: GradingTarget<'_>,
    current: &AnswerGrade,
    grade: &ManualGrade,
    mode: GradeMode,
) -> Result<AnswerGrade, GradingError> {
    if mode == GradeMode::Initial && current.is_final() {
        return Err(GradingError::AlreadyFinal);
    }

    let Some(sub_questions) = target.body.sub_questions() else {
        if grade.part.is_some() {
            return Err(GradingError::PartNotApplicable);
        }
        let ceiling = target.max_points.unwrap_or(target.points);
        check_range(grade.points, ceiling)?;
        return Ok(AnswerGrade {
            is_correct: Some(grade.is_correct.unwrap_or(grade.points >= target.points)),
            points: Some(grade.points),
            part_points: None,
            needs_review: false,
        });
    };

    let part = grade.part.ok_or(GradingError::PartRequired)?;
    let sub = part
        .checked_sub(1)
        .and_then(|i| sub_questions.get(i))
        .ok_or(GradingError::NoSuchPart(part))?;
    check_range(grade.points, sub.points)?;

    let mut parts = current
        .part_points
        .clone()
        .unwrap_or_else(|| vec![None; sub_questions.len()]);
    parts.resize(sub_questions.len(), None);
    parts[part - 1] = Some(grade.points);

    let earned: i32 = parts.iter().flatten().sum();
    let pending = parts.iter().any(Option::is_none);
    let full: i32 = sub_questions.iter().map(|s| s.points).sum();

    Ok(AnswerGrade {
        is_correct: (!pending).then_some(earned == full),
        points: Some(earned),
        part_points: Some(parts),
        needs_review: pending,
    })
}

fn check_range(points: i32, max: i32) -> Result<(), GradingError> {
    if !(0..=max).contains(&points) {
        return Err(GradingError::PointsOutOfRange { value: points, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::scorer::{AnswerKey, score};
    use crate::models::question::{SubQuestion, SubQuestionKind};
    use serde_json::json;

    fn open_ended() -> QuestionBody {
        QuestionBody::OpenEnded {
            answer_template: None,
        }
    }

    fn target(body: &QuestionBody) -> GradingTarget<'_> {
        GradingTarget {
            points: 6,
            max_points: None,
            body,
        }
    }

    fn grade(points: i32, part: Option<usize>) -> ManualGrade {
        ManualGrade {
            points,
            part,
            is_correct: None,
        }
    }

    #[test]
    fn grading_an_open_answer_finalizes_it() {
        let body = open_ended();
        let pending = AnswerGrade {
            needs_review: true,
            ..Default::default()
        };
        let graded = apply_grade(target(&body), &pending, &grade(6, None), GradeMode::Initial).unwrap();
        assert_eq!(graded.points, Some(6));
        assert_eq!(graded.is_correct, Some(true));
        assert!(graded.is_final());
    }

    #[test]
    fn final_answers_need_a_regrade() {
        let body = open_ended();
        let done = AnswerGrade {
            is_correct: Some(false),
            points: Some(2),
            part_points: None,
            needs_review: false,
        };
        assert_eq!(
            apply_grade(target(&body), &done, &grade(4, None), GradeMode::Initial),
            Err(GradingError::AlreadyFinal)
        );
        let regraded = apply_grade(target(&body), &done, &grade(4, None), GradeMode::Regrade).unwrap();
        assert_eq!(regraded.points, Some(4));
        assert_eq!(regraded.is_correct, Some(false));
    }

    #[test]
    fn max_points_override_raises_the_ceiling() {
        let body = open_ended();
        let generous = GradingTarget {
            max_points: Some(8),
            ..target(&body)
        };
        let current = AnswerGrade::default();
        assert!(apply_grade(generous, &current, &grade(8, None), GradeMode::Initial).is_ok());
        assert_eq!(
            apply_grade(target(&body), &current, &grade(7, None), GradeMode::Initial),
            Err(GradingError::PointsOutOfRange { value: 7, max: 6 })
        );
        assert_eq!(
            apply_grade(target(&body), &current, &grade(-1, None), GradeMode::Initial),
            Err(GradingError::PointsOutOfRange { value: -1, max: 6 })
        );
    }

    fn analysis() -> QuestionBody {
        QuestionBody::TextAnalysis {
            sub_questions: vec![
                SubQuestion {
                    text: "pick".into(),
                    points: 2,
                    is_auto_scored: true,
                    kind: SubQuestionKind::ClosedEnded {
                        options: vec!["x".into(), "y".into()],
                        correct_answer: Some("x".into()),
                    },
                },
                SubQuestion {
                    text: "explain".into(),
                    points: 5,
                    is_auto_scored: false,
                    kind: SubQuestionKind::OpenEnded,
                },
            ],
        }
    }

    #[test]
    fn grading_the_open_part_completes_a_multi_part_answer() {
        let body = analysis();
        let scored = score(
            AnswerKey {
                question_id: Some(9),
                points: 7,
                is_auto_scored: true,
                body: &body,
            },
            &json!(["x", "essay"]),
        );
        let current = AnswerGrade::from_scored(&scored);
        assert_eq!(current.points, Some(2));
        assert!(current.needs_review);

        let graded = apply_grade(target(&body), &current, &grade(5, Some(2)), GradeMode::Initial).unwrap();
        assert_eq!(graded.points, Some(7));
        assert_eq!(graded.part_points, Some(vec![Some(2), Some(5)]));
        assert_eq!(graded.is_correct, Some(true));
        assert!(graded.is_final());
    }

    #[test]
    fn part_rules() {
        let body = analysis();
        let current = AnswerGrade::default();
        assert_eq!(
            apply_grade(target(&body), &current, &grade(1, None), GradeMode::Initial),
            Err(GradingError::PartRequired)
        );
        assert_eq!(
            apply_grade(target(&body), &current, &grade(1, Some(0)), GradeMode::Initial),
            Err(GradingError::NoSuchPart(0))
        );
        assert_eq!(
            apply_grade(target(&body), &current, &grade(1, Some(3)), GradeMode::Initial),
            Err(GradingError::NoSuchPart(3))
        );
        assert_eq!(
            apply_grade(target(&body), &current, &grade(6, Some(2)), GradeMode::Initial),
            Err(GradingError::PointsOutOfRange { value: 6, max: 5 })
        );

        let single = open_ended();
        assert_eq!(
            apply_grade(target(&single), &current, &grade(1, Some(1)), GradeMode::Initial),
            Err(GradingError::PartNotApplicable)
        );
    }
}
