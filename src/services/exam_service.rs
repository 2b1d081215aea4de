use std::{collections::HashMap, sync::Arc};

use chrono::Utc;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{
            exam_attempt::COUNTED_ATTEMPT_NUMBER, Answer, Exam, ExamAttempt, Question,
        },
        dto::{
            request::ExamSubmissionRequest,
            response::{AnswerView, ExamSummary, ExamView, QuestionView, SubmissionResult},
        },
    },
    repositories::{ExamAttemptRepository, ExamRepository, LessonRepository},
    services::access_service::AccessGate,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub correct_answers: i32,
    pub total_questions: i32,
    pub score: f64,
}

/// Scores a submission against the active questions of an exam.
///
/// A question counts as correct only when the chosen answer belongs to it, is active
/// and is flagged correct. The score is a percentage rounded to two decimals, and an
/// exam without questions scores zero.
pub fn grade(questions: &[Question], answers: &[Answer], choices: &HashMap<i64, i64>) -> Grade {
    let by_id: HashMap<i64, &Answer> = answers.iter().map(|a| (a.id, a)).collect();

    let correct = questions
        .iter()
        .filter(|question| {
            choices
                .get(&question.id)
                .and_then(|answer_id| by_id.get(answer_id))
                .map(|answer| {
                    answer.question_id == question.id && answer.is_active && answer.is_correct
                })
                .unwrap_or(false)
        })
        .count() as i32;

    let total = questions.len() as i32;
    let score = if total == 0 {
        0.0
    } else {
        ((correct as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
    };

    Grade {
        correct_answers: correct,
        total_questions: total,
        score,
    }
}

/// Exams as students see and sit them.
pub struct ExamService {
    exams: Arc<dyn ExamRepository>,
    attempts: Arc<dyn ExamAttemptRepository>,
    lessons: Arc<dyn LessonRepository>,
    gate: Arc<AccessGate>,
}

impl ExamService {
    pub fn new(
        exams: Arc<dyn ExamRepository>,
        attempts: Arc<dyn ExamAttemptRepository>,
        lessons: Arc<dyn LessonRepository>,
        gate: Arc<AccessGate>,
    ) -> Self {
        Self {
            exams,
            attempts,
            lessons,
            gate,
        }
    }

    /// Loads an active exam and checks the user may sit it.
    async fn accessible_exam(&self, user_id: i64, exam_id: i64) -> AppResult<Exam> {
        let exam = self
            .exams
            .find_exam(exam_id)
            .await?
            .filter(|exam| exam.is_active)
            .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

        let lesson = self.lessons.find_by_id(exam.lesson_id).await?.ok_or_else(|| {
            AppError::Forbidden("You do not have access to this exam".to_string())
        })?;
        self.gate.ensure_access(user_id, lesson.subject_id).await?;

        Ok(exam)
    }

    async fn active_questions(&self, exam_id: i64) -> AppResult<(Vec<Question>, Vec<Answer>)> {
        let questions = self.exams.list_questions(exam_id, true).await?;
        let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let answers = self.exams.list_answers(&question_ids, true).await?;
        Ok((questions, answers))
    }

    /// Active exams across the subject's lessons, newest first.
    pub async fn list_for_subject(&self, user_id: i64, subject_id: i64) -> AppResult<Vec<ExamSummary>> {
        self.gate.ensure_access(user_id, subject_id).await?;

        let lessons = self.lessons.list_by_subject(subject_id, false).await?;
        let lesson_ids: Vec<i64> = lessons.iter().map(|l| l.id).collect();
        let mut exams = self.exams.list_exams(&lesson_ids, true).await?;
        exams.sort_by(|a, b| b.id.cmp(&a.id));

        let mut summaries = Vec::with_capacity(exams.len());
        for exam in exams {
            let attempts = self.attempts.list_for_exam(user_id, exam.id).await?;
            summaries.push(ExamSummary {
                attempts_count: attempts.len() as u64,
                best_score: attempts.iter().find(|a| a.is_counted()).map(|a| a.score),
                last_attempt: attempts.iter().map(|a| a.submitted_at).max(),
                remaining_attempts: None,
                exam,
            });
        }
        Ok(summaries)
    }

    /// The exam with its active questions and answers, without the answer key.
    pub async fn present(&self, user_id: i64, exam_id: i64) -> AppResult<ExamView> {
        let exam = self.accessible_exam(user_id, exam_id).await?;
        let (questions, answers) = self.active_questions(exam.id).await?;

        let mut answers_by_question: HashMap<i64, Vec<AnswerView>> = HashMap::new();
        for answer in answers {
            answers_by_question
                .entry(answer.question_id)
                .or_default()
                .push(AnswerView::from(answer));
        }

        let questions = questions
            .into_iter()
            .map(|question| QuestionView {
                answers: answers_by_question.remove(&question.id).unwrap_or_default(),
                id: question.id,
                question_text: question.question_text,
                question_type: question.question_type,
                order: question.order,
            })
            .collect();

        let attempts_count = self.attempts.count(user_id, exam.id).await?;
        let counted_score = self
            .attempts
            .find_first(user_id, exam.id)
            .await?
            .filter(ExamAttempt::is_counted)
            .map(|a| a.score);

        Ok(ExamView {
            exam,
            questions,
            attempts_count,
            counted_score,
            remaining_attempts: None,
        })
    }

    /// Grades a submission. Only the first attempt is stored; later ones are scored and returned.
    pub async fn submit(
        &self,
        user_id: i64,
        exam_id: i64,
        submission: ExamSubmissionRequest,
    ) -> AppResult<SubmissionResult> {
        let exam = self.accessible_exam(user_id, exam_id).await?;
        let (questions, answers) = self.active_questions(exam.id).await?;

        let result = grade(&questions, &answers, &submission.choices());
        let passed = exam.is_passing(result.score);

        let prior = self.attempts.count(user_id, exam.id).await?;
        let attempt_number = prior as i32 + 1;

        let mut counted = false;
        if attempt_number == COUNTED_ATTEMPT_NUMBER {
            let attempt = ExamAttempt {
                id: 0,
                user_id,
                exam_id: exam.id,
                attempt_number,
                score: result.score,
                correct_answers: result.correct_answers,
                total_questions: result.total_questions,
                is_passed: passed,
                submitted_at: Utc::now(),
            };
            counted = self.attempts.insert(attempt).await?.is_some();
        }

        let counted_score = self
            .attempts
            .find_first(user_id, exam.id)
            .await?
            .filter(ExamAttempt::is_counted)
            .map(|a| a.score)
            .unwrap_or(result.score);

        log::info!(
            "User {} submitted exam {} (attempt {}, score {:.2}, counted {})",
            user_id,
            exam.id,
            attempt_number,
            result.score,
            counted
        );

        Ok(SubmissionResult {
            score: result.score,
            counted_score,
            counted,
            correct_answers: result.correct_answers,
            total_questions: result.total_questions,
            passed,
            attempt_number,
        })
    }

    pub async fn attempts(&self, user_id: i64, exam_id: i64) -> AppResult<Vec<ExamAttempt>> {
        let exam = self.accessible_exam(user_id, exam_id).await?;
        let mut attempts = self.attempts.list_for_exam(user_id, exam.id).await?;
        attempts.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(attempts)
    }
}
