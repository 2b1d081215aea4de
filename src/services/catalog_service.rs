use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{AcademicYear, Answer, Exam, Lesson, Question, Subject},
        dto::{
            request::{
                CreateAcademicYearRequest, CreateAnswerRequest, CreateExamRequest,
                CreateLessonRequest, CreateQuestionRequest, CreateSubjectRequest,
                UpdateAnswerRequest, UpdateExamRequest, UpdateLessonRequest,
                UpdateQuestionRequest, UpdateSubjectRequest,
            },
            response::{AdminExamView, AdminQuestionView, AdminSubjectView},
        },
    },
    repositories::{
        CatalogRepository, ExamAttemptRepository, ExamRepository, LessonRepository,
        ProgressRepository, SubscriptionRepository,
    },
    services::notification_service::NotificationService,
};

const DEFAULT_EXAM_DURATION_MINUTES: i32 = 30;

fn next_order(count: usize) -> i32 {
    count as i32 + 1
}

/// Admin maintenance of years, subjects, lessons, exams, questions and answers.
///
/// Deletes cascade child-first. They are not wrapped in a transaction, so a failure
/// part way leaves orphans that are invisible to students but listed to admins.
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    lessons: Arc<dyn LessonRepository>,
    exams: Arc<dyn ExamRepository>,
    attempts: Arc<dyn ExamAttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    notifications: Arc<NotificationService>,
}

impl CatalogService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        lessons: Arc<dyn LessonRepository>,
        exams: Arc<dyn ExamRepository>,
        attempts: Arc<dyn ExamAttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            catalog,
            lessons,
            exams,
            attempts,
            progress,
            subscriptions,
            notifications,
        }
    }

    // Academic years

    pub async fn list_years(&self, active_only: bool) -> AppResult<Vec<AcademicYear>> {
        self.catalog.list_years(active_only).await
    }

    pub async fn create_year(&self, request: CreateAcademicYearRequest) -> AppResult<AcademicYear> {
        request.validate()?;
        let year = self
            .catalog
            .create_year(AcademicYear::new(request.name.trim(), request.description))
            .await?;
        log::info!("Created academic year {} ({})", year.id, year.name);
        Ok(year)
    }

    // Subjects

    /// Active subjects of an active year, as offered at registration.
    pub async fn public_subjects(&self, academic_year_id: i64) -> AppResult<Vec<Subject>> {
        self.catalog
            .find_year(academic_year_id)
            .await?
            .filter(|y| y.is_active)
            .ok_or_else(|| AppError::NotFound("Academic year not found".to_string()))?;
        self.catalog.list_subjects(Some(academic_year_id), true).await
    }

    async fn subject(&self, id: i64) -> AppResult<Subject> {
        self.catalog
            .find_subject(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))
    }

    async fn ensure_unique_subject_name(&self, academic_year_id: i64, name: &str, except: Option<i64>) -> AppResult<()> {
        if let Some(existing) = self.catalog.find_subject_by_name(academic_year_id, name).await? {
            if Some(existing.id) != except {
                return Err(AppError::AlreadyExists(format!(
                    "Subject '{}' already exists in this academic year",
                    name
                )));
            }
        }
        Ok(())
    }

    pub async fn list_subjects(&self, academic_year_id: Option<i64>) -> AppResult<Vec<AdminSubjectView>> {
        let subjects = self.catalog.list_subjects(academic_year_id, false).await?;

        let mut views = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let lessons = self.lessons.list_by_subject(subject.id, false).await?;
            let lesson_ids: Vec<i64> = lessons.iter().map(|l| l.id).collect();
            let exams_count = self.exams.list_exams(&lesson_ids, false).await?.len() as u64;
            let active_subscriptions = self.subscriptions.count_active_for_subject(subject.id).await?;
            views.push(AdminSubjectView {
                lessons_count: lessons.len() as u64,
                exams_count,
                active_subscriptions,
                subject,
            });
        }
        Ok(views)
    }

    pub async fn create_subject(&self, request: CreateSubjectRequest) -> AppResult<Subject> {
        request.validate()?;

        self.catalog
            .find_year(request.academic_year_id)
            .await?
            .ok_or_else(|| AppError::ValidationError("Academic year does not exist".to_string()))?;

        let name = request.name.trim();
        self.ensure_unique_subject_name(request.academic_year_id, name, None)
            .await?;

        let mut subject = Subject::new(name, request.academic_year_id, request.price);
        subject.description = request.description;
        let subject = self.catalog.create_subject(subject).await?;

        log::info!("Created subject {} ({})", subject.id, subject.name);
        Ok(subject)
    }

    pub async fn update_subject(&self, id: i64, request: UpdateSubjectRequest) -> AppResult<Subject> {
        request.validate()?;
        let mut subject = self.subject(id).await?;

        if let Some(year_id) = request.academic_year_id {
            self.catalog
                .find_year(year_id)
                .await?
                .ok_or_else(|| AppError::ValidationError("Academic year does not exist".to_string()))?;
            subject.academic_year_id = year_id;
        }
        if let Some(name) = request.name {
            subject.name = name.trim().to_string();
        }
        self.ensure_unique_subject_name(subject.academic_year_id, &subject.name, Some(subject.id))
            .await?;

        if request.description.is_some() {
            subject.description = request.description;
        }
        if let Some(price) = request.price {
            subject.price = price;
        }
        if let Some(is_active) = request.is_active {
            subject.is_active = is_active;
        }
        subject.updated_at = Utc::now();

        self.catalog.update_subject(subject).await
    }

    pub async fn delete_subject(&self, id: i64) -> AppResult<()> {
        let subject = self.subject(id).await?;

        if self.lessons.count_by_subject(subject.id).await? > 0 {
            return Err(AppError::ValidationError(
                "Cannot delete a subject that still has lessons".to_string(),
            ));
        }

        self.catalog.delete_subject(subject.id).await?;
        log::info!("Deleted subject {}", subject.id);
        Ok(())
    }

    // Lessons

    async fn lesson(&self, id: i64) -> AppResult<Lesson> {
        self.lessons
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))
    }

    pub async fn list_lessons(&self, subject_id: i64) -> AppResult<Vec<Lesson>> {
        let subject = self.subject(subject_id).await?;
        self.lessons.list_by_subject(subject.id, false).await
    }

    /// Creates the lesson, then tells the subject's subscribers about it.
    pub async fn create_lesson(&self, request: CreateLessonRequest) -> AppResult<Lesson> {
        request.validate()?;
        let subject = self.subject(request.subject_id).await?;

        let order = match request.lesson_order {
            Some(order) => order,
            None => next_order(self.lessons.count_by_subject(subject.id).await? as usize),
        };

        let mut lesson = Lesson::new(subject.id, request.title.trim(), order);
        lesson.description = request.description;
        lesson.video_url = request.video_url;
        lesson.video_duration = request.video_duration;
        lesson.attachments = request.attachments.unwrap_or_default();
        let lesson = self.lessons.create(lesson).await?;

        match self.subscriptions.active_user_ids_for_subject(subject.id).await {
            Ok(user_ids) => {
                let notified = self
                    .notifications
                    .broadcast_new_lesson(&user_ids, &subject.name, &lesson.title)
                    .await;
                log::info!(
                    "Created lesson {} in subject {}, notified {} students",
                    lesson.id,
                    subject.id,
                    notified
                );
            }
            Err(err) => log::warn!(
                "Created lesson {} but could not load subscribers of subject {}: {}",
                lesson.id,
                subject.id,
                err
            ),
        }

        Ok(lesson)
    }

    pub async fn update_lesson(&self, id: i64, request: UpdateLessonRequest) -> AppResult<Lesson> {
        request.validate()?;
        let mut lesson = self.lesson(id).await?;

        if let Some(title) = request.title {
            lesson.title = title.trim().to_string();
        }
        if request.description.is_some() {
            lesson.description = request.description;
        }
        if request.video_url.is_some() {
            lesson.video_url = request.video_url;
        }
        if request.video_duration.is_some() {
            lesson.video_duration = request.video_duration;
        }
        if let Some(attachments) = request.attachments {
            lesson.attachments = attachments;
        }
        if let Some(order) = request.lesson_order {
            lesson.lesson_order = order;
        }
        if let Some(is_active) = request.is_active {
            lesson.is_active = is_active;
        }
        lesson.updated_at = Utc::now();

        self.lessons.update(lesson).await
    }

    pub async fn delete_lesson(&self, id: i64) -> AppResult<()> {
        let lesson = self.lesson(id).await?;

        for exam in self.exams.list_exams(&[lesson.id], false).await? {
            self.remove_exam_tree(exam.id).await?;
        }
        let progress = self.progress.delete_by_lesson(lesson.id).await?;
        self.lessons.delete(lesson.id).await?;

        log::info!("Deleted lesson {} ({} progress records)", lesson.id, progress);
        Ok(())
    }

    // Exams

    async fn exam(&self, id: i64) -> AppResult<Exam> {
        self.exams
            .find_exam(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
    }

    pub async fn list_exams(&self, lesson_id: i64) -> AppResult<Vec<AdminExamView>> {
        let lesson = self.lesson(lesson_id).await?;
        let exams = self.exams.list_exams(&[lesson.id], false).await?;

        let mut views = Vec::with_capacity(exams.len());
        for exam in exams {
            let questions_count = self.exams.count_questions(exam.id).await?;
            views.push(AdminExamView { exam, questions_count });
        }
        Ok(views)
    }

    pub async fn create_exam(&self, request: CreateExamRequest) -> AppResult<Exam> {
        request.validate()?;
        let lesson = self.lesson(request.lesson_id).await?;

        let mut exam = Exam::new(
            lesson.id,
            request.title.trim(),
            request.duration_minutes.unwrap_or(DEFAULT_EXAM_DURATION_MINUTES),
        );
        exam.description = request.description;
        if let Some(max_attempts) = request.max_attempts {
            exam.max_attempts = max_attempts;
        }
        if let Some(passing_score) = request.passing_score {
            exam.passing_score = passing_score;
        }
        if let Some(show) = request.show_results_immediately {
            exam.show_results_immediately = show;
        }

        let exam = self.exams.create_exam(exam).await?;
        log::info!("Created exam {} for lesson {}", exam.id, lesson.id);
        Ok(exam)
    }

    pub async fn update_exam(&self, id: i64, request: UpdateExamRequest) -> AppResult<Exam> {
        request.validate()?;
        let mut exam = self.exam(id).await?;

        if let Some(title) = request.title {
            exam.title = title.trim().to_string();
        }
        if request.description.is_some() {
            exam.description = request.description;
        }
        if let Some(duration) = request.duration_minutes {
            exam.duration_minutes = duration;
        }
        if let Some(max_attempts) = request.max_attempts {
            exam.max_attempts = max_attempts;
        }
        if let Some(passing_score) = request.passing_score {
            exam.passing_score = passing_score;
        }
        if let Some(show) = request.show_results_immediately {
            exam.show_results_immediately = show;
        }
        if let Some(is_active) = request.is_active {
            exam.is_active = is_active;
        }
        exam.updated_at = Utc::now();

        self.exams.update_exam(exam).await
    }

    async fn remove_exam_tree(&self, exam_id: i64) -> AppResult<()> {
        let question_ids: Vec<i64> = self
            .exams
            .list_questions(exam_id, false)
            .await?
            .iter()
            .map(|q| q.id)
            .collect();

        self.attempts.delete_by_exams(&[exam_id]).await?;
        self.exams.delete_answers_by_questions(&question_ids).await?;
        self.exams.delete_questions_by_exam(exam_id).await?;
        self.exams.delete_exam(exam_id).await
    }

    pub async fn delete_exam(&self, id: i64) -> AppResult<()> {
        let exam = self.exam(id).await?;
        self.remove_exam_tree(exam.id).await?;
        log::info!("Deleted exam {}", exam.id);
        Ok(())
    }

    // Questions and answers

    async fn question(&self, id: i64) -> AppResult<Question> {
        self.exams
            .find_question(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
    }

    pub async fn list_questions(&self, exam_id: i64) -> AppResult<Vec<AdminQuestionView>> {
        let exam = self.exam(exam_id).await?;
        let questions = self.exams.list_questions(exam.id, false).await?;
        let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let answers = self.exams.list_answers(&question_ids, false).await?;

        Ok(questions
            .into_iter()
            .map(|question| AdminQuestionView {
                answers: answers
                    .iter()
                    .filter(|a| a.question_id == question.id)
                    .cloned()
                    .collect(),
                question,
            })
            .collect())
    }

    /// Creates a question, seeding any answers supplied with it.
    pub async fn create_question(&self, request: CreateQuestionRequest) -> AppResult<AdminQuestionView> {
        request.validate()?;
        let exam = self.exam(request.exam_id).await?;

        let order = match request.order {
            Some(order) => order,
            None => next_order(self.exams.count_questions(exam.id).await? as usize),
        };
        let question = self
            .exams
            .create_question(Question::new(
                exam.id,
                request.question_text.trim(),
                request.question_type,
                order,
            ))
            .await?;

        let mut answers = Vec::with_capacity(request.answers.len());
        for (index, input) in request.answers.into_iter().enumerate() {
            let text = input.answer_text.trim();
            if text.is_empty() {
                continue;
            }
            let order = input.order.unwrap_or_else(|| next_order(index));
            answers.push(
                self.exams
                    .create_answer(Answer::new(question.id, text, input.is_correct, order))
                    .await?,
            );
        }

        Ok(AdminQuestionView { question, answers })
    }

    pub async fn update_question(&self, id: i64, request: UpdateQuestionRequest) -> AppResult<Question> {
        request.validate()?;
        let mut question = self.question(id).await?;

        if let Some(text) = request.question_text {
            question.question_text = text.trim().to_string();
        }
        if let Some(question_type) = request.question_type {
            question.question_type = question_type;
        }
        if let Some(order) = request.order {
            question.order = order;
        }
        if let Some(is_active) = request.is_active {
            question.is_active = is_active;
        }
        question.updated_at = Utc::now();

        self.exams.update_question(question).await
    }

    pub async fn delete_question(&self, id: i64) -> AppResult<()> {
        let question = self.question(id).await?;
        self.exams.delete_answers_by_questions(&[question.id]).await?;
        self.exams.delete_question(question.id).await
    }

    pub async fn create_answer(&self, request: CreateAnswerRequest) -> AppResult<Answer> {
        request.validate()?;
        let question = self.question(request.question_id).await?;

        let order = match request.order {
            Some(order) => order,
            None => next_order(self.exams.list_answers(&[question.id], false).await?.len()),
        };
        self.exams
            .create_answer(Answer::new(
                question.id,
                request.answer_text.trim(),
                request.is_correct,
                order,
            ))
            .await
    }

    pub async fn update_answer(&self, id: i64, request: UpdateAnswerRequest) -> AppResult<Answer> {
        request.validate()?;
        let mut answer = self
            .exams
            .find_answer(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Answer not found".to_string()))?;

        if let Some(text) = request.answer_text {
            answer.answer_text = text.trim().to_string();
        }
        if let Some(is_correct) = request.is_correct {
            answer.is_correct = is_correct;
        }
        if let Some(order) = request.order {
            answer.order = order;
        }
        if let Some(is_active) = request.is_active {
            answer.is_active = is_active;
        }
        answer.updated_at = Utc::now();

        self.exams.update_answer(answer).await
    }

    pub async fn delete_answer(&self, id: i64) -> AppResult<()> {
        let answer = self
            .exams
            .find_answer(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Answer not found".to_string()))?;
        self.exams.delete_answer(answer.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_order_follows_existing_count() {
        assert_eq!(next_order(0), 1);
        assert_eq!(next_order(4), 5);
    }
}
