use std::{collections::HashMap, sync::Arc};

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::LessonProgress,
        dto::response::{LessonDetailView, LessonListItem, StudentSubjectView, SubjectSummary},
    },
    repositories::{CatalogRepository, ExamRepository, LessonRepository, ProgressRepository, SubscriptionRepository},
    services::{access_service::AccessGate, progress_service::ProgressService},
};

/// Subjects and lessons a student has been granted.
pub struct ContentService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    catalog: Arc<dyn CatalogRepository>,
    lessons: Arc<dyn LessonRepository>,
    exams: Arc<dyn ExamRepository>,
    progress: Arc<dyn ProgressRepository>,
    progress_service: Arc<ProgressService>,
    gate: Arc<AccessGate>,
}

impl ContentService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        catalog: Arc<dyn CatalogRepository>,
        lessons: Arc<dyn LessonRepository>,
        exams: Arc<dyn ExamRepository>,
        progress: Arc<dyn ProgressRepository>,
        progress_service: Arc<ProgressService>,
        gate: Arc<AccessGate>,
    ) -> Self {
        Self {
            subscriptions,
            catalog,
            lessons,
            exams,
            progress,
            progress_service,
            gate,
        }
    }

    async fn progress_by_lesson(
        &self,
        user_id: i64,
        lesson_ids: &[i64],
    ) -> AppResult<HashMap<i64, LessonProgress>> {
        Ok(self
            .progress
            .list_for_lessons(user_id, lesson_ids)
            .await?
            .into_iter()
            .map(|p| (p.lesson_id, p))
            .collect())
    }

    /// Active subjects behind the user's active grants, with lesson completion counts.
    pub async fn subjects_for(&self, user_id: i64) -> AppResult<Vec<StudentSubjectView>> {
        let grants = self.subscriptions.active_for_user(user_id).await?;
        let granted_at: HashMap<i64, _> = grants.iter().map(|g| (g.subject_id, g.start_date)).collect();
        let subject_ids: Vec<i64> = grants.iter().map(|g| g.subject_id).collect();

        let mut subjects = self.catalog.find_subjects(&subject_ids).await?;
        subjects.retain(|s| s.is_active);
        subjects.sort_by_key(|s| s.id);

        let mut views = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let lessons = self.lessons.list_by_subject(subject.id, true).await?;
            let lesson_ids: Vec<i64> = lessons.iter().map(|l| l.id).collect();
            let completed = self
                .progress_by_lesson(user_id, &lesson_ids)
                .await?
                .values()
                .filter(|p| p.is_completed)
                .count() as u64;

            let Some(subscription_date) = granted_at.get(&subject.id).copied() else {
                continue;
            };
            views.push(StudentSubjectView {
                subscription_date,
                lessons_count: lessons.len() as u64,
                completed_lessons: completed,
                subject,
            });
        }
        Ok(views)
    }

    /// Active lessons of a granted subject, in lesson order, with the user's progress.
    pub async fn lessons_for(&self, user_id: i64, subject_id: i64) -> AppResult<Vec<LessonListItem>> {
        self.gate.ensure_access(user_id, subject_id).await?;

        let lessons = self.lessons.list_by_subject(subject_id, true).await?;
        let lesson_ids: Vec<i64> = lessons.iter().map(|l| l.id).collect();
        let mut progress = self.progress_by_lesson(user_id, &lesson_ids).await?;

        Ok(lessons
            .into_iter()
            .map(|lesson| {
                let (watch_time_seconds, is_completed) = progress
                    .remove(&lesson.id)
                    .map(|p| (p.watch_time_seconds, p.is_completed))
                    .unwrap_or((0, false));
                LessonListItem {
                    lesson,
                    watch_time_seconds,
                    is_completed,
                }
            })
            .collect())
    }

    /// Opening a lesson records first access for the user.
    pub async fn lesson_detail(&self, user_id: i64, lesson_id: i64) -> AppResult<LessonDetailView> {
        let lesson = self
            .lessons
            .find_by_id(lesson_id)
            .await?
            .filter(|l| l.is_active)
            .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))?;
        self.gate.ensure_access(user_id, lesson.subject_id).await?;

        let subject = self
            .catalog
            .find_subject(lesson.subject_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))?;

        let progress = self.progress_service.get_or_create(user_id, lesson.id).await?;

        let mut exams = self.exams.list_exams(&[lesson.id], true).await?;
        exams.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(LessonDetailView {
            subject: SubjectSummary::from(&subject),
            lesson,
            progress,
            exams,
        })
    }
}
