use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{AcademicYear, Subject},
    repositories::{plain_index, unique_index},
};

const YEARS_COLLECTION: &str = "academic_years";
const SUBJECTS_COLLECTION: &str = "subjects";

/// Academic years and the subjects they group.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_year(&self, year: AcademicYear) -> AppResult<AcademicYear>;
    async fn find_year(&self, id: i64) -> AppResult<Option<AcademicYear>>;
    async fn list_years(&self, active_only: bool) -> AppResult<Vec<AcademicYear>>;

    async fn create_subject(&self, subject: Subject) -> AppResult<Subject>;
    async fn find_subject(&self, id: i64) -> AppResult<Option<Subject>>;
    async fn find_subjects(&self, ids: &[i64]) -> AppResult<Vec<Subject>>;
    async fn find_subject_by_name(&self, academic_year_id: i64, name: &str) -> AppResult<Option<Subject>>;
    async fn list_subjects(&self, academic_year_id: Option<i64>, active_only: bool) -> AppResult<Vec<Subject>>;
    async fn update_subject(&self, subject: Subject) -> AppResult<Subject>;
    async fn delete_subject(&self, id: i64) -> AppResult<()>;
    async fn count_active_subjects(&self) -> AppResult<u64>;

    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoCatalogRepository {
    db: Database,
    years: Collection<AcademicYear>,
    subjects: Collection<Subject>,
}

impl MongoCatalogRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            years: db.get_collection(YEARS_COLLECTION),
            subjects: db.get_collection(SUBJECTS_COLLECTION),
        }
    }
}

#[async_trait]
impl CatalogRepository for MongoCatalogRepository {
    async fn create_year(&self, mut year: AcademicYear) -> AppResult<AcademicYear> {
        year.id = self.db.next_id(YEARS_COLLECTION).await?;
        self.years.insert_one(&year).await?;
        Ok(year)
    }

    async fn find_year(&self, id: i64) -> AppResult<Option<AcademicYear>> {
        Ok(self.years.find_one(doc! { "id": id }).await?)
    }

    async fn list_years(&self, active_only: bool) -> AppResult<Vec<AcademicYear>> {
        let filter = if active_only {
            doc! { "is_active": true }
        } else {
            doc! {}
        };
        let cursor = self.years.find(filter).sort(doc! { "id": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create_subject(&self, mut subject: Subject) -> AppResult<Subject> {
        subject.id = self.db.next_id(SUBJECTS_COLLECTION).await?;
        self.subjects.insert_one(&subject).await?;
        Ok(subject)
    }

    async fn find_subject(&self, id: i64) -> AppResult<Option<Subject>> {
        Ok(self.subjects.find_one(doc! { "id": id }).await?)
    }

    async fn find_subjects(&self, ids: &[i64]) -> AppResult<Vec<Subject>> {
        let cursor = self
            .subjects
            .find(doc! { "id": { "$in": ids } })
            .sort(doc! { "id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_subject_by_name(&self, academic_year_id: i64, name: &str) -> AppResult<Option<Subject>> {
        let subject = self
            .subjects
            .find_one(doc! { "academic_year_id": academic_year_id, "name": name })
            .await?;
        Ok(subject)
    }

    async fn list_subjects(&self, academic_year_id: Option<i64>, active_only: bool) -> AppResult<Vec<Subject>> {
        let mut filter = doc! {};
        if let Some(year_id) = academic_year_id {
            filter.insert("academic_year_id", year_id);
        }
        if active_only {
            filter.insert("is_active", true);
        }
        let cursor = self.subjects.find(filter).sort(doc! { "id": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_subject(&self, subject: Subject) -> AppResult<Subject> {
        let result = self
            .subjects
            .replace_one(doc! { "id": subject.id }, &subject)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Subject {} not found", subject.id)));
        }
        Ok(subject)
    }

    async fn delete_subject(&self, id: i64) -> AppResult<()> {
        let result = self.subjects.delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!("Subject {} not found", id)));
        }
        Ok(())
    }

    async fn count_active_subjects(&self) -> AppResult<u64> {
        Ok(self.subjects.count_documents(doc! { "is_active": true }).await?)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        self.years
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.subjects
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.subjects
            .create_index(plain_index(doc! { "academic_year_id": 1, "name": 1 }, "year_name"))
            .await?;

        log::info!("Created indexes for catalog collections");
        Ok(())
    }
}
