use crate::entities::*;
use chrono::{DateTime, FixedOffset};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::sync::Arc;

pub mod api;

/// Status assigned to a task created without one.
pub const DEFAULT_STATUS: &str = "new";

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: i32,
    title: String,
    description: String,
    status: String,
    created_at: DateTime<FixedOffset>,
    updated_at: DateTime<FixedOffset>,
}

impl Task {
    pub fn new(
        id: i32,
        title: String,
        description: String,
        status: String,
        created_at: DateTime<FixedOffset>,
        updated_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            status,
            created_at,
            updated_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns the time the task was inserted.
    pub fn created_at(&self) -> DateTime<FixedOffset> {
        self.created_at
    }

    /// Returns the time of the last update, or the insertion time if never updated.
    pub fn updated_at(&self) -> DateTime<FixedOffset> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.title,
            model.description,
            model.status,
            model.created_at,
            model.updated_at,
        )
    }
}

/// Fields of a partial update. `None` leaves the stored value untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Error type for TaskRepository operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskRepositoryError {
    /// Title or description was empty on insert.
    #[error("Fields title and description are required")]
    MissingRequiredFields,
    /// Represents a database error.
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl TaskRepositoryError {
    /// Returns true if the store answered but a row could not be decoded.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            TaskRepositoryError::Database(
                DbErr::Type(_) | DbErr::Json(_) | DbErr::TryIntoErr { .. }
            )
        )
    }
}

/// Shared handle to the store, injected into the task routes.
#[derive(Clone, Debug)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

pub struct TaskRepository<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskRepository<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskRepository<'_> {
        TaskRepository { db }
    }

    /// Retrieves all tasks in store-defined order.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Task>, TaskRepositoryError> {
        let tasks = task::Entity::find()
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Inserts a new task.
    ///
    /// # Arguments
    ///
    /// * `title` - Must not be empty.
    /// * `description` - Must not be empty.
    /// * `status` - Falls back to [`DEFAULT_STATUS`] when empty.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the row is written. Nothing is written when a required field is empty.
    #[tracing::instrument(skip(self))]
    pub async fn insert(
        &self,
        title: String,
        description: String,
        status: String,
    ) -> Result<(), TaskRepositoryError> {
        if title.is_empty() || description.is_empty() {
            return Err(TaskRepositoryError::MissingRequiredFields);
        }

        let status = if status.is_empty() {
            DEFAULT_STATUS.to_string()
        } else {
            status
        };

        let active_model = task::ActiveModel {
            title: ActiveValue::Set(title),
            description: ActiveValue::Set(description),
            status: ActiveValue::Set(status),
            ..Default::default()
        };
        task::Entity::insert(active_model)
            .exec_without_returning(self.db)
            .await?;
        Ok(())
    }

    /// Applies the provided fields to the task with the given ID and refreshes `updated_at`.
    ///
    /// # Returns
    ///
    /// The number of rows affected. An unknown ID is not an error and yields `0`.
    #[tracing::instrument(skip(self))]
    pub async fn update_partial(
        &self,
        id: i32,
        changes: TaskChanges,
    ) -> Result<u64, TaskRepositoryError> {
        let mut update = task::Entity::update_many()
            .col_expr(task::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(task::Column::Id.eq(id));
        if let Some(title) = changes.title {
            update = update.col_expr(task::Column::Title, Expr::value(title));
        }
        if let Some(description) = changes.description {
            update = update.col_expr(task::Column::Description, Expr::value(description));
        }
        if let Some(status) = changes.status {
            update = update.col_expr(task::Column::Status, Expr::value(status));
        }

        let result = update.exec(self.db).await?;
        Ok(result.rows_affected)
    }

    /// Deletes the task with the given ID.
    ///
    /// # Returns
    ///
    /// The number of rows affected. An unknown ID is not an error and yields `0`.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<u64, TaskRepositoryError> {
        let result = task::Entity::delete_by_id(id).exec(self.db).await?;
        Ok(result.rows_affected)
    }
}
