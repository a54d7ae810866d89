use crate::task::{Task, TaskChanges, TaskRepository, TaskRepositoryError, TaskState};
use axum::{
    Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::num::ParseIntError;
use std::sync::Arc;
use utoipa::ToSchema;

const TASK_CREATED: &str = "Задача создана";
const TASK_UPDATED: &str = "Задача обновлена";
const TASK_DELETED: &str = "Задача удалена";

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TaskJson {
    /// Identifier assigned by the store
    pub id: i32,
    pub title: String,
    pub description: String,
    /// Free-form status, `new` unless set otherwise
    pub status: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<FixedOffset>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            status: task.status().to_string(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Response envelope shared by every task endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<TaskJson>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn with_data(data: Vec<TaskJson>) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error,
        }
    }
}

/// Request body for POST /tasks. Missing fields count as empty.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    title: Option<String>,
    description: Option<String>,
    /// Defaults to `new` when missing or empty
    status: Option<String>,
}

/// Request body for PUT /tasks/{id}. Only the provided fields are changed.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
}

impl From<UpdateTaskRequest> for TaskChanges {
    fn from(request: UpdateTaskRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            status: request.status,
        }
    }
}

/// Error type for task API handlers.
///
/// The display text of each variant is the `message` of the error envelope.
#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    #[error("Некорректный JSON")]
    MalformedJson(#[from] JsonRejection),
    #[error("ID должен быть числом")]
    InvalidId(#[source] ParseIntError),
    #[error("ID должен быть числом")]
    UndecodableId(#[source] PathRejection),
    #[error("Поля title и description обязательны")]
    MissingRequiredFields,
    #[error("Ошибка при получении задач")]
    ListFailed(#[source] TaskRepositoryError),
    #[error("Ошибка при сканировании данных")]
    DecodeFailed(#[source] TaskRepositoryError),
    #[error("Ошибка при создании задачи")]
    CreateFailed(#[source] TaskRepositoryError),
    #[error("Ошибка при обновлении задачи")]
    UpdateFailed(#[source] TaskRepositoryError),
    #[error("Ошибка при удалении задачи")]
    DeleteFailed(#[source] TaskRepositoryError),
}

impl TaskApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            TaskApiError::MalformedJson(_)
            | TaskApiError::InvalidId(_)
            | TaskApiError::UndecodableId(_)
            | TaskApiError::MissingRequiredFields => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            TaskApiError::MalformedJson(rejection) => Some(rejection.body_text()),
            TaskApiError::InvalidId(_)
            | TaskApiError::UndecodableId(_)
            | TaskApiError::MissingRequiredFields => None,
            TaskApiError::ListFailed(err)
            | TaskApiError::DecodeFailed(err)
            | TaskApiError::CreateFailed(err)
            | TaskApiError::UpdateFailed(err)
            | TaskApiError::DeleteFailed(err) => Some(err.to_string()),
        }
    }
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let envelope = Envelope::failure(self.to_string(), self.detail());
        (self.status_code(), Json(envelope)).into_response()
    }
}

/// Ids outside the `i32` range of the `SERIAL` column are rejected as invalid, never sent to the store.
fn parse_task_id(path: Result<Path<String>, PathRejection>) -> Result<i32, TaskApiError> {
    let Path(raw) = path.map_err(|rejection| {
        tracing::warn!("Undecodable ID segment: {}", rejection.body_text());
        TaskApiError::UndecodableId(rejection)
    })?;
    raw.parse::<i32>().map_err(|err| {
        tracing::warn!("Invalid ID format {:?}: {}", raw, err);
        TaskApiError::InvalidId(err)
    })
}

fn malformed_json(rejection: JsonRejection) -> TaskApiError {
    tracing::warn!("Failed to parse request body: {}", rejection.body_text());
    TaskApiError::from(rejection)
}

/// Handler for GET /tasks - Returns all tasks.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = Envelope),
        (status = 500, description = "Store or decoding failure", body = Envelope)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<(StatusCode, Json<Envelope>), TaskApiError> {
    let repository = TaskRepository::new(&state.db);

    match repository.list_all().await {
        Ok(tasks) => {
            let data = tasks.into_iter().map(TaskJson::from).collect();
            Ok((StatusCode::OK, Json(Envelope::with_data(data))))
        }
        Err(err) if err.is_decode_failure() => {
            tracing::error!("Failed to decode tasks: {}", err);
            Err(TaskApiError::DecodeFailed(err))
        }
        Err(err) => {
            tracing::error!("Failed to fetch tasks: {}", err);
            Err(TaskApiError::ListFailed(err))
        }
    }
}

/// Handler for POST /tasks - Creates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Envelope),
        (status = 400, description = "Malformed JSON or missing title/description", body = Envelope),
        (status = 500, description = "Store failure", body = Envelope)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope>), TaskApiError> {
    let Json(request) = payload.map_err(malformed_json)?;
    let title = request.title.unwrap_or_default();
    let description = request.description.unwrap_or_default();
    let status = request.status.unwrap_or_default();
    tracing::info!(
        "Creating task: title={}, description={}, status={}",
        title,
        description,
        status
    );

    let repository = TaskRepository::new(&state.db);
    match repository.insert(title, description, status).await {
        Ok(()) => {
            tracing::info!("Task created");
            Ok((StatusCode::CREATED, Json(Envelope::with_message(TASK_CREATED))))
        }
        Err(TaskRepositoryError::MissingRequiredFields) => {
            tracing::warn!("Rejected task with empty title or description");
            Err(TaskApiError::MissingRequiredFields)
        }
        Err(err) => {
            tracing::error!("Failed to insert task: {}", err);
            Err(TaskApiError::CreateFailed(err))
        }
    }
}

/// Handler for PUT /tasks/{id} - Applies a partial update.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    params(
        ("id" = i32, Path, description = "Task identifier")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated, or no task had this id", body = Envelope),
        (status = 400, description = "Non-numeric id or malformed JSON", body = Envelope),
        (status = 500, description = "Store failure", body = Envelope)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope>), TaskApiError> {
    let id = parse_task_id(path)?;
    let Json(request) = payload.map_err(malformed_json)?;
    let changes = TaskChanges::from(request);
    tracing::info!("Updating task ID {} with {:?}", id, changes);

    let repository = TaskRepository::new(&state.db);
    match repository.update_partial(id, changes).await {
        Ok(0) => {
            tracing::warn!("Update of task ID {} affected no rows", id);
            Ok((StatusCode::OK, Json(Envelope::with_message(TASK_UPDATED))))
        }
        Ok(_) => Ok((StatusCode::OK, Json(Envelope::with_message(TASK_UPDATED)))),
        Err(err) => {
            tracing::error!("Failed to update task ID {}: {}", id, err);
            Err(TaskApiError::UpdateFailed(err))
        }
    }
}

/// Handler for DELETE /tasks/{id} - Removes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(
        ("id" = i32, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Task deleted, or no task had this id", body = Envelope),
        (status = 400, description = "Non-numeric id", body = Envelope),
        (status = 500, description = "Store failure", body = Envelope)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<(StatusCode, Json<Envelope>), TaskApiError> {
    let id = parse_task_id(path)?;
    tracing::info!("Deleting task ID {}", id);

    let repository = TaskRepository::new(&state.db);
    match repository.delete(id).await {
        Ok(0) => {
            tracing::warn!("Delete of task ID {} affected no rows", id);
            Ok((StatusCode::OK, Json(Envelope::with_message(TASK_DELETED))))
        }
        Ok(_) => Ok((StatusCode::OK, Json(Envelope::with_message(TASK_DELETED)))),
        Err(err) => {
            tracing::error!("Failed to delete task ID {}: {}", id, err);
            Err(TaskApiError::DeleteFailed(err))
        }
    }
}

/// Creates and returns the task router.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            put(update_task_handler).delete(delete_task_handler),
        )
        .route(
            "/tasks/{id}/",
            put(update_task_handler).delete(delete_task_handler),
        )
        .with_state(state)
}
