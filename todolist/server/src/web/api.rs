use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::task::api::v1;

/// OpenAPI description of the JSON task endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(
        v1::list_tasks_handler,
        v1::create_task_handler,
        v1::update_task_handler,
        v1::delete_task_handler
    ),
    components(schemas(
        v1::TaskJson,
        v1::Envelope,
        v1::CreateTaskRequest,
        v1::UpdateTaskRequest
    )),
    tags((name = "Tasks", description = "Todo task management"))
)]
pub struct ApiDoc;

#[tracing::instrument]
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates the router serving the OpenAPI document.
pub fn create_api_docs_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_handler))
}
