use axum::{extract::{Path, State}, routing::get, Router, Json};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::application::todo_service::{normalize_patch, CreateTodo, TodoError, TodoService};
use crate::domain::todo::{Todo, TodoId, TodoPatch};
use crate::http::types::{present, truthy, ApiError, JsonBody, MessageBody};

#[derive(Clone)]
pub struct AppState<S: TodoService> { pub service: S }

pub fn router<S: TodoService + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/todos", get(list_todos::<S>).post(create_todo::<S>))
        .route("/api/todos/:id", get(get_todo::<S>).put(update_todo::<S>).delete(delete_todo::<S>))
        .with_state(state)
}

async fn list_todos<S: TodoService>(State(state): State<AppState<S>>) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.service.list().await?))
}

async fn get_todo<S: TodoService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.get(id).await?))
}

#[derive(Default, Deserialize)]
struct CreateBody { title: Option<String>, description: Option<String> }

async fn create_todo<S: TodoService>(State(state): State<AppState<S>>, JsonBody(payload): JsonBody<CreateBody>) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let todo = state.service.create(CreateTodo { title: payload.title, description: payload.description }).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

#[derive(Default, Deserialize)]
struct UpdateBody {
    title: Option<String>,
    description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    completed: Option<serde_json::Value>,
}

async fn update_todo<S: TodoService>(State(state): State<AppState<S>>, Path(id): Path<String>, JsonBody(payload): JsonBody<UpdateBody>) -> Result<Json<Todo>, ApiError> {
    // The body is checked before the id, so an empty patch is a 400 for any id.
    let patch = normalize_patch(TodoPatch {
        title: payload.title,
        description: payload.description,
        completed: payload.completed.as_ref().map(truthy),
    })?;
    let id = parse_id(&id)?;
    Ok(Json(state.service.update(id, patch).await?))
}

async fn delete_todo<S: TodoService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<MessageBody>, ApiError> {
    let id = parse_id(&id)?;
    state.service.delete(id).await?;
    Ok(Json(MessageBody { message: "Todo deleted successfully".into() }))
}

// Ids that are not integers can never have been assigned.
fn parse_id(s: &str) -> Result<TodoId, ApiError> {
    s.parse().map(TodoId).map_err(|_| TodoError::NotFound.into())
}
