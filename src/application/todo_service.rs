use crate::domain::repository::TodoRepository;
use crate::domain::todo::{NewTodo, Todo, TodoId, TodoPatch};
use async_trait::async_trait;
use thiserror::Error;

pub const TITLE_REQUIRED: &str = "Title is required";
pub const NO_FIELDS_TO_UPDATE: &str = "No fields to update";

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Todo not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TodoError>;

/// Raw create input as received; trimming and validation happen in the service.
#[derive(Debug, Clone, Default)]
pub struct CreateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[async_trait]
pub trait TodoService: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<Todo>>;
    async fn get(&self, id: TodoId) -> Result<Todo>;
    async fn create(&self, input: CreateTodo) -> Result<Todo>;
    async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo>;
    async fn delete(&self, id: TodoId) -> Result<()>;
}

#[derive(Clone)]
pub struct TodoServiceImpl<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoServiceImpl<R> {
    pub fn new(repo: R) -> Self { Self { repo } }
}

#[async_trait]
impl<R: TodoRepository> TodoService for TodoServiceImpl<R> {
    async fn list(&self) -> Result<Vec<Todo>> { Ok(self.repo.list().await?) }

    async fn get(&self, id: TodoId) -> Result<Todo> {
        self.repo.get(id).await?.ok_or(TodoError::NotFound)
    }

    async fn create(&self, input: CreateTodo) -> Result<Todo> {
        let title = input.title.as_deref().map(trim_input).unwrap_or_default();
        if title.is_empty() {
            return Err(TodoError::Validation(TITLE_REQUIRED));
        }
        let description = input.description.as_deref().map(trim_input).unwrap_or_default();
        let todo = self.repo.insert(NewTodo { title: title.to_owned(), description: description.to_owned() }).await?;
        tracing::debug!(id = todo.id.0, "todo created");
        Ok(todo)
    }

    async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo> {
        let patch = normalize_patch(patch)?;
        if self.repo.update(id, patch).await? == 0 {
            return Err(TodoError::NotFound);
        }
        // Not atomic with the update: a delete in between turns this into NotFound.
        self.repo.get(id).await?.ok_or(TodoError::NotFound)
    }

    async fn delete(&self, id: TodoId) -> Result<()> {
        match self.repo.delete(id).await? {
            0 => Err(TodoError::NotFound),
            _ => {
                tracing::debug!(id = id.0, "todo deleted");
                Ok(())
            }
        }
    }
}

/// Rejects empty patches and blank titles, trimming the text slots.
pub fn normalize_patch(patch: TodoPatch) -> Result<TodoPatch> {
    if patch.is_empty() {
        return Err(TodoError::Validation(NO_FIELDS_TO_UPDATE));
    }
    let title = match patch.title.as_deref().map(trim_input) {
        Some("") => return Err(TodoError::Validation(TITLE_REQUIRED)),
        other => other.map(str::to_owned),
    };
    Ok(TodoPatch {
        title,
        description: patch.description.as_deref().map(|d| trim_input(d).to_owned()),
        completed: patch.completed,
    })
}

// Unicode whitespace plus the byte order mark, which `str::trim` keeps.
pub fn trim_input(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}
