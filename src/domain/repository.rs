use async_trait::async_trait;
use super::todo::{NewTodo, Todo, TodoId, TodoPatch};

#[async_trait]
pub trait TodoRepository: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    /// Newest first; ties on `created_at` resolve by id descending.
    async fn list(&self) -> anyhow::Result<Vec<Todo>>;
    async fn get(&self, id: TodoId) -> anyhow::Result<Option<Todo>>;
    async fn insert(&self, input: NewTodo) -> anyhow::Result<Todo>;
    /// Returns the number of affected rows; 0 means no such id.
    async fn update(&self, id: TodoId, patch: TodoPatch) -> anyhow::Result<u64>;
    async fn delete(&self, id: TodoId) -> anyhow::Result<u64>;
    async fn close(&self);
}
