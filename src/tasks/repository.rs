//! Task CRUD over the HTTP pipeline.
//!
//! The repository holds no task state. Every call is answered by the server,
//! and after any mutation callers re-fetch what they display:
//!
//! ```no_run
//! # use taskdeck::{TaskFilter, TaskRepository};
//! # async fn refresh(repo: &TaskRepository, filter: TaskFilter) -> taskdeck::Result<()> {
//! repo.create("Buy milk", "").await?;
//! let tasks = repo.list(filter).await?;
//! let stats = repo.stats().await?;
//! # let _ = (tasks, stats);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::types::{NewTask, StatsSnapshot, Task, TaskFilter, TaskUpdate};

const API: &str = "api";
const TODOS: &str = "todos";

/// Remote task collection.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    api: Arc<ApiClient>,
}

fn not_found(id: &str) -> impl FnOnce(Error) -> Error + '_ {
    move |err| match err {
        Error::Http { status: 404, .. } => Error::NotFound {
            resource: "task",
            id: id.to_string(),
        },
        other => other,
    }
}

impl TaskRepository {
    /// Create a repository calling the server through `api`.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Tasks matching `filter`, in server order.
    ///
    /// [`TaskFilter::All`] sends no `status` parameter.
    ///
    /// # Errors
    ///
    /// Any pipeline error.
    pub async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let url = match filter.status() {
            Some(status) => self.api.url(&[API, TODOS], &[("status", status.as_str())])?,
            None => self.api.url(&[API, TODOS], &[])?,
        };
        let tasks: Vec<Task> = self.api.get_json(url).await?;
        tracing::debug!(?filter, count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    /// One task by id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the server has no such task, otherwise any
    /// pipeline error.
    pub async fn get(&self, id: &str) -> Result<Task> {
        let url = self.api.url(&[API, TODOS, id], &[])?;
        self.api.get_json(url).await.map_err(not_found(id))
    }

    /// Create a pending task.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a blank title, in which case nothing is
    /// sent; otherwise any pipeline error.
    pub async fn create(&self, title: &str, description: &str) -> Result<Task> {
        let body = NewTask::new(title, description)?;
        self.create_task(&body).await
    }

    /// Create a task from a prepared body.
    ///
    /// # Errors
    ///
    /// Any pipeline error.
    pub async fn create_task(&self, body: &NewTask) -> Result<Task> {
        let url = self.api.url(&[API, TODOS], &[])?;
        let task: Task = self.api.post_json(url, body).await?;
        tracing::info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Apply `update` to task `id` and return the server's record.
    ///
    /// Nothing is patched locally.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a blank title (nothing is sent),
    /// [`Error::NotFound`] for an unknown id, otherwise any pipeline error.
    pub async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task> {
        update.validate()?;
        let url = self.api.url(&[API, TODOS, id], &[])?;
        let task: Task = self.api.put_json(url, update).await.map_err(not_found(id))?;
        tracing::info!(task_id = %task.id, status = %task.status, "task updated");
        Ok(task)
    }

    /// Flip `task` between pending and completed.
    ///
    /// # Errors
    ///
    /// As [`update`](Self::update).
    pub async fn toggle_status(&self, task: &Task) -> Result<Task> {
        self.update(&task.id, &TaskUpdate::new().status(task.status.toggled()))
            .await
    }

    /// Delete task `id`.
    ///
    /// Deleting twice fails the second time.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown id, otherwise any pipeline error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = self.api.url(&[API, TODOS, id], &[])?;
        self.api.delete(url).await.map_err(not_found(id))?;
        tracing::info!(task_id = id, "task deleted");
        Ok(())
    }

    /// Summary counts, computed by the server.
    ///
    /// # Errors
    ///
    /// Any pipeline error.
    pub async fn stats(&self) -> Result<StatsSnapshot> {
        let url = self.api.url(&[API, TODOS, "stats", "summary"], &[])?;
        self.api.get_json(url).await
    }
}
