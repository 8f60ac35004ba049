//! Personal task checklist.
//!
//! Tasks are `{id, text, done}` records namespaced by [`UserId`]. The list
//! is independent of the session clock. Every successful mutation is
//! announced on a broadcast channel so views can refresh live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{TaskError, ValidationError};
use crate::identity::UserId;
use crate::storage::Database;

const CHANGE_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub text: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            done: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum TaskChange {
    Created { task: TaskRecord },
    Toggled { id: String, done: bool },
    Deleted { id: String },
}

/// Backing collection for task lists, keyed by user.
pub trait TaskStore {
    fn create(&self, user: &UserId, task: &TaskRecord) -> Result<(), TaskError>;

    /// Flip `done`. Returns the updated record.
    fn toggle(&self, user: &UserId, id: &str) -> Result<TaskRecord, TaskError>;

    fn delete(&self, user: &UserId, id: &str) -> Result<(), TaskError>;

    fn list(&self, user: &UserId) -> Result<Vec<TaskRecord>, TaskError>;
}

impl TaskStore for Database {
    fn create(&self, user: &UserId, task: &TaskRecord) -> Result<(), TaskError> {
        self.insert_task(user, task)?;
        Ok(())
    }

    fn toggle(&self, user: &UserId, id: &str) -> Result<TaskRecord, TaskError> {
        let mut task = self
            .get_task(user, id)?
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.done = !task.done;
        self.set_task_done(user, id, task.done)?;
        Ok(task)
    }

    fn delete(&self, user: &UserId, id: &str) -> Result<(), TaskError> {
        if !self.delete_task(user, id)? {
            return Err(TaskError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list(&self, user: &UserId) -> Result<Vec<TaskRecord>, TaskError> {
        Ok(self.list_tasks(user)?)
    }
}

/// One user's checklist over an injected store.
pub struct TaskList<S: TaskStore> {
    store: S,
    user: UserId,
    changes: broadcast::Sender<TaskChange>,
}

impl<S: TaskStore> TaskList<S> {
    pub fn new(store: S, user: UserId) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            store,
            user,
            changes,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }

    /// # Errors
    /// Rejects blank text before touching the store.
    pub fn create(&self, text: &str) -> crate::error::Result<TaskRecord> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty("text".into()).into());
        }
        let task = TaskRecord::new(text);
        self.store.create(&self.user, &task)?;
        tracing::debug!(user = %self.user, id = %task.id, "task created");
        self.notify(TaskChange::Created { task: task.clone() });
        Ok(task)
    }

    pub fn toggle(&self, id: &str) -> Result<TaskRecord, TaskError> {
        let task = self.store.toggle(&self.user, id)?;
        self.notify(TaskChange::Toggled {
            id: task.id.clone(),
            done: task.done,
        });
        Ok(task)
    }

    pub fn delete(&self, id: &str) -> Result<(), TaskError> {
        self.store.delete(&self.user, id)?;
        self.notify(TaskChange::Deleted { id: id.to_string() });
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<TaskRecord>, TaskError> {
        self.store.list(&self.user)
    }

    fn notify(&self, change: TaskChange) {
        let _ = self.changes.send(change);
    }
}
