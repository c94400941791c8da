pub mod assist;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod remind;
pub mod storage;
pub mod task_store;
pub mod view_model;

pub use error::AppError;
pub use model::{NewTask, Priority, Task, TaskPatch};
pub use task_store::{TASKS_STORAGE_KEY, TaskStore};
pub use view_model::{TaskFilter, TaskListView, TaskStats};
