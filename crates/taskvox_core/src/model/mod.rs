mod task;
mod timestamp;

pub use task::{NewTask, Priority, Task, TaskPatch};
pub use timestamp::parse_timestamp;
