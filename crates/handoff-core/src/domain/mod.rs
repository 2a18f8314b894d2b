//! Domain model (IDs, task state, ledger records).

pub mod ids;
pub mod record;
pub mod status;

pub use ids::{IdParseError, TaskId};
pub use record::TaskRecord;
pub use status::{TaskState, TaskStatus};
