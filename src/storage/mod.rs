pub mod sqlite;

pub use sqlite::{PreviousStatus, ReportStore};
