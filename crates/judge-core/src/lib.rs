pub mod error;
pub mod types;

pub use error::JudgeError;
pub use types::{JobStatus, Language};
