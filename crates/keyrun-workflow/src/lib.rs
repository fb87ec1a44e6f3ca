//! The unlock -> execute -> reseal workflow around protected `.enc` files,
//! plus the one-shot encrypt/decrypt/show operations.

pub mod discovery;
pub mod error;
pub mod files;
pub mod reseal;
pub mod secrets;

pub use discovery::{Discovery, FileRecord};
pub use error::{ResealFailure, WorkflowError};
pub use reseal::{ExecReport, Workflow};
