// Storage seam and page assembly
// A DataSource executes compiled plans; the assembler drives one draw request

pub mod assembler;
pub mod sea_orm_source;
pub mod source;

// Re-export commonly used items
pub use assembler::{execute, execute_plan};
pub use sea_orm_source::SeaOrmSource;
pub use source::DataSource;
