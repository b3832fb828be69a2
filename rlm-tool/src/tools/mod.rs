//! Built-in sandbox tool implementations (§4.5).

pub mod bash;
pub mod edit_file;
pub mod glob_tool;
pub mod grep;
pub mod ls;
pub mod read_file;
pub mod write_file;

pub use bash::Bash;
pub use edit_file::EditFile;
pub use glob_tool::Glob;
pub use grep::Grep;
pub use ls::Ls;
pub use read_file::ReadFile;
pub use write_file::WriteFile;
