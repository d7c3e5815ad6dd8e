//! Built-in sandbox tools

mod edit_file;
mod read_file;
mod run_command;
mod todo;

pub use edit_file::EditFileTool;
pub use read_file::ReadFileTool;
pub use run_command::RunCommandTool;
pub use todo::TodoTool;
