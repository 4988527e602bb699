//! 内置步骤：文件系统编辑、Shell、用户确认、模型改写
//!
//! 步骤家族是开放集合；宿主可在引擎外实现 Step trait 接入新种类。

pub mod confirm;
pub mod edit_code;
pub mod filesystem;
pub mod shell;

pub use confirm::WaitForUserConfirmationStep;
pub use edit_code::EditCodeStep;
pub use filesystem::FileSystemEditStep;
pub use shell::ShellCommandsStep;
