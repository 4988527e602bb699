//! SDK 层：步骤能力门面与模型资源缓存

pub mod facade;
pub mod models;

pub use facade::{RunOptions, Sdk, ShellInput};
pub use models::{Models, SecretGated, SharedLlm};
