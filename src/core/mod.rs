//! 核心层：错误、观察结果、步骤抽象、历史、环境状态与编排器

pub mod autopilot;
pub mod context;
pub mod error;
pub mod history;
pub mod observation;
pub mod step;

pub use autopilot::{Autopilot, SessionSnapshot, StepRuntime};
pub use context::Context;
pub use error::EngineError;
pub use history::{ChatMessage, History, HistoryNode, Role};
pub use observation::Observation;
pub use step::Step;
