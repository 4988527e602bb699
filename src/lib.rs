//! Hive - 编码助手步骤编排引擎
//!
//! 模块划分：
//! - **config**: 引擎配置加载（TOML + 环境变量）
//! - **core**: 错误、观察结果、步骤抽象、历史、环境状态与编排器（Autopilot）
//! - **fsedit**: 文件系统编辑原语与路径解析
//! - **host**: 编辑器宿主接口与内存实现（测试/离线）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **project**: 工作区项目配置（.hive/config.yaml|json）
//! - **sdk**: 提供给步骤的能力门面与密钥门控模型缓存
//! - **steps**: 内置步骤（文件系统编辑、Shell、确认、模型改写）

pub mod config;
pub mod core;
pub mod fsedit;
pub mod host;
pub mod llm;
pub mod project;
pub mod sdk;
pub mod steps;

pub use crate::core::{
    Autopilot, ChatMessage, Context, EngineError, History, HistoryNode, Observation, Role,
    SessionSnapshot, Step, StepRuntime,
};
pub use crate::sdk::{Models, RunOptions, Sdk, SecretGated, ShellInput};
