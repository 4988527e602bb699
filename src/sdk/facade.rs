//! 步骤能力门面（Sdk）
//!
//! 步骤逻辑的唯一能力面：所有特权操作（文件编辑、Shell、用户交互、密钥与模型）
//! 都经过这里。门面只持有 Autopilot 的窄能力接口（StepRuntime），不暴露编排器全貌。
//! 多数操作会构造新步骤并重新进入编排循环，使动作本身也被记入历史；
//! append_to_file 是有意的低层捷径，直接走宿主、不留独立历史节点。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{
    ChatMessage, Context, EngineError, History, Observation, Role, Step, StepRuntime,
};
use crate::fsedit::{ensure_absolute_path, file_edit_from_append, FileSystemEdit, Range, RangeInFile};
use crate::host::Host;
use crate::project::{load_project_config, ProjectConfig};
use crate::sdk::Models;
use crate::steps::{
    EditCodeStep, FileSystemEditStep, ShellCommandsStep, WaitForUserConfirmationStep,
};

/// run 的命令输入：单条命令规整为单元素序列
pub enum ShellInput {
    One(String),
    Many(Vec<String>),
}

impl ShellInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ShellInput::One(cmd) => vec![cmd],
            ShellInput::Many(cmds) => cmds,
        }
    }
}

impl From<&str> for ShellInput {
    fn from(cmd: &str) -> Self {
        ShellInput::One(cmd.to_string())
    }
}

impl From<String> for ShellInput {
    fn from(cmd: String) -> Self {
        ShellInput::One(cmd)
    }
}

impl From<Vec<String>> for ShellInput {
    fn from(cmds: Vec<String>) -> Self {
        ShellInput::Many(cmds)
    }
}

impl From<Vec<&str>> for ShellInput {
    fn from(cmds: Vec<&str>) -> Self {
        ShellInput::Many(cmds.into_iter().map(String::from).collect())
    }
}

/// run 的可选项；handle_error 默认 true（失败记录为失败 Observation，不向外抛）
pub struct RunOptions {
    pub cwd: Option<PathBuf>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub handle_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            name: None,
            description: None,
            handle_error: true,
        }
    }
}

/// 提供给步骤的能力门面
pub struct Sdk {
    runtime: Arc<dyn StepRuntime>,
    host: Arc<dyn Host>,
    cfg: Arc<AppConfig>,
    models: Arc<Models>,
}

impl Sdk {
    pub(crate) fn new(
        runtime: Arc<dyn StepRuntime>,
        host: Arc<dyn Host>,
        cfg: Arc<AppConfig>,
        models: Arc<Models>,
    ) -> Self {
        Self {
            runtime,
            host,
            cfg,
            models,
        }
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn models(&self) -> &Models {
        &self.models
    }

    /// 历史快照（只读）
    pub async fn history(&self) -> History {
        self.runtime.history().await
    }

    /// 会话环境状态快照（只读）
    pub async fn context(&self) -> Context {
        self.runtime.context().await
    }

    async fn ensure_absolute_path(&self, path: &Path) -> Result<PathBuf, EngineError> {
        let workspace = self.host.workspace_directory().await?;
        Ok(ensure_absolute_path(path, &workspace))
    }

    /// 经编排循环执行步骤；步骤抛出的错误原样传播，不吞不换
    pub async fn run_step(&self, step: Box<dyn Step>) -> Result<Observation, EngineError> {
        self.runtime.run_singular_step(step).await
    }

    /// 把编辑包成文件系统编辑步骤执行；追加一个历史节点
    pub async fn apply_filesystem_edit(
        &self,
        edit: FileSystemEdit,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Observation, EngineError> {
        let mut step = FileSystemEditStep::new(edit);
        if let Some(name) = name {
            step = step.with_name(name);
        }
        if let Some(description) = description {
            step = step.with_description(description);
        }
        self.run_step(Box::new(step)).await
    }

    /// 执行 Shell 命令（单条或序列），返回捕获的文本输出
    ///
    /// handle_error = false 时命令失败向调用方传播而非转成已记录的失败 Observation。
    pub async fn run(
        &self,
        commands: impl Into<ShellInput> + Send,
        options: RunOptions,
    ) -> Result<String, EngineError> {
        let mut step = ShellCommandsStep::new(commands.into().into_vec())
            .with_handle_error(options.handle_error)
            .with_timeout(self.cfg.shell.timeout_secs);
        if let Some(cwd) = options.cwd {
            step = step.with_cwd(cwd);
        }
        if let Some(name) = options.name {
            step = step.with_name(name);
        }
        if let Some(description) = options.description {
            step = step.with_description(description);
        }
        let observation = self.run_step(Box::new(step)).await?;
        Ok(observation.text().to_string())
    }

    /// 模型驱动的文件改写：解析路径、请求宿主聚焦文件、读取当前内容后执行改写步骤
    pub async fn edit_file(
        &self,
        filename: impl AsRef<Path> + Send,
        prompt: &str,
        range: Option<Range>,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Observation, EngineError> {
        let filepath = self.ensure_absolute_path(filename.as_ref()).await?;
        self.host.set_file_open(&filepath).await?;
        let contents = self.host.read_file(&filepath).await?;

        let range = range.unwrap_or_else(|| Range::entire_file(&contents));
        let mut step = EditCodeStep::new(vec![RangeInFile::new(filepath, range)], prompt);
        if let Some(name) = name {
            step = step.with_name(name);
        }
        if let Some(description) = description {
            step = step.with_description(description);
        }
        self.run_step(Box::new(step)).await
    }

    /// 低层追加：紧贴计算差异前重读旧内容，直接经宿主应用（不留独立历史节点）
    pub async fn append_to_file(
        &self,
        filename: impl AsRef<Path> + Send,
        content: &str,
    ) -> Result<(), EngineError> {
        let filepath = self.ensure_absolute_path(filename.as_ref()).await?;
        let previous = self.host.read_file(&filepath).await?;
        let edit = file_edit_from_append(filepath, &previous, content);
        self.host.apply_filesystem_edit(&edit).await
    }

    pub async fn add_file(
        &self,
        filename: impl AsRef<Path> + Send,
        content: Option<String>,
    ) -> Result<Observation, EngineError> {
        let filepath = self.ensure_absolute_path(filename.as_ref()).await?;
        self.run_step(Box::new(FileSystemEditStep::new(FileSystemEdit::AddFile {
            filepath,
            content,
        })))
        .await
    }

    /// 删除路径按调用方原样进入编辑，由宿主自行解析
    pub async fn delete_file(
        &self,
        filename: impl AsRef<Path> + Send,
    ) -> Result<Observation, EngineError> {
        let _filepath = self.ensure_absolute_path(filename.as_ref()).await?;
        self.run_step(Box::new(FileSystemEditStep::new(
            FileSystemEdit::DeleteFile {
                filepath: filename.as_ref().to_path_buf(),
            },
        )))
        .await
    }

    /// 目录路径按调用方原样进入编辑，由宿主自行解析
    pub async fn add_directory(
        &self,
        path: impl AsRef<Path> + Send,
    ) -> Result<Observation, EngineError> {
        let _resolved = self.ensure_absolute_path(path.as_ref()).await?;
        self.run_step(Box::new(FileSystemEditStep::new(
            FileSystemEdit::AddDirectory {
                path: path.as_ref().to_path_buf(),
            },
        )))
        .await
    }

    /// 目录路径按调用方原样进入编辑，由宿主自行解析
    pub async fn delete_directory(
        &self,
        path: impl AsRef<Path> + Send,
    ) -> Result<Observation, EngineError> {
        let _resolved = self.ensure_absolute_path(path.as_ref()).await?;
        self.run_step(Box::new(FileSystemEditStep::new(
            FileSystemEdit::DeleteDirectory {
                path: path.as_ref().to_path_buf(),
            },
        )))
        .await
    }

    /// 向宿主取密钥；prompt 是密钥缺失时的提示文案（仅日志/UI 参考）
    pub async fn get_user_secret(
        &self,
        env_var: &str,
        prompt: &str,
    ) -> Result<String, EngineError> {
        tracing::debug!(env_var = %env_var, prompt = %prompt, "requesting user secret");
        self.host.get_user_secret(env_var).await
    }

    /// 挂起直到宿主送达用户输入；会话拆除时以 Cancelled 失败
    pub async fn wait_for_user_input(&self) -> Result<String, EngineError> {
        self.runtime.wait_for_user_input().await
    }

    /// 运行确认步骤（挂起直到宿主确认）
    pub async fn wait_for_user_confirmation(
        &self,
        prompt: &str,
    ) -> Result<Observation, EngineError> {
        self.run_step(Box::new(WaitForUserConfirmationStep::new(prompt)))
            .await
    }

    /// 聊天上下文：历史转录在前，随后每个宿主高亮范围一条围栏代码消息（宿主顺序）
    pub async fn get_chat_context(&self) -> Result<Vec<ChatMessage>, EngineError> {
        let mut messages = self.runtime.history().await.to_chat_history();
        for rif in self.host.get_highlighted_code().await? {
            let code = self.host.read_range_in_file(&rif).await?;
            messages.push(ChatMessage::user(format!(
                "The following code is highlighted:\n```\n{}\n```",
                code
            )));
        }
        Ok(messages)
    }

    /// 向当前正在执行的历史节点追加聊天上下文（不产生新节点）
    pub async fn add_chat_context(&self, content: impl Into<String> + Send, role: Role) {
        self.runtime
            .add_chat_context(ChatMessage {
                role,
                content: content.into(),
            })
            .await;
    }

    /// 工作区项目配置（YAML 优先于 JSON，无合并；命中文件损坏则报错）
    pub async fn project_config(&self) -> Result<ProjectConfig, EngineError> {
        load_project_config(self.host.as_ref()).await
    }

    /// 构造用户可见异常，由步骤 `return Err(...)` 抛出
    pub fn raise_exception(
        &self,
        message: impl Into<String>,
        title: impl Into<String>,
        step_name: Option<String>,
    ) -> EngineError {
        EngineError::UserFacing {
            message: message.into(),
            title: title.into(),
            step_name,
        }
    }

    /// 预留操作：必须显式失败，不得静默成功
    pub fn set_loading_message(&self, _message: &str) -> Result<(), EngineError> {
        Err(EngineError::NotImplemented("set_loading_message"))
    }

    /// 请求编排器向所有订阅者推送最新状态；返回时通知已完成
    pub async fn update_ui(&self) {
        self.runtime.update_subscribers().await;
    }
}
