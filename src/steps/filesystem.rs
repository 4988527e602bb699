//! 文件系统编辑步骤
//!
//! 携带一个 FileSystemEdit，经宿主的编辑应用接口提交；对调用方而言要么整体生效
//! 要么失败，失败不会被记为成功。经 Autopilot 运行即在历史中留下一个节点。

use async_trait::async_trait;

use crate::core::{EngineError, Observation, Step};
use crate::fsedit::FileSystemEdit;
use crate::sdk::Sdk;

/// 文件系统编辑步骤：单个编辑的提交与记录
pub struct FileSystemEditStep {
    edit: FileSystemEdit,
    name: Option<String>,
    description: Option<String>,
}

impl FileSystemEditStep {
    pub fn new(edit: FileSystemEdit) -> Self {
        Self {
            edit,
            name: None,
            description: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn edit(&self) -> &FileSystemEdit {
        &self.edit
    }
}

#[async_trait]
impl Step for FileSystemEditStep {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn description(&self) -> Option<String> {
        self.description
            .clone()
            .or_else(|| Some(self.edit.describe()))
    }

    async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
        sdk.host().apply_filesystem_edit(&self.edit).await?;
        Ok(Observation::Text {
            text: self.edit.describe(),
        })
    }
}
