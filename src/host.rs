//! 编辑器宿主接口
//!
//! 引擎消费的协作方：工作区根目录、文件读写、密钥、高亮代码。具体 IDE 传输
//! （LSP、WebSocket 等）在引擎之外实现本 trait。InMemoryHost 是内存实现，
//! 用于测试与离线运行（与 llm::MockLlmClient 的角色一致）。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::EngineError;
use crate::fsedit::{apply_range_edit, ensure_absolute_path, slice_range, FileSystemEdit, RangeInFile};

/// 宿主能力接口
///
/// 低层 I/O 错误原样向上冒泡（EngineError::Host / SecretUnavailable），
/// 不在此层转换或吞掉。
#[async_trait]
pub trait Host: Send + Sync {
    /// 当前工作区根目录（绝对路径）
    async fn workspace_directory(&self) -> Result<PathBuf, EngineError>;

    /// 请求编辑器聚焦/打开文件
    async fn set_file_open(&self, path: &Path) -> Result<(), EngineError>;

    async fn read_file(&self, path: &Path) -> Result<String, EngineError>;

    async fn read_range_in_file(&self, range: &RangeInFile) -> Result<String, EngineError>;

    /// 应用一次编辑；要么完整生效要么报错，不得以部分生效报成功
    async fn apply_filesystem_edit(&self, edit: &FileSystemEdit) -> Result<(), EngineError>;

    /// 按环境变量名取用户密钥；无法提供时返回 SecretUnavailable
    async fn get_user_secret(&self, env_var: &str) -> Result<String, EngineError>;

    /// 当前高亮的代码范围，按宿主上报顺序
    async fn get_highlighted_code(&self) -> Result<Vec<RangeInFile>, EngineError>;
}

/// 内存宿主：HashMap 文件树 + 预置密钥/高亮
///
/// 相对路径（如目录编辑按调用方原样传入的）在这里按工作区根解析。
pub struct InMemoryHost {
    workspace: PathBuf,
    files: Mutex<HashMap<PathBuf, String>>,
    directories: Mutex<Vec<PathBuf>>,
    secrets: Mutex<HashMap<String, String>>,
    highlighted: Mutex<Vec<RangeInFile>>,
    opened: Mutex<Vec<PathBuf>>,
    applied: Mutex<Vec<FileSystemEdit>>,
    secret_requests: Mutex<Vec<String>>,
}

impl InMemoryHost {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            files: Mutex::new(HashMap::new()),
            directories: Mutex::new(Vec::new()),
            secrets: Mutex::new(HashMap::new()),
            highlighted: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            applied: Mutex::new(Vec::new()),
            secret_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_secret(self, env_var: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets
            .lock()
            .expect("secrets lock")
            .insert(env_var.into(), value.into());
        self
    }

    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        let resolved = ensure_absolute_path(path.as_ref(), &self.workspace);
        self.files
            .lock()
            .expect("files lock")
            .insert(resolved, content.into());
        self
    }

    pub fn set_highlighted(&self, ranges: Vec<RangeInFile>) {
        *self.highlighted.lock().expect("highlighted lock") = ranges;
    }

    /// 当前文件内容（测试断言用）
    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        let resolved = ensure_absolute_path(path.as_ref(), &self.workspace);
        self.files.lock().expect("files lock").get(&resolved).cloned()
    }

    /// 已应用编辑的有序日志（测试断言用）
    pub fn applied_edits(&self) -> Vec<FileSystemEdit> {
        self.applied.lock().expect("applied lock").clone()
    }

    /// 已打开文件的有序日志（测试断言用）
    pub fn opened_files(&self) -> Vec<PathBuf> {
        self.opened.lock().expect("opened lock").clone()
    }

    /// 密钥请求次数日志（测试断言用）
    pub fn secret_requests(&self) -> Vec<String> {
        self.secret_requests.lock().expect("secret requests lock").clone()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        ensure_absolute_path(path, &self.workspace)
    }
}

#[async_trait]
impl Host for InMemoryHost {
    async fn workspace_directory(&self) -> Result<PathBuf, EngineError> {
        Ok(self.workspace.clone())
    }

    async fn set_file_open(&self, path: &Path) -> Result<(), EngineError> {
        self.opened.lock().expect("opened lock").push(path.to_path_buf());
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<String, EngineError> {
        let resolved = self.resolve(path);
        self.files
            .lock()
            .expect("files lock")
            .get(&resolved)
            .cloned()
            .ok_or_else(|| EngineError::Host(format!("file not found: {}", resolved.display())))
    }

    async fn read_range_in_file(&self, range: &RangeInFile) -> Result<String, EngineError> {
        let content = self.read_file(&range.filepath).await?;
        Ok(slice_range(&content, range.range.as_ref()))
    }

    async fn apply_filesystem_edit(&self, edit: &FileSystemEdit) -> Result<(), EngineError> {
        let mut files = self.files.lock().expect("files lock");
        match edit {
            FileSystemEdit::AddFile { filepath, content } => {
                let resolved = self.resolve(filepath);
                files.insert(resolved, content.clone().unwrap_or_default());
            }
            FileSystemEdit::DeleteFile { filepath } => {
                let resolved = self.resolve(filepath);
                if files.remove(&resolved).is_none() {
                    return Err(EngineError::Host(format!(
                        "file not found: {}",
                        resolved.display()
                    )));
                }
            }
            FileSystemEdit::AddDirectory { path } => {
                let resolved = self.resolve(path);
                self.directories.lock().expect("directories lock").push(resolved);
            }
            FileSystemEdit::DeleteDirectory { path } => {
                let resolved = self.resolve(path);
                self.directories
                    .lock()
                    .expect("directories lock")
                    .retain(|d| d != &resolved);
                files.retain(|p, _| !p.starts_with(&resolved));
            }
            FileSystemEdit::FileEdit {
                filepath,
                range,
                replacement,
            } => {
                let resolved = self.resolve(filepath);
                let previous = files.get(&resolved).cloned().ok_or_else(|| {
                    EngineError::Host(format!("file not found: {}", resolved.display()))
                })?;
                files.insert(resolved, apply_range_edit(&previous, range.as_ref(), replacement));
            }
        }
        drop(files);
        self.applied.lock().expect("applied lock").push(edit.clone());
        Ok(())
    }

    async fn get_user_secret(&self, env_var: &str) -> Result<String, EngineError> {
        self.secret_requests
            .lock()
            .expect("secret requests lock")
            .push(env_var.to_string());
        self.secrets
            .lock()
            .expect("secrets lock")
            .get(env_var)
            .cloned()
            .ok_or_else(|| EngineError::SecretUnavailable(env_var.to_string()))
    }

    async fn get_highlighted_code(&self) -> Result<Vec<RangeInFile>, EngineError> {
        Ok(self.highlighted.lock().expect("highlighted lock").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsedit::file_edit_from_append;

    #[tokio::test]
    async fn test_add_then_edit_file() {
        let host = InMemoryHost::new("/ws");
        host.apply_filesystem_edit(&FileSystemEdit::AddFile {
            filepath: "/ws/a.txt".into(),
            content: Some("one".into()),
        })
        .await
        .unwrap();

        let previous = host.read_file(Path::new("a.txt")).await.unwrap();
        let edit = file_edit_from_append("/ws/a.txt", &previous, "\ntwo");
        host.apply_filesystem_edit(&edit).await.unwrap();

        assert_eq!(host.file("a.txt").unwrap(), "one\ntwo");
        assert_eq!(host.applied_edits().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_file_errors() {
        let host = InMemoryHost::new("/ws");
        let err = host
            .apply_filesystem_edit(&FileSystemEdit::DeleteFile {
                filepath: "gone.txt".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Host(_)));
        assert!(host.applied_edits().is_empty());
    }

    #[tokio::test]
    async fn test_secret_lookup() {
        let host = InMemoryHost::new("/ws").with_secret("TOKEN", "t-123");
        assert_eq!(host.get_user_secret("TOKEN").await.unwrap(), "t-123");
        let err = host.get_user_secret("MISSING").await.unwrap_err();
        assert!(matches!(err, EngineError::SecretUnavailable(_)));
        assert_eq!(host.secret_requests(), vec!["TOKEN", "MISSING"]);
    }
}
