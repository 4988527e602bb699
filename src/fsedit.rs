//! 文件系统编辑原语与路径解析
//!
//! FileSystemEdit 是到达宿主边界的统一编辑表示（增删文件/目录、范围替换）；
//! RangeInFile 的 range = None 表示整个文件。ensure_absolute_path 把可能相对的
//! 逻辑路径解析到工作区根下，无缓存无副作用。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// 文本位置（0 基行号 + 行内字符号）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// 半开区间 [start, end)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// 覆盖整段内容的显式范围
    pub fn entire_file(content: &str) -> Self {
        Self {
            start: Position::new(0, 0),
            end: end_position(content),
        }
    }

    /// 收缩为单点（插入位置）
    pub fn collapsed(at: Position) -> Self {
        Self { start: at, end: at }
    }
}

/// 文件内范围；range = None 表示整个文件
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeInFile {
    pub filepath: PathBuf,
    pub range: Option<Range>,
}

impl RangeInFile {
    pub fn new(filepath: impl Into<PathBuf>, range: Range) -> Self {
        Self {
            filepath: filepath.into(),
            range: Some(range),
        }
    }

    pub fn whole_file(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            range: None,
        }
    }
}

/// 到达宿主边界的文件系统编辑
///
/// 不变式：AddFile / DeleteFile / FileEdit 的 filepath 应为工作区解析后的绝对路径；
/// 目录变体与 DeleteFile 的路径按调用方原样传递，由宿主自行解析。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FileSystemEdit {
    AddFile {
        filepath: PathBuf,
        content: Option<String>,
    },
    DeleteFile {
        filepath: PathBuf,
    },
    AddDirectory {
        path: PathBuf,
    },
    DeleteDirectory {
        path: PathBuf,
    },
    /// 范围替换；range = None 替换整个文件
    FileEdit {
        filepath: PathBuf,
        range: Option<Range>,
        replacement: String,
    },
}

impl FileSystemEdit {
    /// 一行人类可读摘要，用于 Observation 与审计日志
    pub fn describe(&self) -> String {
        match self {
            FileSystemEdit::AddFile { filepath, .. } => {
                format!("Add file {}", filepath.display())
            }
            FileSystemEdit::DeleteFile { filepath } => {
                format!("Delete file {}", filepath.display())
            }
            FileSystemEdit::AddDirectory { path } => {
                format!("Add directory {}", path.display())
            }
            FileSystemEdit::DeleteDirectory { path } => {
                format!("Delete directory {}", path.display())
            }
            FileSystemEdit::FileEdit { filepath, range, .. } => match range {
                Some(_) => format!("Edit range in {}", filepath.display()),
                None => format!("Rewrite {}", filepath.display()),
            },
        }
    }
}

/// 追加编辑：对刚重读的旧内容计算文件末尾的收缩范围，把新增内容作为替换文本
pub fn file_edit_from_append(
    filepath: impl Into<PathBuf>,
    previous_content: &str,
    appended: impl Into<String>,
) -> FileSystemEdit {
    let end = end_position(previous_content);
    FileSystemEdit::FileEdit {
        filepath: filepath.into(),
        range: Some(Range::collapsed(end)),
        replacement: appended.into(),
    }
}

/// 相对路径拼到工作区根下，绝对路径原样返回；纯函数
pub fn ensure_absolute_path(path: &Path, workspace: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// 内容末尾位置（行 = 换行数，字符 = 最后一行的字符数）
pub fn end_position(content: &str) -> Position {
    let line = content.matches('\n').count();
    let last_line_start = content.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let character = content[last_line_start..].chars().count();
    Position::new(line, character)
}

/// 把范围替换应用到内容上；range = None 替换全文
pub fn apply_range_edit(content: &str, range: Option<&Range>, replacement: &str) -> String {
    let Some(range) = range else {
        return replacement.to_string();
    };
    let start = byte_offset(content, &range.start);
    let end = byte_offset(content, &range.end).max(start);
    let mut edited = String::with_capacity(content.len() + replacement.len());
    edited.push_str(&content[..start]);
    edited.push_str(replacement);
    edited.push_str(&content[end..]);
    edited
}

/// 取出范围内的内容；range = None 返回全文
pub fn slice_range(content: &str, range: Option<&Range>) -> String {
    let Some(range) = range else {
        return content.to_string();
    };
    let start = byte_offset(content, &range.start);
    let end = byte_offset(content, &range.end).max(start);
    content[start..end].to_string()
}

/// Position -> 字节偏移；行或字符越界时收在内容末尾
fn byte_offset(content: &str, position: &Position) -> usize {
    let mut offset = 0;
    for (line_index, line) in content.split('\n').enumerate() {
        if line_index == position.line {
            let in_line = line
                .char_indices()
                .nth(position.character)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            return offset + in_line;
        }
        offset += line.len() + 1;
    }
    content.len()
}
