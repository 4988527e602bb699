//! 模型驱动的代码改写步骤
//!
//! 读取每个范围的当前代码，带指令请求聊天模型重写，剥掉返回的代码围栏后，
//! 把改写结果作为 FileEdit 经编排循环应用（每次应用都留下历史节点）。

use async_trait::async_trait;

use crate::core::{ChatMessage, EngineError, Observation, Step};
use crate::fsedit::{FileSystemEdit, RangeInFile};
use crate::sdk::Sdk;

const EDIT_SYSTEM_PROMPT: &str = "You are an expert programmer. \
Rewrite the code the user provides according to their instruction. \
Reply with only the rewritten code inside a single fenced code block, no commentary.";

/// 代码改写步骤：范围列表 + 用户指令
pub struct EditCodeStep {
    range_in_files: Vec<RangeInFile>,
    user_input: String,
    name: Option<String>,
    description: Option<String>,
}

impl EditCodeStep {
    pub fn new(range_in_files: Vec<RangeInFile>, user_input: impl Into<String>) -> Self {
        Self {
            range_in_files,
            user_input: user_input.into(),
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
}

#[async_trait]
impl Step for EditCodeStep {
    fn name(&self) -> Option<String> {
        self.name.clone().or_else(|| Some("Edit code".to_string()))
    }

    fn description(&self) -> Option<String> {
        self.description
            .clone()
            .or_else(|| Some(self.user_input.clone()))
    }

    async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
        let model = sdk.models().chat().await?;

        for rif in &self.range_in_files {
            let code = sdk.host().read_range_in_file(rif).await?;
            let messages = vec![
                ChatMessage::system(EDIT_SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "```\n{}\n```\n\nInstruction: {}",
                    code, self.user_input
                )),
            ];
            let completion = model.complete(&messages).await.map_err(EngineError::Llm)?;
            let replacement = strip_code_block(&completion);

            let edit = FileSystemEdit::FileEdit {
                filepath: rif.filepath.clone(),
                range: rif.range,
                replacement,
            };
            let description = format!("Rewrite per: {}", self.user_input);
            sdk.apply_filesystem_edit(edit, None, Some(&description))
                .await?;
        }

        Ok(Observation::Text {
            text: format!("Edited {} range(s)", self.range_in_files.len()),
        })
    }
}

/// 剥掉 Markdown 代码围栏（含语言标注行）；无围栏时原样返回去首尾空白
pub(crate) fn strip_code_block(completion: &str) -> String {
    let trimmed = completion.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let body = match trimmed.find('\n') {
        Some(i) => &trimmed[i + 1..],
        None => return String::new(),
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim_end_matches('\n').to_string()
}
