//! 会话环境状态（Context）
//!
//! 由 Autopilot 独占持有的工作区/会话级键值状态；SDK 侧只读（拿到的是快照）。

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// 字符串键 -> JSON 值的会话状态
#[derive(Clone, Debug, Default, Serialize)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
