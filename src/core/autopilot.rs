//! 编排器（Autopilot）：历史与环境状态的唯一归属者
//!
//! run_singular_step 是历史的唯一变更入口：追加节点 -> 执行步骤（绑定 Sdk 门面）->
//! 补记 Observation -> 通知订阅者。步骤失败默认记录为失败 Observation、会话继续，
//! 仅 handle_error = false 的步骤向调用方传播。
//! 每会话单逻辑流：同一时刻至多一个顶层步骤在执行；运行中的步骤经门面嵌套
//! 重入 run_singular_step 属正常记录路径。挂起的用户输入等待在会话拆除时
//! 以 Cancelled 结束而非无限等待。

use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{oneshot, watch, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::{
    ChatMessage, Context, EngineError, History, HistoryNode, Observation, Step,
};
use crate::host::Host;
use crate::sdk::{Models, Sdk};

/// Autopilot 面向步骤侧的窄能力接口
///
/// 门面持有它而非完整的 Autopilot，步骤作者接触不到订阅管理、输入注入等宿主侧入口。
#[async_trait]
pub trait StepRuntime: Send + Sync {
    /// 历史的唯一变更入口
    async fn run_singular_step(&self, step: Box<dyn Step>) -> Result<Observation, EngineError>;

    /// 挂起直到宿主送达用户输入；同会话至多一个挂起等待
    async fn wait_for_user_input(&self) -> Result<String, EngineError>;

    /// 向所有订阅者推送当前快照；返回时推送已完成
    async fn update_subscribers(&self);

    /// 历史快照（只读）
    async fn history(&self) -> History;

    /// 向当前执行节点追加聊天上下文
    async fn add_chat_context(&self, message: ChatMessage);

    /// 环境状态快照（只读）
    async fn context(&self) -> Context;
}

/// 推送给订阅者的会话快照
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub history: History,
    pub context: Context,
}

/// 编排器：持有历史、环境状态、用户输入挂起点与订阅通道
pub struct Autopilot {
    session_id: Uuid,
    host: Arc<dyn Host>,
    cfg: Arc<AppConfig>,
    models: Arc<Models>,
    history: Mutex<History>,
    context: Mutex<Context>,
    pending_input: Mutex<Option<oneshot::Sender<String>>>,
    state_tx: watch::Sender<SessionSnapshot>,
    cancel: CancellationToken,
    self_ref: Weak<Autopilot>,
}

impl Autopilot {
    pub fn new(host: Arc<dyn Host>, cfg: AppConfig) -> Arc<Self> {
        let cfg = Arc::new(cfg);
        let session_id = Uuid::new_v4();
        let (state_tx, _state_rx) = watch::channel(SessionSnapshot {
            session_id,
            history: History::new(),
            context: Context::new(),
        });
        tracing::info!(session_id = %session_id, "autopilot session created");

        Arc::new_cyclic(|self_ref| Self {
            session_id,
            models: Arc::new(Models::new(host.clone(), cfg.clone())),
            host,
            cfg,
            history: Mutex::new(History::new()),
            context: Mutex::new(Context::new()),
            pending_input: Mutex::new(None),
            state_tx,
            cancel: CancellationToken::new(),
            self_ref: self_ref.clone(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
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

    /// 订阅会话快照（watch 通道，慢消费者只看到最新值）
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 会话拆除：取消令牌，挂起的等待以 Cancelled 结束
    pub fn shutdown(&self) {
        tracing::info!(session_id = %self.session_id, "autopilot session shutdown");
        self.cancel.cancel();
    }

    /// 宿主侧写入环境状态
    pub async fn set_context_value(&self, key: impl Into<String>, value: serde_json::Value) {
        self.context.lock().await.set(key, value);
    }

    /// 宿主侧送达用户输入，结束挂起的等待
    pub async fn deliver_user_input(&self, input: String) -> Result<(), EngineError> {
        let sender = self.pending_input.lock().await.take();
        match sender {
            Some(tx) => tx
                .send(input)
                .map_err(|_| EngineError::StepFailed("pending wait already resolved".to_string())),
            None => Err(EngineError::StepFailed(
                "no pending user-input wait".to_string(),
            )),
        }
    }

    async fn snapshot(&self) -> SessionSnapshot {
        let history = self.history.lock().await.clone();
        let context = self.context.lock().await.clone();
        SessionSnapshot {
            session_id: self.session_id,
            history,
            context,
        }
    }
}

#[async_trait]
impl StepRuntime for Autopilot {
    async fn run_singular_step(&self, step: Box<dyn Step>) -> Result<Observation, EngineError> {
        let runtime: Arc<dyn StepRuntime> = match self.self_ref.upgrade() {
            Some(autopilot) => autopilot,
            None => return Err(EngineError::Cancelled),
        };

        let step_name = step.name().unwrap_or_else(|| "anonymous".to_string());
        let index = {
            let mut history = self.history.lock().await;
            history.append(HistoryNode::new(
                step.name(),
                step.description(),
                step.hidden(),
            ))
        };
        self.update_subscribers().await;

        let sdk = Sdk::new(
            runtime,
            self.host.clone(),
            self.cfg.clone(),
            self.models.clone(),
        );
        let start = Instant::now();
        let result = step.run(&sdk).await;

        let (ok, outcome) = match &result {
            Ok(_) => (true, "ok"),
            Err(_) => (false, "error"),
        };
        let audit = serde_json::json!({
            "event": "step_audit",
            "step": step_name,
            "index": index,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit.to_string(), "step");

        match result {
            Ok(observation) => {
                self.history
                    .lock()
                    .await
                    .record_observation(index, observation.clone());
                self.update_subscribers().await;
                Ok(observation)
            }
            Err(e) => {
                tracing::warn!(step = %step_name, error = %e, "step failed");
                let message = match &e {
                    EngineError::UserFacing { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                let observation = Observation::Error {
                    title: e.title().to_string(),
                    message,
                };
                self.history
                    .lock()
                    .await
                    .record_observation(index, observation.clone());
                self.update_subscribers().await;
                if step.handle_error() {
                    Ok(observation)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn wait_for_user_input(&self) -> Result<String, EngineError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut slot = self.pending_input.lock().await;
            if slot.is_some() {
                return Err(EngineError::StepFailed(
                    "a user-input wait is already pending".to_string(),
                ));
            }
            *slot = Some(tx);
        }

        tokio::select! {
            _ = self.cancel.cancelled() => {
                self.pending_input.lock().await.take();
                Err(EngineError::Cancelled)
            }
            input = rx => input.map_err(|_| EngineError::Cancelled),
        }
    }

    async fn update_subscribers(&self) {
        let snapshot = self.snapshot().await;
        self.state_tx.send_replace(snapshot);
    }

    async fn history(&self) -> History {
        self.history.lock().await.clone()
    }

    async fn add_chat_context(&self, message: ChatMessage) {
        if !self.history.lock().await.add_chat_context(message) {
            tracing::warn!("chat context dropped: history is empty");
        }
    }

    async fn context(&self) -> Context {
        self.context.lock().await.clone()
    }
}
