//! SDK 门面与编排循环集成测试

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use hive::config::AppConfig;
    use hive::fsedit::{FileSystemEdit, RangeInFile};
    use hive::host::InMemoryHost;
    use hive::llm::MockLlmClient;
    use hive::steps::WaitForUserConfirmationStep;
    use hive::{
        Autopilot, EngineError, Observation, Role, RunOptions, Sdk, Step, StepRuntime,
    };

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("hive=debug")
            .try_init();
    }

    fn autopilot_with(host: InMemoryHost) -> (Arc<InMemoryHost>, Arc<Autopilot>) {
        let host = Arc::new(host);
        let autopilot = Autopilot::new(host.clone(), AppConfig::default());
        (host, autopilot)
    }

    struct AddNoteStep;

    #[async_trait]
    impl Step for AddNoteStep {
        fn name(&self) -> Option<String> {
            Some("add note".to_string())
        }

        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            sdk.add_file("notes.txt", Some("hello".to_string())).await
        }
    }

    #[tokio::test]
    async fn test_add_file_resolves_relative_path() {
        init_tracing();
        let (host, autopilot) = autopilot_with(InMemoryHost::new("/ws"));

        let before = autopilot.history().await.len();
        autopilot
            .run_singular_step(Box::new(AddNoteStep))
            .await
            .unwrap();

        // 外层步骤 + add_file 的文件系统编辑步骤各一个节点
        let history = autopilot.history().await;
        assert_eq!(history.len(), before + 2);
        assert_eq!(history.current_index(), Some(history.len() - 1));

        assert_eq!(
            host.applied_edits(),
            vec![FileSystemEdit::AddFile {
                filepath: PathBuf::from("/ws/notes.txt"),
                content: Some("hello".to_string()),
            }]
        );
        assert_eq!(host.file("notes.txt").unwrap(), "hello");
    }

    struct RemoveBuildDirStep;

    #[async_trait]
    impl Step for RemoveBuildDirStep {
        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            sdk.delete_directory("build").await
        }
    }

    #[tokio::test]
    async fn test_delete_directory_keeps_caller_path() {
        let (host, autopilot) = autopilot_with(InMemoryHost::new("/ws"));

        autopilot
            .run_singular_step(Box::new(RemoveBuildDirStep))
            .await
            .unwrap();

        // 目录编辑携带调用方原样路径，解析结果不进入编辑
        assert_eq!(
            host.applied_edits(),
            vec![FileSystemEdit::DeleteDirectory {
                path: PathBuf::from("build"),
            }]
        );
    }

    struct ShellProbeStep {
        propagate: bool,
    }

    #[async_trait]
    impl Step for ShellProbeStep {
        fn name(&self) -> Option<String> {
            Some("shell probe".to_string())
        }

        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            if self.propagate {
                let result = sdk
                    .run(
                        "exit 3",
                        RunOptions {
                            handle_error: false,
                            ..Default::default()
                        },
                    )
                    .await;
                assert!(matches!(result, Err(EngineError::StepFailed(_))));
            } else {
                let text = sdk.run("exit 3", RunOptions::default()).await?;
                assert!(text.contains("exited with"));
            }
            Ok(Observation::None)
        }
    }

    #[tokio::test]
    async fn test_run_failure_recorded_when_handled() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/tmp"));

        autopilot
            .run_singular_step(Box::new(ShellProbeStep { propagate: false }))
            .await
            .unwrap();

        // 内层 Shell 节点记录失败 Observation，会话未中断
        let history = autopilot.history().await;
        let shell_node = history.get(1).unwrap();
        assert!(shell_node.observation.as_ref().unwrap().is_error());
        assert!(!history.get(0).unwrap().observation.as_ref().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_run_failure_propagates_when_unhandled() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/tmp"));

        autopilot
            .run_singular_step(Box::new(ShellProbeStep { propagate: true }))
            .await
            .unwrap();

        // 失败仍然记录在 Shell 节点上，传播由调用方（步骤内断言）观察
        let history = autopilot.history().await;
        assert!(history.get(1).unwrap().observation.as_ref().unwrap().is_error());
    }

    struct EchoStep;

    #[async_trait]
    impl Step for EchoStep {
        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            let text = sdk.run("echo hi", RunOptions::default()).await?;
            Ok(Observation::Text { text })
        }
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/tmp"));

        let observation = autopilot
            .run_singular_step(Box::new(EchoStep))
            .await
            .unwrap();
        assert_eq!(observation.text().trim(), "hi");
    }

    struct ChatContextProbeStep;

    #[async_trait]
    impl Step for ChatContextProbeStep {
        fn description(&self) -> Option<String> {
            Some("probing chat context".to_string())
        }

        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            // 无高亮时转录与历史派生完全一致
            let transcript = sdk.get_chat_context().await?;
            assert_eq!(transcript, sdk.history().await.to_chat_history());

            sdk.host()
                .read_file(std::path::Path::new("src/main.rs"))
                .await?;
            Ok(Observation::None)
        }
    }

    #[tokio::test]
    async fn test_chat_context_highlights_follow_transcript() {
        let host = InMemoryHost::new("/ws").with_file("src/main.rs", "fn main() {}\n");
        let (host, autopilot) = autopilot_with(host);

        autopilot
            .run_singular_step(Box::new(ChatContextProbeStep))
            .await
            .unwrap();

        host.set_highlighted(vec![RangeInFile::whole_file("/ws/src/main.rs")]);

        struct HighlightProbeStep;

        #[async_trait]
        impl Step for HighlightProbeStep {
            fn hidden(&self) -> bool {
                true
            }

            async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
                let transcript = sdk.get_chat_context().await?;
                let last = transcript.last().unwrap();
                assert_eq!(last.role, Role::User);
                assert!(last.content.contains("The following code is highlighted"));
                assert!(last.content.contains("fn main() {}"));

                // 高亮消息之前是按历史顺序的转录
                let history_part = &transcript[..transcript.len() - 1];
                assert_eq!(history_part, sdk.history().await.to_chat_history());
                Ok(Observation::None)
            }
        }

        autopilot
            .run_singular_step(Box::new(HighlightProbeStep))
            .await
            .unwrap();
    }

    struct NoteTakerStep;

    #[async_trait]
    impl Step for NoteTakerStep {
        fn description(&self) -> Option<String> {
            Some("taking notes".to_string())
        }

        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            sdk.add_chat_context("supplementary note", Role::Assistant)
                .await;
            Ok(Observation::None)
        }
    }

    #[tokio::test]
    async fn test_add_chat_context_attaches_to_current_node() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/ws"));

        autopilot
            .run_singular_step(Box::new(NoteTakerStep))
            .await
            .unwrap();

        let history = autopilot.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(0).unwrap().chat_context.len(), 1);
        assert_eq!(
            history.to_chat_history().last().unwrap().content,
            "supplementary note"
        );
    }

    struct AppendStep;

    #[async_trait]
    impl Step for AppendStep {
        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            sdk.append_to_file("journal.txt", "\nsecond line").await?;
            Ok(Observation::None)
        }
    }

    #[tokio::test]
    async fn test_append_to_file_bypasses_history() {
        let host = InMemoryHost::new("/ws").with_file("journal.txt", "first line");
        let (host, autopilot) = autopilot_with(host);

        autopilot
            .run_singular_step(Box::new(AppendStep))
            .await
            .unwrap();

        assert_eq!(host.file("journal.txt").unwrap(), "first line\nsecond line");
        // 只有外层步骤留下节点，低层追加不经过编排循环
        assert_eq!(autopilot.history().await.len(), 1);
        assert!(matches!(
            host.applied_edits().as_slice(),
            [FileSystemEdit::FileEdit { .. }]
        ));
    }

    struct RenameFnStep;

    #[async_trait]
    impl Step for RenameFnStep {
        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            sdk.edit_file("src/lib.rs", "rename the function", None, None, None)
                .await
        }
    }

    #[tokio::test]
    async fn test_edit_file_applies_model_rewrite() {
        let host = InMemoryHost::new("/ws").with_file("src/lib.rs", "fn old() {}");
        let (host, autopilot) = autopilot_with(host);
        autopilot
            .models()
            .preset_chat(Arc::new(MockLlmClient::with_response(
                "```rust\nfn renamed() {}\n```",
            )));

        autopilot
            .run_singular_step(Box::new(RenameFnStep))
            .await
            .unwrap();

        assert_eq!(host.file("src/lib.rs").unwrap(), "fn renamed() {}");
        assert_eq!(host.opened_files(), vec![PathBuf::from("/ws/src/lib.rs")]);
        // 外层步骤、改写步骤、嵌套的文件系统编辑步骤各留一个节点
        assert_eq!(autopilot.history().await.len(), 3);
    }

    struct RaiseStep;

    #[async_trait]
    impl Step for RaiseStep {
        fn name(&self) -> Option<String> {
            Some("doomed".to_string())
        }

        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            Err(sdk.raise_exception("secret missing", "Setup required", Some("doomed".into())))
        }
    }

    #[tokio::test]
    async fn test_user_facing_exception_recorded_not_fatal() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/tmp"));

        let observation = autopilot
            .run_singular_step(Box::new(RaiseStep))
            .await
            .unwrap();

        assert_eq!(
            observation,
            Observation::Error {
                title: "Setup required".to_string(),
                message: "secret missing".to_string(),
            }
        );

        // 会话未中断，可继续执行后续步骤
        let next = autopilot
            .run_singular_step(Box::new(EchoStep))
            .await
            .unwrap();
        assert_eq!(next.text().trim(), "hi");
    }

    struct LoadingMessageProbeStep;

    #[async_trait]
    impl Step for LoadingMessageProbeStep {
        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            let result = sdk.set_loading_message("busy");
            assert!(matches!(result, Err(EngineError::NotImplemented(_))));
            Ok(Observation::None)
        }
    }

    #[tokio::test]
    async fn test_set_loading_message_is_explicitly_unimplemented() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/ws"));
        autopilot
            .run_singular_step(Box::new(LoadingMessageProbeStep))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_confirmation_resumes_on_user_input() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/ws"));

        let deliverer = {
            let autopilot = autopilot.clone();
            tokio::spawn(async move {
                // 等待挂起建立后再送达
                loop {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    if autopilot.deliver_user_input("yes".to_string()).await.is_ok() {
                        break;
                    }
                }
            })
        };

        let observation = autopilot
            .run_singular_step(Box::new(WaitForUserConfirmationStep::new("Continue?")))
            .await
            .unwrap();
        deliverer.await.unwrap();

        assert_eq!(
            observation,
            Observation::UserInput {
                input: "yes".to_string(),
            }
        );
        let history = autopilot.history().await;
        assert_eq!(
            history.get(0).unwrap().description.as_deref(),
            Some("Continue?")
        );
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_wait() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/ws"));

        let pending = {
            let autopilot = autopilot.clone();
            tokio::spawn(async move {
                autopilot
                    .run_singular_step(Box::new(WaitForUserConfirmationStep::new("Proceed?")))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        autopilot.shutdown();

        // 确认步骤默认 handle_error=true：取消被记录为失败 Observation 而非挂死
        let observation = pending.await.unwrap().unwrap();
        assert!(observation.is_error());
        assert_eq!(observation.text(), "Cancelled");
    }

    struct UiProbeStep;

    #[async_trait]
    impl Step for UiProbeStep {
        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            sdk.update_ui().await;
            Ok(Observation::None)
        }
    }

    #[tokio::test]
    async fn test_update_ui_pushes_snapshot_to_subscribers() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/ws"));
        let rx = autopilot.subscribe();

        autopilot
            .run_singular_step(Box::new(UiProbeStep))
            .await
            .unwrap();

        let snapshot = rx.borrow();
        assert_eq!(snapshot.session_id, autopilot.session_id());
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history.current_index(), Some(0));
    }

    struct SecretConsumerStep;

    #[async_trait]
    impl Step for SecretConsumerStep {
        async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
            let token = sdk
                .get_user_secret("API_TOKEN", "Please add your API token")
                .await?;
            Ok(Observation::Text { text: token })
        }
    }

    #[tokio::test]
    async fn test_get_user_secret_round_trip() {
        let host = InMemoryHost::new("/ws").with_secret("API_TOKEN", "t-42");
        let (_host, autopilot) = autopilot_with(host);

        let observation = autopilot
            .run_singular_step(Box::new(SecretConsumerStep))
            .await
            .unwrap();
        assert_eq!(observation.text(), "t-42");
    }

    #[tokio::test]
    async fn test_missing_secret_recorded_as_failure() {
        let (_host, autopilot) = autopilot_with(InMemoryHost::new("/ws"));

        let observation = autopilot
            .run_singular_step(Box::new(SecretConsumerStep))
            .await
            .unwrap();
        assert!(observation.is_error());
        assert!(observation.text().contains("API_TOKEN"));
    }
}
