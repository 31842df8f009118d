//! Tests for startup orchestration.

#[cfg(test)]
mod tests {
    use crate::server::{ServerConfig, ServerHandle, ServerLauncher, TcpLauncher};
    use crate::startup::failure::{
        LaunchError, StartupFailure, ADDR_IN_USE_CODE, TROUBLESHOOTING_URL,
    };
    use crate::startup::hook::{failure_channel, route_panics_to, FailureSender};
    use crate::startup::orchestrator::{Orchestrator, StartupOutcome, StartupState, READY_NOTICE};
    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(port: u16, cache_dir: &Path) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            roots: vec![PathBuf::from("/project/src")],
            asset_roots: Vec::new(),
            asset_exts: Vec::new(),
            skipflow: false,
            non_persistent: false,
            transformer: PathBuf::from("/opt/transformer.js"),
            reset_cache: false,
            verbose: false,
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    fn local_addr() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn orchestrator(port: u16) -> Orchestrator<Vec<u8>, Vec<u8>> {
        Orchestrator::new(
            port,
            vec![PathBuf::from("/project/src"), PathBuf::from("/linked/pkg")],
            Vec::new(),
        )
        .with_err(Vec::new())
        .without_panic_routing()
    }

    fn output(orchestrator: &Orchestrator<Vec<u8>, Vec<u8>>) -> String {
        String::from_utf8(orchestrator.output().clone()).unwrap()
    }

    fn err_output(orchestrator: &Orchestrator<Vec<u8>, Vec<u8>>) -> String {
        String::from_utf8(orchestrator.err_output().clone()).unwrap()
    }

    struct ReadyLauncher;

    impl ServerLauncher for ReadyLauncher {
        async fn launch(
            &self,
            _config: &ServerConfig,
            _failures: FailureSender,
        ) -> Result<ServerHandle, LaunchError> {
            Ok(ServerHandle::detached(local_addr()))
        }
    }

    struct FailingLauncher(LaunchError);

    impl ServerLauncher for FailingLauncher {
        async fn launch(
            &self,
            _config: &ServerConfig,
            _failures: FailureSender,
        ) -> Result<ServerHandle, LaunchError> {
            Err(self.0.clone())
        }
    }

    /// Reports through the channel and never finishes launching.
    struct ReportingLauncher;

    impl ServerLauncher for ReportingLauncher {
        async fn launch(
            &self,
            _config: &ServerConfig,
            failures: FailureSender,
        ) -> Result<ServerHandle, LaunchError> {
            failures.report(LaunchError::new("watcher crashed").with_stack_trace("at watch()"));
            std::future::pending().await
        }
    }

    /// Starts fine, then reports a failure from a background task.
    struct LateFailureLauncher;

    impl ServerLauncher for LateFailureLauncher {
        async fn launch(
            &self,
            _config: &ServerConfig,
            failures: FailureSender,
        ) -> Result<ServerHandle, LaunchError> {
            let task = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                failures.report(LaunchError::new("accept failed"));
            });
            Ok(ServerHandle::new(local_addr(), task))
        }
    }

    /// Spawns a task that panics, then waits forever.
    struct PanickingLauncher;

    impl ServerLauncher for PanickingLauncher {
        async fn launch(
            &self,
            _config: &ServerConfig,
            _failures: FailureSender,
        ) -> Result<ServerHandle, LaunchError> {
            tokio::spawn(async {
                panic!("transformer blew up");
            });
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_ready_on_successful_launch() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(8081);
        assert_eq!(orchestrator.state(), StartupState::Idle);

        let outcome = orchestrator
            .start(&ReadyLauncher, &config(8081, temp_dir.path()))
            .await
            .unwrap();

        assert!(matches!(outcome, StartupOutcome::Ready(_)));
        assert_eq!(orchestrator.state(), StartupState::Ready);

        let text = output(&orchestrator);
        assert!(text.contains("Running packager on port 8081."));
        assert!(text.contains("Looking for JS files in\n   /project/src\n   /linked/pkg\n"));
        assert_eq!(text.matches(READY_NOTICE).count(), 1);
        assert!(!text.contains("ERROR"));
        assert!(!text.contains(TROUBLESHOOTING_URL));
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(8081);
        let config = config(8081, temp_dir.path());

        orchestrator.start(&ReadyLauncher, &config).await.unwrap();
        let err = orchestrator.start(&ReadyLauncher, &config).await.unwrap_err();

        assert_eq!(err.0, StartupState::Ready);
        assert_eq!(output(&orchestrator).matches(READY_NOTICE).count(), 1);
    }

    #[tokio::test]
    async fn test_addr_in_use_gives_port_remediation() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(9090);
        let launcher = FailingLauncher(
            LaunchError::new("listen EADDRINUSE :::9090")
                .with_code(ADDR_IN_USE_CODE)
                .with_stack_trace("at listen()"),
        );

        let outcome = orchestrator
            .start(&launcher, &config(9090, temp_dir.path()))
            .await
            .unwrap();

        match outcome {
            StartupOutcome::Failed(failure) => {
                assert_eq!(failure, StartupFailure::PortInUse { port: 9090 })
            }
            StartupOutcome::Ready(_) => panic!("expected failure"),
        }
        assert_eq!(orchestrator.state(), StartupState::Failed);

        let text = output(&orchestrator);
        assert!(text.contains("can't listen on port 9090"));
        assert!(text.contains("lsof -n -i4TCP:9090"));
        assert!(text.contains(TROUBLESHOOTING_URL));
        assert!(!text.contains("at listen()"));
        assert!(!text.contains(READY_NOTICE));
    }

    #[tokio::test]
    async fn test_other_error_reports_message_and_stack() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(8081);
        let launcher = FailingLauncher(
            LaunchError::new("Cannot find transformer")
                .with_code("ENOENT")
                .with_attribute("path", "/opt/transformer.js")
                .with_stack_trace("at loadTransformer()\nat launch()"),
        );

        let outcome = orchestrator
            .start(&launcher, &config(8081, temp_dir.path()))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            StartupOutcome::Failed(StartupFailure::Generic { .. })
        ));
        assert_eq!(orchestrator.state(), StartupState::Failed);

        let text = output(&orchestrator);
        assert!(text.contains(" ERROR  Cannot find transformer"));
        assert!(text.contains(TROUBLESHOOTING_URL));
        assert!(!text.contains("lsof"));
        assert!(!text.contains("at loadTransformer()"));

        let details = err_output(&orchestrator);
        assert!(details.contains(r#"{"path":"/opt/transformer.js"}"#));
        assert!(details.contains("at loadTransformer()\nat launch()"));
    }

    #[tokio::test]
    async fn test_reported_error_fails_startup() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(8081);

        let outcome = orchestrator
            .start(&ReportingLauncher, &config(8081, temp_dir.path()))
            .await
            .unwrap();

        match outcome {
            StartupOutcome::Failed(StartupFailure::Generic {
                message,
                stack_trace,
                ..
            }) => {
                assert_eq!(message, "watcher crashed");
                assert_eq!(stack_trace, "at watch()");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_after_ready_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(8081);

        let outcome = orchestrator
            .start(&LateFailureLauncher, &config(8081, temp_dir.path()))
            .await
            .unwrap();
        let running = match outcome {
            StartupOutcome::Ready(running) => running,
            StartupOutcome::Failed(failure) => panic!("unexpected failure: {:?}", failure),
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        let failure = running.wait(&mut out, &mut err).await;
        assert!(matches!(
            failure,
            Some(StartupFailure::Generic { ref message, .. }) if message == "accept failed"
        ));
        assert!(String::from_utf8(out).unwrap().contains("accept failed"));
    }

    #[tokio::test]
    async fn test_tcp_launcher_port_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();
        let mut orchestrator = orchestrator(port);

        let outcome = orchestrator
            .start(&TcpLauncher, &config(port, temp_dir.path()))
            .await
            .unwrap();

        match outcome {
            StartupOutcome::Failed(failure) => {
                assert_eq!(failure, StartupFailure::PortInUse { port })
            }
            StartupOutcome::Ready(_) => panic!("port {} should be taken", port),
        }
        assert!(output(&orchestrator).contains(&format!("lsof -n -i4TCP:{}", port)));
    }

    #[tokio::test]
    async fn test_tcp_launcher_ready() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(0);

        let outcome = orchestrator
            .start(&TcpLauncher, &config(0, temp_dir.path()))
            .await
            .unwrap();

        match outcome {
            StartupOutcome::Ready(running) => {
                assert_ne!(running.handle().local_addr().port(), 0);
            }
            StartupOutcome::Failed(failure) => panic!("unexpected failure: {:?}", failure),
        }
        assert_eq!(orchestrator.state(), StartupState::Ready);
    }

    #[tokio::test]
    async fn test_panic_in_server_task_fails_startup() {
        let temp_dir = TempDir::new().unwrap();
        let mut orchestrator = Orchestrator::new(8081, Vec::new(), Vec::new()).with_err(Vec::new());

        let outcome = orchestrator
            .start(&PanickingLauncher, &config(8081, temp_dir.path()))
            .await
            .unwrap();

        match outcome {
            StartupOutcome::Failed(StartupFailure::Generic { message, attributes, .. }) => {
                assert_eq!(message, "panic: transformer blew up");
                assert!(attributes.iter().any(|(key, _)| key == "location"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // the hook is already in place; routing again only swaps the channel
        let (sender, _receiver) = failure_channel();
        assert!(!route_panics_to(sender));
    }
}
