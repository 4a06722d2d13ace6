pub mod invoker;

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::registry::AgentRegistry;
use crate::types::{AgentRecord, AgentReport, DispatchOutcome, DispatchRequest};
use invoker::Invoker;

/// Fans one request out to its named agents, strictly one process after
/// another, and aggregates every outcome. A dispatch never fails as a
/// whole: each requested agent gets exactly one report, in request order.
pub struct Dispatcher {
    registry: AgentRegistry,
    invoker: Arc<dyn Invoker>,
}

impl Dispatcher {
    pub fn new(registry: AgentRegistry, invoker: Arc<dyn Invoker>) -> Self {
        Self { registry, invoker }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchOutcome {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        log::info!(
            "dispatch {} started for {} agent(s)",
            id,
            request.agents.len()
        );

        let mut reports = Vec::with_capacity(request.agents.len());
        for name in &request.agents {
            let record = self
                .run_agent(name, &request.code, request.llm_api_key.as_deref())
                .await;

            if !record.is_success() {
                log::warn!(
                    "dispatch {}: agent {} failed (code {}): {}",
                    id,
                    name,
                    record.code,
                    record.error
                );
            }

            reports.push(AgentReport {
                agent: name.clone(),
                record,
            });
        }

        let outcome = DispatchOutcome {
            id,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            reports,
        };

        log::info!(
            "dispatch {} finished in {}ms ({} failure(s))",
            id,
            outcome.duration_ms,
            outcome.failure_count()
        );

        outcome
    }

    /// Every failure mode collapses into a record.
    async fn run_agent(&self, name: &str, payload: &str, credential: Option<&str>) -> AgentRecord {
        if !self.registry.is_valid_name(name) {
            return AgentRecord::failed(format!("invalid agent name: {:?}", name));
        }

        let command = match self.registry.resolve(name) {
            Some(command) => command,
            None => return AgentRecord::failed(format!("unknown agent: {}", name)),
        };

        match self.invoker.invoke(command, payload, credential).await {
            Ok(capture) => {
                AgentRecord::completed(capture.stdout, capture.stderr, capture.exit_code)
            }
            Err(e) => AgentRecord::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::invoker::{ExecCapture, InvokeError};
    use crate::registry::AgentCommand;
    use crate::types::NO_EXIT_STATUS;

    /// Echoes the payload back as stdout and records the invocation order.
    struct EchoInvoker {
        invoked: Mutex<Vec<String>>,
    }

    impl EchoInvoker {
        fn new() -> Self {
            Self {
                invoked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Invoker for EchoInvoker {
        async fn invoke(
            &self,
            command: &AgentCommand,
            payload: &str,
            credential: Option<&str>,
        ) -> Result<ExecCapture, InvokeError> {
            self.invoked
                .lock()
                .unwrap()
                .push(command.program.display().to_string());

            let mut stdout = payload.to_string();
            if let Some(key) = credential {
                stdout.push_str(key);
            }

            Ok(ExecCapture {
                stdout,
                stderr: String::new(),
                exit_code: 0,
                success: true,
            })
        }
    }

    /// Always times out.
    struct StalledInvoker;

    #[async_trait]
    impl Invoker for StalledInvoker {
        async fn invoke(
            &self,
            _command: &AgentCommand,
            _payload: &str,
            _credential: Option<&str>,
        ) -> Result<ExecCapture, InvokeError> {
            Err(InvokeError::TimedOut(30))
        }
    }

    fn registry_with(names: &[&str]) -> AgentRegistry {
        let mut registry = AgentRegistry::empty().unwrap();
        for name in names {
            registry
                .register(
                    name,
                    AgentCommand {
                        program: PathBuf::from(format!("/agents/{}_agent", name)),
                        args: Vec::new(),
                    },
                )
                .unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_dispatch_reports_in_request_order() {
        let dispatcher = Dispatcher::new(
            registry_with(&["alpha", "beta", "gamma"]),
            Arc::new(EchoInvoker::new()),
        );

        let request = DispatchRequest::new(
            vec![
                "gamma".to_string(),
                "alpha".to_string(),
                "beta".to_string(),
            ],
            "task".to_string(),
        );
        let outcome = dispatcher.dispatch(&request).await;

        let names: Vec<_> = outcome.reports.iter().map(|r| r.agent.clone()).collect();
        assert_eq!(names, vec!["gamma", "alpha", "beta"]);
        assert_eq!(outcome.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_runs_agents_sequentially() {
        let echo = Arc::new(EchoInvoker::new());
        let dispatcher = Dispatcher::new(registry_with(&["alpha", "beta"]), echo.clone());

        let request = DispatchRequest::new(
            vec!["beta".to_string(), "alpha".to_string()],
            "task".to_string(),
        );
        dispatcher.dispatch(&request).await;

        let invoked = echo.invoked.lock().unwrap().clone();
        assert_eq!(invoked, vec!["/agents/beta_agent", "/agents/alpha_agent"]);
    }

    #[tokio::test]
    async fn test_dispatch_empty_request() {
        let dispatcher = Dispatcher::new(registry_with(&[]), Arc::new(EchoInvoker::new()));

        let request = DispatchRequest::new(Vec::new(), "task".to_string());
        let outcome = dispatcher.dispatch(&request).await;

        assert!(outcome.reports.is_empty());
        assert!(outcome.results_map().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_agent_does_not_stop_others() {
        let dispatcher = Dispatcher::new(registry_with(&["alpha"]), Arc::new(EchoInvoker::new()));

        let request = DispatchRequest::new(
            vec!["ghost".to_string(), "alpha".to_string()],
            "task".to_string(),
        );
        let outcome = dispatcher.dispatch(&request).await;

        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(outcome.reports[0].record.code, NO_EXIT_STATUS);
        assert!(outcome.reports[0].record.error.contains("unknown agent"));
        assert_eq!(outcome.reports[1].record.code, 0);
        assert_eq!(outcome.reports[1].record.output, "task");
    }

    #[tokio::test]
    async fn test_dispatch_invalid_name_never_resolves() {
        let dispatcher = Dispatcher::new(registry_with(&["alpha"]), Arc::new(EchoInvoker::new()));

        let request = DispatchRequest::new(vec!["; rm -rf /".to_string()], "task".to_string());
        let outcome = dispatcher.dispatch(&request).await;

        assert_eq!(outcome.reports.len(), 1);
        assert!(outcome.reports[0]
            .record
            .error
            .contains("invalid agent name"));
        assert_eq!(outcome.reports[0].record.code, NO_EXIT_STATUS);
    }

    #[tokio::test]
    async fn test_dispatch_timeout_surfaces_in_record() {
        let dispatcher = Dispatcher::new(registry_with(&["slow"]), Arc::new(StalledInvoker));

        let request = DispatchRequest::new(vec!["slow".to_string()], "task".to_string());
        let outcome = dispatcher.dispatch(&request).await;

        let record = &outcome.reports[0].record;
        assert!(record.output.is_empty());
        assert!(record.error.contains("timed out after 30s"));
        assert_eq!(record.code, NO_EXIT_STATUS);
    }

    #[tokio::test]
    async fn test_dispatch_forwards_credential() {
        let dispatcher = Dispatcher::new(registry_with(&["alpha"]), Arc::new(EchoInvoker::new()));

        let mut request = DispatchRequest::new(vec!["alpha".to_string()], "task:".to_string());
        request.llm_api_key = Some("sk-test".to_string());
        let outcome = dispatcher.dispatch(&request).await;

        assert_eq!(outcome.reports[0].record.output, "task:sk-test");
    }
}
