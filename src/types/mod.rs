use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type DispatchId = Uuid;

/// Exit code reported when an agent produced no exit status
/// (timeout, spawn failure, unknown name).
pub const NO_EXIT_STATUS: i32 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub agents: Vec<String>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_api_key: Option<String>,
}

impl DispatchRequest {
    pub fn new(agents: Vec<String>, code: String) -> Self {
        Self {
            agents,
            code,
            llm_api_key: None,
        }
    }
}

/// Captured result of one agent invocation: stdout, stderr (or the
/// failure text when the process never produced a status), exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub output: String,
    pub error: String,
    pub code: i32,
}

impl AgentRecord {
    pub fn completed(output: String, error: String, code: i32) -> Self {
        Self {
            output,
            error,
            code,
        }
    }

    /// Record for an invocation that never reached an exit status.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: reason.into(),
            code: NO_EXIT_STATUS,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent: String,
    #[serde(flatten)]
    pub record: AgentRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub id: DispatchId,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub reports: Vec<AgentReport>,
}

impl DispatchOutcome {
    /// Agent name -> record mapping, keyed in request order.
    pub fn results_map(&self) -> Map<String, Value> {
        let mut results = Map::new();
        for report in &self.reports {
            results.insert(
                report.agent.clone(),
                serde_json::json!({
                    "output": report.record.output,
                    "error": report.record.error,
                    "code": report.record.code,
                }),
            );
        }
        results
    }

    pub fn failure_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| !r.record.is_success())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_with(reports: Vec<AgentReport>) -> DispatchOutcome {
        DispatchOutcome {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 12,
            reports,
        }
    }

    #[test]
    fn test_failed_record_has_no_exit_status() {
        let record = AgentRecord::failed("agent timed out after 30s");
        assert_eq!(record.code, NO_EXIT_STATUS);
        assert!(record.output.is_empty());
        assert!(!record.is_success());
    }

    #[test]
    fn test_results_map_preserves_request_order() {
        let outcome = outcome_with(
            ["zeta", "alpha", "mid"]
                .iter()
                .map(|name| AgentReport {
                    agent: name.to_string(),
                    record: AgentRecord::completed("ok\n".to_string(), String::new(), 0),
                })
                .collect(),
        );

        let keys: Vec<_> = outcome.results_map().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_results_map_record_fields() {
        let outcome = outcome_with(vec![AgentReport {
            agent: "echo".to_string(),
            record: AgentRecord::completed("hello\n".to_string(), String::new(), 0),
        }]);

        let results = outcome.results_map();
        assert_eq!(results["echo"]["output"], "hello\n");
        assert_eq!(results["echo"]["error"], "");
        assert_eq!(results["echo"]["code"], 0);
    }

    #[test]
    fn test_failure_count() {
        let outcome = outcome_with(vec![
            AgentReport {
                agent: "ok".to_string(),
                record: AgentRecord::completed(String::new(), String::new(), 0),
            },
            AgentReport {
                agent: "bad".to_string(),
                record: AgentRecord::completed(String::new(), "boom".to_string(), 3),
            },
        ]);
        assert_eq!(outcome.failure_count(), 1);
    }

    #[test]
    fn test_request_credential_not_serialized_when_absent() {
        let request = DispatchRequest::new(vec!["echo".to_string()], "hello".to_string());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("llm_api_key").is_none());
    }
}
