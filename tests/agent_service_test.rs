//! Integration tests for switching agents and knowledge-augmented queries.

mod common;

use serde_json::json;

use common::{mock_agent, service_fixture};
use genagent::adapters::models::MockStep;
use genagent::domain::errors::{DomainError, ErrorKind};
use genagent::domain::models::{AgentConfig, Metadata, ToolConfig};
use genagent::domain::ports::AgentConfigRepository;

#[tokio::test]
async fn test_query_uses_knowledge_base_context() {
    let fixture = service_fixture(
        vec![mock_agent("support").with_knowledge_bases(["policies"])],
        vec![],
    );
    let mut metadata = Metadata::new();
    metadata.insert("title".to_string(), json!("Refund policy"));
    fixture
        .knowledge
        .try_ingest("refunds", "policies", "Refunds are issued within 30 days of purchase.", metadata)
        .await
        .unwrap();
    fixture
        .knowledge
        .try_ingest("other", "elsewhere", "Refunds are never issued here.", Metadata::new())
        .await
        .unwrap();

    fixture.service.switch_agent("support").await.unwrap();
    fixture.model.push_step(MockStep::Reply("Within 30 days.".to_string()));

    let result = fixture
        .service
        .query_agent("support", "t1", "How long do refunds take?")
        .await
        .unwrap();
    assert_eq!(result.response(), Some("Within 30 days."));
    assert!(result.rag_used());

    let request = fixture.model.requests().pop().unwrap();
    let sent = request.last_user_message().unwrap();
    assert!(sent.starts_with("I need information about: How long do refunds take?"));
    assert!(sent.contains("[Source 1: Refund policy]"));
    assert!(!sent.contains("never issued"), "other knowledge bases are excluded");
    assert!(request.system_prompt.contains("IMPORTANT KNOWLEDGE BASE INSTRUCTIONS:"));
}

#[tokio::test]
async fn test_agent_without_knowledge_bases_skips_retrieval() {
    let fixture = service_fixture(vec![mock_agent("plain")], vec![]);
    fixture
        .knowledge
        .try_ingest("doc", "kb", "Some unrelated text.", Metadata::new())
        .await
        .unwrap();

    fixture.service.switch_agent("plain").await.unwrap();
    let result = fixture.service.query_agent("plain", "t", "hello").await.unwrap();

    assert!(!result.rag_used());
    assert_eq!(result.response(), Some("echo: hello"));
}

#[tokio::test]
async fn test_switch_toggles_and_persists_flag() {
    let fixture = service_fixture(vec![mock_agent("a")], vec![]);

    let on = fixture.service.switch_agent("a").await.unwrap();
    assert!(on.active);
    assert_eq!(on.message, "Agent a activated");
    assert!(fixture.configs.get_agent_config("a").await.unwrap().unwrap().is_active);

    let off = fixture.service.switch_agent("a").await.unwrap();
    assert!(!off.active);
    assert_eq!(off.message, "Agent a deactivated");
    assert!(!fixture.configs.get_agent_config("a").await.unwrap().unwrap().is_active);

    let err = fixture.service.query_agent("a", "t", "hi").await.unwrap();
    assert_eq!(err.error_kind(), Some(ErrorKind::AgentInactive));

    let again = fixture.service.switch_agent("a").await.unwrap();
    assert!(again.active);
    assert!(fixture.service.query_agent("a", "t", "hi").await.unwrap().is_success());
}

#[tokio::test]
async fn test_memory_survives_deactivation() {
    let fixture = service_fixture(vec![mock_agent("a")], vec![]);
    fixture.service.switch_agent("a").await.unwrap();
    fixture.service.query_agent("a", "t", "first").await.unwrap();

    fixture.service.switch_agent("a").await.unwrap();
    fixture.service.switch_agent("a").await.unwrap();
    fixture.service.query_agent("a", "t", "second").await.unwrap();

    let request = fixture.model.requests().pop().unwrap();
    assert_eq!(request.messages.len(), 3);
    assert_eq!(request.messages[0].content, "first");
}

#[tokio::test]
async fn test_unknown_and_unswitched_agents() {
    let fixture = service_fixture(vec![mock_agent("idle")], vec![]);

    let err = fixture.service.switch_agent("ghost").await.unwrap_err();
    assert!(matches!(err, DomainError::ConfigNotFound(_)));

    let err = fixture.service.query_agent("ghost", "t", "hi").await.unwrap_err();
    assert!(matches!(err, DomainError::ConfigNotFound(_)));

    let err = fixture.service.query_agent("idle", "t", "hi").await.unwrap_err();
    assert!(matches!(err, DomainError::AgentInactive(_)));
    assert_eq!(fixture.model.call_count(), 0);
}

#[tokio::test]
async fn test_errored_agent_recovers_after_config_fix() {
    let fixture = service_fixture(vec![AgentConfig::new("flaky", "broken", "m")], vec![]);

    fixture.service.switch_agent("flaky").await.unwrap();
    let result = fixture.service.query_agent("flaky", "t", "hi").await.unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::ModelInitFailed));

    fixture
        .configs
        .save_agent_config(&mock_agent("flaky"))
        .await
        .unwrap();
    let outcome = fixture.service.switch_agent("flaky").await.unwrap();
    assert!(outcome.active);
    assert!(fixture.service.query_agent("flaky", "t", "hi").await.unwrap().is_success());
}

#[tokio::test]
async fn test_warm_start_registers_active_agents_with_tools() {
    let fixture = service_fixture(
        vec![mock_agent("timer").with_tools(["clock"]).active(), mock_agent("idle")],
        vec![ToolConfig::function("clock", "current_time", "current_time")],
    );

    let report = fixture.service.warm_start().await.unwrap();
    assert_eq!(report.registered, vec!["timer".to_string()]);

    let agent = fixture.service.registry().get_agent("timer").await.unwrap();
    assert_eq!(agent.tools().len(), 1);
    assert!(agent.system_prompt().contains("IMPORTANT TOOLS INSTRUCTIONS:"));

    fixture.service.shutdown().await;
    assert!(fixture.service.registry().is_empty().await);
}
