//! 流水线集成测试
//!
//! 用脚本化的模型调用协作方驱动完整会话，验证增量流的顺序、
//! 终止条件、取消与失败路径。

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use penflow_rs::agents::capability::{Capability, GroundedSearchContext, ToolUsePolicy};
use penflow_rs::agents::connections::ToolConnection;
use penflow_rs::agents::remote::{AgentRegistrar, RemoteAgentIdentity, RemoteAgentSpec};
use penflow_rs::agents::template::PromptTemplate;
use penflow_rs::agents::{
    CreativeAgent, EDITOR_NAME, MARKETING_NAME, RESEARCHER_NAME, WRITER_NAME,
};
use penflow_rs::config::{Config, SessionLimits};
use penflow_rs::error::SessionError;
use penflow_rs::llm::client::LLMClient;
use penflow_rs::llm::tools::{NoticeSender, ToolNotice};
use penflow_rs::outlet::DeltaOutlet;
use penflow_rs::session::{CreativeSession, SessionAgents, Turn, TurnProducer};
use penflow_rs::types::delta::{DeltaRecord, DeltaRole};
use penflow_rs::types::request::WriterRequest;

/// 按Agent名排队的脚本化生产者
struct ScriptedProducer {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedInvocation>>>,
    /// 队列耗尽后的兜底脚本（评审循环上限测试用）
    fallbacks: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
    notices: Option<NoticeSender>,
    captured_writer_arguments: Mutex<Vec<HashMap<String, String>>>,
}

enum ScriptedInvocation {
    Turns(Vec<String>),
    Fail(String),
}

impl ScriptedProducer {
    fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallbacks: HashMap::new(),
            calls: AtomicUsize::new(0),
            notices: None,
            captured_writer_arguments: Mutex::new(Vec::new()),
        }
    }

    fn script(self, agent: &str, turns: &[&str]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(agent.to_string())
            .or_default()
            .push_back(ScriptedInvocation::Turns(
                turns.iter().map(|t| t.to_string()).collect(),
            ));
        self
    }

    fn script_failure(self, agent: &str, message: &str) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(agent.to_string())
            .or_default()
            .push_back(ScriptedInvocation::Fail(message.to_string()));
        self
    }

    fn fallback(mut self, agent: &str, turns: &[&str]) -> Self {
        self.fallbacks.insert(
            agent.to_string(),
            turns.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    fn with_notices(mut self, notices: NoticeSender) -> Self {
        self.notices = Some(notices);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TurnProducer for ScriptedProducer {
    async fn produce(
        &self,
        agent: &CreativeAgent,
        _history: &[Turn],
        turns: mpsc::Sender<String>,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if agent.name == WRITER_NAME {
            self.captured_writer_arguments
                .lock()
                .unwrap()
                .push(agent.arguments.clone());
        }

        if agent.name == RESEARCHER_NAME {
            if let Some(notices) = &self.notices {
                let _ = notices.send(ToolNotice {
                    function: "web_search".to_string(),
                    arguments: r#"{"query":"R"}"#.to_string(),
                });
            }
        }

        let invocation = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(agent.name)
            .and_then(|queue| queue.pop_front());

        let contents = match invocation {
            Some(ScriptedInvocation::Turns(contents)) => contents,
            Some(ScriptedInvocation::Fail(message)) => anyhow::bail!("{}", message),
            None => match self.fallbacks.get(agent.name) {
                Some(contents) => contents.clone(),
                None => anyhow::bail!("agent {} 没有剩余脚本", agent.name),
            },
        };

        for content in contents {
            let _ = turns.send(content).await;
        }
        Ok(())
    }
}

/// 记录注册/注销次数的桩注册器
struct StubRegistrar {
    registrations: AtomicUsize,
    deregistrations: AtomicUsize,
}

impl StubRegistrar {
    fn new() -> Self {
        Self {
            registrations: AtomicUsize::new(0),
            deregistrations: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AgentRegistrar for StubRegistrar {
    async fn register(&self, spec: &RemoteAgentSpec) -> Result<RemoteAgentIdentity> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteAgentIdentity {
            id: format!("remote-{}", spec.name),
        })
    }

    async fn deregister(&self, _identity: &RemoteAgentIdentity) -> Result<()> {
        self.deregistrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 收集所有增量记录的出口，可在第N条之后模拟通道关闭
struct CollectingOutlet {
    records: Vec<DeltaRecord>,
    fail_after: Option<usize>,
}

impl CollectingOutlet {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            fail_after: None,
        }
    }

    fn closing_after(count: usize) -> Self {
        Self {
            records: Vec::new(),
            fail_after: Some(count),
        }
    }
}

#[async_trait]
impl DeltaOutlet for CollectingOutlet {
    async fn emit(&mut self, record: &DeltaRecord) -> Result<(), SessionError> {
        if let Some(limit) = self.fail_after {
            if self.records.len() >= limit {
                return Err(SessionError::ChannelWrite);
            }
        }
        self.records.push(record.clone());
        Ok(())
    }
}

fn plain_template(name: &str) -> PromptTemplate {
    PromptTemplate::parse(&format!(
        r#"
name = "{}"
description = "test template"
template = "You are {}. {{{{$assignment}}}}"
kickoff = "Begin."
variables = ["assignment"]
"#,
        name, name
    ))
    .unwrap()
}

fn grounded_researcher() -> CreativeAgent {
    CreativeAgent::new(
        RESEARCHER_NAME,
        plain_template("researcher"),
        Capability::GroundedSearch(GroundedSearchContext {
            connection: ToolConnection {
                name: "bingGrounding".to_string(),
                endpoint: "https://search.example.com".to_string(),
                api_key: "sk-test".to_string(),
            },
            remote_identity: RemoteAgentIdentity {
                id: "remote-researcher".to_string(),
            },
            policy: ToolUsePolicy::Required,
        }),
    )
}

fn test_agents() -> SessionAgents {
    SessionAgents {
        researcher: grounded_researcher(),
        marketing: CreativeAgent::new(
            MARKETING_NAME,
            plain_template("marketing"),
            Capability::Plain,
        ),
        writer: CreativeAgent::new(WRITER_NAME, plain_template("writer"), Capability::Plain),
        editor: CreativeAgent::new(EDITOR_NAME, plain_template("editor"), Capability::Plain),
    }
}

fn test_limits(max_review_turns: u32) -> SessionLimits {
    SessionLimits {
        max_review_turns,
        turn_timeout_seconds: 10,
        deadline_seconds: 60,
        research_connection: "bingGrounding".to_string(),
    }
}

struct TestSession {
    session: CreativeSession,
    producer: Arc<ScriptedProducer>,
    registrar: Arc<StubRegistrar>,
    _notice_tx: Option<NoticeSender>,
}

fn build_session(producer: ScriptedProducer, max_review_turns: u32) -> TestSession {
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let producer = Arc::new(producer);
    let registrar = Arc::new(StubRegistrar::new());
    let session = CreativeSession::assemble(
        test_agents(),
        Arc::clone(&producer) as Arc<dyn TurnProducer>,
        Arc::clone(&registrar) as Arc<dyn AgentRegistrar>,
        notice_rx,
        test_limits(max_review_turns),
        false,
    );
    TestSession {
        session,
        producer,
        registrar,
        _notice_tx: Some(notice_tx),
    }
}

fn request() -> WriterRequest {
    WriterRequest::new("R", "P", "W")
}

fn authors(records: &[DeltaRecord]) -> Vec<Option<String>> {
    records
        .iter()
        .map(|r| r.author().map(|a| a.to_string()))
        .collect()
}

#[tokio::test]
async fn test_scripted_request_produces_four_ordered_deltas() {
    let producer = ScriptedProducer::new()
        .script(RESEARCHER_NAME, &["r1"])
        .script(MARKETING_NAME, &["m1"])
        .script(WRITER_NAME, &["draft"])
        .script(EDITOR_NAME, &["Article accepted."]);
    let test = build_session(producer, 8);
    let mut outlet = CollectingOutlet::new();

    test.session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap();

    assert_eq!(
        authors(&outlet.records),
        vec![
            Some("Researcher".to_string()),
            Some("Marketing".to_string()),
            Some("Writer".to_string()),
            Some("Editor".to_string()),
        ]
    );
    let contents: Vec<&str> = outlet
        .records
        .iter()
        .map(|r| r.delta.content.as_str())
        .collect();
    assert_eq!(contents, vec!["r1", "m1", "draft", "Article accepted."]);
    assert_eq!(test.producer.calls(), 4);
    assert_eq!(test.registrar.deregistrations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stage_turns_accumulate_into_writer_arguments() {
    let producer = ScriptedProducer::new()
        .script(RESEARCHER_NAME, &["r1", "r2"])
        .script(MARKETING_NAME, &["m1"])
        .script(WRITER_NAME, &["draft"])
        .script(EDITOR_NAME, &["Article accepted."]);
    let test = build_session(producer, 8);
    let mut outlet = CollectingOutlet::new();

    test.session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap();

    // 研究阶段两个回合各自成为一条增量
    assert_eq!(
        authors(&outlet.records)[..3],
        [
            Some("Researcher".to_string()),
            Some("Researcher".to_string()),
            Some("Marketing".to_string()),
        ]
    );

    // Writer在首次调用前绑定全部五个参数
    let captured = test.producer.captured_writer_arguments.lock().unwrap();
    let arguments = &captured[0];
    assert_eq!(arguments.get("research_context").unwrap(), "R");
    assert_eq!(arguments.get("research_results").unwrap(), "r1\nr2");
    assert_eq!(arguments.get("product_context").unwrap(), "P");
    assert_eq!(arguments.get("product_results").unwrap(), "m1");
    assert_eq!(arguments.get("assignment").unwrap(), "W");
}

#[tokio::test]
async fn test_termination_phrase_is_case_insensitive() {
    let producer = ScriptedProducer::new()
        .script(RESEARCHER_NAME, &["r1"])
        .script(MARKETING_NAME, &["m1"])
        .script(WRITER_NAME, &["draft"])
        .script(EDITOR_NAME, &["ARTICLE ACCEPTED — ship it"]);
    let test = build_session(producer, 8);
    let mut outlet = CollectingOutlet::new();

    test.session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap();

    assert_eq!(outlet.records.len(), 4);
    assert_eq!(outlet.records.last().unwrap().author(), Some("Editor"));
}

#[tokio::test]
async fn test_writer_phrase_does_not_terminate_loop() {
    let producer = ScriptedProducer::new()
        .script(RESEARCHER_NAME, &["r1"])
        .script(MARKETING_NAME, &["m1"])
        .script(WRITER_NAME, &["draft saying Article accepted"])
        .script(EDITOR_NAME, &["please rework the intro"])
        .script(WRITER_NAME, &["revised draft"])
        .script(EDITOR_NAME, &["Article accepted."]);
    let test = build_session(producer, 8);
    let mut outlet = CollectingOutlet::new();

    test.session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap();

    // Writer的内容包含接受短语，但终止判定只看Editor的回合
    assert_eq!(
        authors(&outlet.records),
        vec![
            Some("Researcher".to_string()),
            Some("Marketing".to_string()),
            Some("Writer".to_string()),
            Some("Editor".to_string()),
            Some("Writer".to_string()),
            Some("Editor".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_review_loop_stops_at_max_turns_without_acceptance() {
    let producer = ScriptedProducer::new()
        .script(RESEARCHER_NAME, &["r1"])
        .script(MARKETING_NAME, &["m1"])
        .fallback(WRITER_NAME, &["draft"])
        .fallback(EDITOR_NAME, &["still needs rework"]);
    let test = build_session(producer, 4);
    let mut outlet = CollectingOutlet::new();

    test.session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap();

    // 2条阶段增量 + 上限4个评审回合
    assert_eq!(outlet.records.len(), 6);
    assert_eq!(outlet.records.last().unwrap().author(), Some("Editor"));
}

#[tokio::test]
async fn test_channel_close_cancels_without_further_invocations() {
    let producer = ScriptedProducer::new()
        .script(RESEARCHER_NAME, &["r1"])
        .script(MARKETING_NAME, &["m1"])
        .script(WRITER_NAME, &["draft"])
        .script(EDITOR_NAME, &["Article accepted."]);
    let test = build_session(producer, 8);
    let mut outlet = CollectingOutlet::closing_after(1);

    // 通道关闭按取消处理，不算会话失败
    test.session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap();

    assert_eq!(outlet.records.len(), 1);
    // 关闭在Marketing的发射点被发现：该次调用允许完成但结果被丢弃，
    // 此后不再发起新的Agent调用（Writer/Editor从未被调用）
    assert_eq!(test.producer.calls(), 2);
    // 取消路径同样注销远程身份
    assert_eq!(test.registrar.deregistrations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_turn_timeout_surfaces_as_error() {
    struct SlowProducer;

    #[async_trait]
    impl TurnProducer for SlowProducer {
        async fn produce(
            &self,
            _agent: &CreativeAgent,
            _history: &[Turn],
            _turns: mpsc::Sender<String>,
        ) -> Result<()> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(())
        }
    }

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    drop(notice_tx);
    let registrar = Arc::new(StubRegistrar::new());
    let mut limits = test_limits(8);
    limits.turn_timeout_seconds = 1;
    let session = CreativeSession::assemble(
        test_agents(),
        Arc::new(SlowProducer) as Arc<dyn TurnProducer>,
        Arc::clone(&registrar) as Arc<dyn AgentRegistrar>,
        notice_rx,
        limits,
        false,
    );
    let mut outlet = CollectingOutlet::new();

    let err = session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::TurnTimeout { .. }));
}

#[tokio::test]
async fn test_session_deadline_aborts_before_first_invocation() {
    let producer = ScriptedProducer::new().script(RESEARCHER_NAME, &["r1"]);
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    drop(notice_tx);
    let registrar = Arc::new(StubRegistrar::new());
    let mut limits = test_limits(8);
    limits.deadline_seconds = 0;
    let producer = Arc::new(producer);
    let session = CreativeSession::assemble(
        test_agents(),
        Arc::clone(&producer) as Arc<dyn TurnProducer>,
        Arc::clone(&registrar) as Arc<dyn AgentRegistrar>,
        notice_rx,
        limits,
        false,
    );
    let mut outlet = CollectingOutlet::new();

    let err = session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::DeadlineExceeded { .. }));
    assert_eq!(producer.calls(), 0);
}

#[tokio::test]
async fn test_invocation_failure_emits_error_terminal_record() {
    let producer = ScriptedProducer::new().script_failure(RESEARCHER_NAME, "model unavailable");
    let test = build_session(producer, 8);
    let mut outlet = CollectingOutlet::new();

    let err = test
        .session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::AgentInvocation { .. }));
    // 失败前没有任何回合流出，只有错误终止记录
    assert_eq!(outlet.records.len(), 1);
    let terminal = &outlet.records[0];
    assert_eq!(terminal.delta.role, DeltaRole::System);
    assert!(terminal.delta.content.starts_with("error:"));
    // 失败路径同样注销远程身份
    assert_eq!(test.registrar.deregistrations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tool_notice_interleaves_before_agent_turn() {
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let producer = Arc::new(
        ScriptedProducer::new()
            .with_notices(notice_tx)
            .script(RESEARCHER_NAME, &["r1"])
            .script(MARKETING_NAME, &["m1"])
            .script(WRITER_NAME, &["draft"])
            .script(EDITOR_NAME, &["Article accepted."]),
    );
    let registrar = Arc::new(StubRegistrar::new());
    let session = CreativeSession::assemble(
        test_agents(),
        Arc::clone(&producer) as Arc<dyn TurnProducer>,
        Arc::clone(&registrar) as Arc<dyn AgentRegistrar>,
        notice_rx,
        test_limits(8),
        false,
    );
    let mut outlet = CollectingOutlet::new();

    session
        .process_streaming_request(request(), &mut outlet)
        .await
        .unwrap();

    // 工具通告先于其所属Agent的回合增量，system角色且不带Agent标签
    assert_eq!(outlet.records.len(), 5);
    assert_eq!(outlet.records[0].delta.role, DeltaRole::System);
    assert!(outlet.records[0].delta.content.starts_with("web_search:"));
    assert_eq!(outlet.records[0].author(), None);
    assert_eq!(outlet.records[1].author(), Some("Researcher"));
}

#[tokio::test]
async fn test_missing_connection_aborts_before_any_output() {
    // 默认配置不含bingGrounding连接
    let config = Config::default();
    let llm = LLMClient::new(config.clone()).unwrap();
    let registrar = Arc::new(StubRegistrar::new());

    let err = CreativeSession::create(&config, llm, registrar.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::ConnectionNotFound { name } if name == "bingGrounding"
    ));
    // 连接解析失败时既无远程注册也无任何增量输出
    assert_eq!(registrar.registrations.load(Ordering::SeqCst), 0);
}
