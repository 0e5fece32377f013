//! 创作会话 - 四Agent流水线的编排核心
//!
//! 一个会话独占四个Agent与能力上下文，恰好服务一次请求：
//! Researcher、Marketing顺序各执行一次，随后Writer/Editor进入
//! 交替评审循环，全部产出按调用顺序合流为增量响应流。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::agents::capability::Capability;
use crate::agents::connections::ConnectionRegistry;
use crate::agents::factory::AgentFactory;
use crate::agents::remote::{AgentRegistrar, ProjectAgentRegistrar};
use crate::agents::{CreativeAgent, WRITER_NAME};
use crate::catalog::ProductIndex;
use crate::config::{Config, SessionLimits};
use crate::error::SessionError;
use crate::llm::client::LLMClient;
use crate::llm::tools::ToolNotice;
use crate::outlet::{DeltaOutlet, NdjsonOutlet};
use crate::types::delta::DeltaRecord;
use crate::types::request::WriterRequest;

pub mod producer;
pub mod review_loop;
pub mod transcript;

pub use producer::{LlmTurnProducer, TurnProducer};
pub use review_loop::{ReviewLoop, ReviewState};
pub use transcript::{Transcript, Turn};

/// 会话持有的四个角色Agent
pub struct SessionAgents {
    pub researcher: CreativeAgent,
    pub marketing: CreativeAgent,
    pub writer: CreativeAgent,
    pub editor: CreativeAgent,
}

/// 创作会话
pub struct CreativeSession {
    id: Uuid,
    agents: SessionAgents,
    producer: Arc<dyn TurnProducer>,
    registrar: Arc<dyn AgentRegistrar>,
    notices: mpsc::UnboundedReceiver<ToolNotice>,
    limits: SessionLimits,
    verbose: bool,
}

impl std::fmt::Debug for CreativeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreativeSession")
            .field("id", &self.id)
            .field("limits", &self.limits)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl CreativeSession {
    /// 创建会话：解析工具连接、注册远程身份、打开向量集合、
    /// 构建四个Agent
    pub async fn create(
        config: &Config,
        llm: LLMClient,
        registrar: Arc<dyn AgentRegistrar>,
    ) -> Result<Self, SessionError> {
        let registry = ConnectionRegistry::from_config(&config.connections);
        let factory = AgentFactory::new(config);

        // 能力上下文先行：任何构建失败都必须发生在产生输出之前
        let researcher = factory
            .create_researcher(&registry, registrar.as_ref())
            .await?;

        let index = ProductIndex::open_or_build(&config.catalog, &config.internal_path, llm.clone())
            .await
            .map_err(|cause| SessionError::CollectionSetup {
                collection: config.catalog.collection_name.clone(),
                cause,
            })?;
        let marketing = factory.create_marketing(Arc::new(index))?;
        let writer = factory.create_writer()?;
        let editor = factory.create_editor()?;

        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let producer = Arc::new(LlmTurnProducer::new(llm, notice_tx));

        Ok(Self::assemble(
            SessionAgents {
                researcher,
                marketing,
                writer,
                editor,
            },
            producer,
            registrar,
            notice_rx,
            config.session.clone(),
            config.verbose,
        ))
    }

    /// 以显式协作方组装会话（进程内嵌入与测试场景）
    pub fn assemble(
        agents: SessionAgents,
        producer: Arc<dyn TurnProducer>,
        registrar: Arc<dyn AgentRegistrar>,
        notices: mpsc::UnboundedReceiver<ToolNotice>,
        limits: SessionLimits,
        verbose: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agents,
            producer,
            registrar,
            notices,
            limits,
            verbose,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 处理一次流式请求
    ///
    /// 会话随本次调用结束而耗尽：无论成功失败，远程Agent身份都会
    /// 在返回前注销。通道写入失败按调用方取消处理，返回Ok。
    pub async fn process_streaming_request(
        mut self,
        request: WriterRequest,
        outlet: &mut dyn DeltaOutlet,
    ) -> Result<(), SessionError> {
        let deadline = Instant::now() + Duration::from_secs(self.limits.deadline_seconds);
        let result = self.run_pipeline(&request, outlet, deadline).await;
        self.teardown().await;

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_cancellation() => {
                eprintln!("⚠️ 响应通道关闭，会话 {} 提前结束", self.id);
                Ok(())
            }
            Err(err) => {
                // 错误终止记录，尽力而为：通道此刻可能已不可用
                let _ = outlet
                    .emit(&DeltaRecord::error_terminal(&err.to_string()))
                    .await;
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &mut self,
        request: &WriterRequest,
        outlet: &mut dyn DeltaOutlet,
        deadline: Instant,
    ) -> Result<(), SessionError> {
        // 顺序研究/营销阶段：Marketing在Researcher的回合序列耗尽后才开始
        eprintln!("🔍 Researcher调研中...");
        self.agents
            .researcher
            .bind_argument("research_context", &request.research);
        let research_agent = self.agents.researcher.clone();
        let research_turns = self
            .drive_invocation(&research_agent, &[], outlet, deadline)
            .await?;
        let research_results = research_turns.join("\n");

        eprintln!("🛍️ Marketing检索产品目录中...");
        self.agents
            .marketing
            .bind_argument("product_context", &request.products);
        let marketing_agent = self.agents.marketing.clone();
        let product_turns = self
            .drive_invocation(&marketing_agent, &[], outlet, deadline)
            .await?;
        let product_results = product_turns.join("\n");

        // 进入评审循环前固定Writer的全部绑定参数，此后不再变更
        let writer = &mut self.agents.writer;
        writer.bind_argument("research_context", &request.research);
        writer.bind_argument("research_results", &research_results);
        writer.bind_argument("product_context", &request.products);
        writer.bind_argument("product_results", &product_results);
        writer.bind_argument("assignment", &request.writing);

        eprintln!("✍️ Writer/Editor评审循环开始...");
        let mut review = Transcript::new();
        let mut machine = ReviewLoop::new(self.limits.max_review_turns);
        while let Some(role) = machine.current_agent() {
            let agent = if role == WRITER_NAME {
                self.agents.writer.clone()
            } else {
                self.agents.editor.clone()
            };
            let contents = self
                .drive_invocation(&agent, review.turns(), outlet, deadline)
                .await?;
            if contents.is_empty() {
                return Err(SessionError::AgentInvocation {
                    agent: role.to_string(),
                    cause: anyhow::anyhow!("Agent未产出任何回合"),
                });
            }
            for content in contents {
                review.append(role, &content);
                machine.advance(role, &content);
            }
        }

        if machine.accepted() {
            eprintln!(
                "✓ Editor已接受文章，会话完成（共{}个评审回合）",
                machine.turns_taken()
            );
        } else {
            eprintln!(
                "⚠️ 评审达到回合上限（{}）仍未接受，会话按上限终止",
                self.limits.max_review_turns
            );
        }
        Ok(())
    }

    /// 驱动一次Agent调用
    ///
    /// 生产者在工作任务中执行，回合经有界通道流出；本函数把回合
    /// 与工具通告按真实发生顺序合流到出口，每条记录立即冲刷。
    async fn drive_invocation(
        &mut self,
        agent: &CreativeAgent,
        history: &[Turn],
        outlet: &mut dyn DeltaOutlet,
        deadline: Instant,
    ) -> Result<Vec<String>, SessionError> {
        if Instant::now() >= deadline {
            return Err(SessionError::DeadlineExceeded {
                seconds: self.limits.deadline_seconds,
            });
        }

        let (turn_tx, mut turn_rx) = mpsc::channel::<String>(8);
        let producer = Arc::clone(&self.producer);
        let agent_snapshot = agent.clone();
        let history_snapshot = history.to_vec();
        let worker = tokio::spawn(async move {
            producer
                .produce(&agent_snapshot, &history_snapshot, turn_tx)
                .await
        });

        let agent_name = agent.name;
        let mut contents = Vec::new();
        let turn_timeout = Duration::from_secs(self.limits.turn_timeout_seconds);

        let notices = &mut self.notices;
        let drive = async {
            loop {
                tokio::select! {
                    Some(notice) = notices.recv() => {
                        outlet
                            .emit(&DeltaRecord::tool_notice(&notice.function, &notice.arguments))
                            .await?;
                    }
                    turn = turn_rx.recv() => match turn {
                        Some(content) => {
                            // 先冲刷早于该回合发生的工具通告，保持真实调用顺序
                            while let Ok(notice) = notices.try_recv() {
                                outlet
                                    .emit(&DeltaRecord::tool_notice(
                                        &notice.function,
                                        &notice.arguments,
                                    ))
                                    .await?;
                            }
                            outlet
                                .emit(&DeltaRecord::agent_turn(agent_name, &content))
                                .await?;
                            contents.push(content);
                        }
                        None => break,
                    },
                }
            }
            Ok::<(), SessionError>(())
        };

        match tokio::time::timeout(turn_timeout, drive).await {
            Ok(Ok(())) => {}
            // 出口失败：停止发起后续调用，在途工作任务脱附后自行完成
            Ok(Err(err)) => return Err(err),
            // 超时：放弃本次调用，在途结果被丢弃
            Err(_) => {
                return Err(SessionError::TurnTimeout {
                    agent: agent_name.to_string(),
                    seconds: self.limits.turn_timeout_seconds,
                });
            }
        }

        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(cause)) => {
                return Err(SessionError::AgentInvocation {
                    agent: agent_name.to_string(),
                    cause,
                });
            }
            Err(join_error) => {
                return Err(SessionError::AgentInvocation {
                    agent: agent_name.to_string(),
                    cause: anyhow::anyhow!(join_error),
                });
            }
        }

        // 收尾：冲刷残留的工具通告
        while let Ok(notice) = self.notices.try_recv() {
            outlet
                .emit(&DeltaRecord::tool_notice(&notice.function, &notice.arguments))
                .await?;
        }

        Ok(contents)
    }

    /// 会话收尾：注销远程Agent身份，避免注册泄漏
    async fn teardown(&mut self) {
        if let Capability::GroundedSearch(context) = &self.agents.researcher.capability {
            match self.registrar.deregister(&context.remote_identity).await {
                Ok(()) => {
                    if self.verbose {
                        eprintln!("🧹 远程Agent身份 {} 已注销", context.remote_identity.id);
                    }
                }
                Err(err) => eprintln!("⚠️ 远程Agent身份注销失败: {}", err),
            }
        }
    }
}

/// 启动一次流式创作会话
///
/// 构建LLM客户端与协作方、处理请求，并把增量流写到标准输出。
/// 状态日志走标准错误，标准输出只承载增量协议。
pub async fn launch(config: &Config, request: WriterRequest) -> anyhow::Result<()> {
    let llm = LLMClient::new(config.clone())?;

    // 启动时检查模型连接
    if !config.skip_connection_check {
        llm.check_connection().await?;
    }

    let registrar: Arc<dyn AgentRegistrar> =
        Arc::new(ProjectAgentRegistrar::new(&config.project)?);
    let session = CreativeSession::create(config, llm, registrar).await?;
    eprintln!("🚀 会话 {} 开始处理流式请求...", session.id());

    let mut outlet = NdjsonOutlet::new(tokio::io::stdout());
    session.process_streaming_request(request, &mut outlet).await?;
    eprintln!("✓ 流式响应完成");
    Ok(())
}
