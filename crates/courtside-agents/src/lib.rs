pub mod coordinator;
pub mod decision_log;
pub mod error;
pub mod extract;
pub mod llm;
pub mod orchestrator;
pub mod page;
pub mod parser;
pub mod phase;
pub mod prompts;
pub mod specialist;
pub mod trade_loop;

pub mod test_support;

pub use coordinator::{ActOutcome, SeasonCoordinator};
pub use decision_log::DecisionLog;
pub use error::AgentError;
pub use extract::StateExtractor;
pub use llm::{AnthropicApi, ClaudeCli, LanguageModel};
pub use orchestrator::{GatedDecision, Orchestrator};
pub use page::{ActionExecutor, PageController, PageError, PageExecutor};
pub use phase::{ExecutionPolicy, PhaseError, PhaseManager, PhaseTransition, Session};
pub use specialist::{DecisionContext, LlmSpecialist, Specialist};
pub use trade_loop::{review_proposals, TradeDesk, TradeLoopOutcome, TradeReview};
