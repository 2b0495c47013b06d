pub mod agent;
pub mod random;
pub mod scripted;
pub mod human;

pub use agent::{make_agent, Agent, AgentKind};
pub use random::RandomAgent;
pub use scripted::ScriptedAgent;
pub use human::HumanAgent;
