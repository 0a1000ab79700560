//! ReAct agent with Wikipedia and calculator tools.

mod math;
mod runner;
mod tools;

pub use math::{evaluate, format_number};
pub use runner::{Agent, AgentResponse, ToolCallRecord, FORCE_STOP_MESSAGE, STOP_SEQUENCE};
pub use tools::{load_tools, CalculatorTool, Tool, WikipediaTool, WIKIPEDIA_MAX_CHARS};
