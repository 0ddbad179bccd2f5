//! The three in-memory registries: tools, resources, prompts.
//!
//! Each is populated once at construction and read thereafter; none of
//! them perform I/O of their own beyond what a registered handler does.

pub mod prompts;
pub mod resources;
pub mod tools;

pub use prompts::PromptRegistry;
pub use resources::ResourceRegistry;
pub use tools::{Clock, SystemClock, ToolContext, ToolHandler, ToolRegistry};
