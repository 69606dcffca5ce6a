//! YAML workflows: definitions, on-disk store, placeholder expansion and
//! the sequential execution engine.

pub mod condition;
pub mod definition;
pub mod engine;
pub mod executor;
pub mod expand;
pub mod store;
pub mod timeout;

pub use definition::{Step, Workflow};
pub use engine::{Engine, StepObserver, StepResult, WorkflowResult};
pub use executor::{CommandExecutor, CommandOutput, CommandSpec, ShellExecutor};
pub use expand::{secret_env_name, Expander, Expansion, SecretMode};
pub use store::WorkflowStore;
