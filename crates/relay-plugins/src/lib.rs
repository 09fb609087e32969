pub mod descriptor;
pub mod executor;
pub mod interpreter;
pub mod loader;
pub mod output;
pub mod runner;
pub mod validation;

pub use descriptor::{PluginDescriptor, PluginKind};
pub use executor::{ExecutorConfig, PluginExecutor};
pub use interpreter::InterpreterResolver;
pub use loader::PluginLoader;
pub use output::{INVALID_OUTPUT, PluginResult, Widget};
pub use runner::PluginRunner;
pub use validation::{ValidationError, validate};
