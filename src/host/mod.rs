//! Compile orchestration and the engine boundary.
//!
//! [`Host`] implements [`CompilerHost`] for an external [`CompilerEngine`]
//! and drives compile passes over it.

mod builder;
mod contract;
mod core;

pub use builder::HostBuilder;
pub use contract::{
    CompileMode, CompilerEngine, CompilerHost, EngineCapabilities, DEFAULT_LIB_NAME,
};
pub use self::core::{CompileSummary, Host};
