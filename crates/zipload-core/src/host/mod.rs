//! Capabilities supplied by the host environment.
//!
//! The loader never turns bytes into a module itself and never inspects the
//! process on its own: both are handed in through the traits defined here.

pub mod debugger;
pub mod module;

pub use debugger::DebuggerProbe;
pub use debugger::NoDebugger;
pub use debugger::ProcessDebugger;
pub use module::ImageLoader;
pub use module::LoadedModule;
pub use module::ModuleImage;
pub use module::ModuleLoader;
