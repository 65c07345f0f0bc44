//! External script execution.
//!
//! The diffusion model lives behind a Python script; everything needed to
//! spawn it, feed it JSON and read its answers back is here, with no
//! knowledge of what the script does. One-shot runs go through
//! [`subprocess`]; a model kept loaded across requests runs as a
//! [`ScriptWorker`].

pub mod executor;
pub mod python;
pub mod subprocess;
pub mod worker;

pub use executor::{ScriptError, ScriptInput, ScriptOutput};
pub use python::PythonRuntime;
pub use worker::ScriptWorker;
