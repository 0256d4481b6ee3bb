//! JNI bridge between the pawn compiler (`libpawnc`) and the Android app.
//!
//! `bridge` and `listeners` hold the bookkeeping: argument marshaling, the
//! working-directory switch around `pc_compile`, and the listener slots the
//! compiler's C callbacks are relayed through. `jvm` adapts managed listener
//! objects onto those slots and, with the `pawnc` feature, exports the
//! `PawnCompiler` native methods.

pub mod args;
pub mod bridge;
pub mod compiler;
pub mod diagnostic;
pub mod error;
pub mod jvm;
pub mod listeners;
pub mod logging;
pub mod paths;
pub mod session;
pub mod settings;
pub mod workdir;

#[cfg(test)]
pub(crate) mod testing;

pub use args::ArgVector;
pub use bridge::{Bridge, CompileTicket};
pub use compiler::Compiler;
#[cfg(feature = "pawnc")]
pub use compiler::Pawnc;
pub use diagnostic::{CompileResult, Diagnostic, Severity};
pub use error::BridgeError;
pub use session::Session;
pub use settings::CompilerSettings;
