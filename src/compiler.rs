//! The compiler as seen from the bridge: an entry point taking `argc/argv`
//! and two process-wide callback slots.

use std::os::raw::{c_char, c_int};

use crate::args::ArgVector;

/// Receives one chunk of textual compiler output.
pub type OutputSink = extern "C" fn(message: *const c_char);

/// Receives one structured error report.
pub type ErrorSink = extern "C" fn(
    number: c_int,
    filename: *const c_char,
    first_line: c_int,
    last_line: c_int,
    message: *const c_char,
);

/// Anything that can be driven like `pc_compile`.
pub trait Compiler {
    /// Run one compilation and return the raw status code.
    fn compile(&self, args: &mut ArgVector) -> i32;

    fn set_output_sink(&self, sink: Option<OutputSink>);

    fn set_error_sink(&self, sink: Option<ErrorSink>);

    /// Drop both sinks on the compiler side.
    fn clear_sinks(&self);
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn compile(&self, args: &mut ArgVector) -> i32 {
        (**self).compile(args)
    }

    fn set_output_sink(&self, sink: Option<OutputSink>) {
        (**self).set_output_sink(sink);
    }

    fn set_error_sink(&self, sink: Option<ErrorSink>) {
        (**self).set_error_sink(sink);
    }

    fn clear_sinks(&self) {
        (**self).clear_sinks();
    }
}

#[cfg(feature = "pawnc")]
mod native {
    use std::os::raw::{c_char, c_int};

    use super::{ErrorSink, OutputSink};

    extern "C" {
        pub fn pc_compile(argc: c_int, argv: *mut *mut c_char) -> c_int;
        pub fn pawnc_set_output_callback(callback: Option<OutputSink>);
        pub fn pawnc_set_error_callback(callback: Option<ErrorSink>);
        pub fn pawnc_clear_callbacks();
    }
}

/// The linked pawn compiler (`libpawnc`).
#[cfg(feature = "pawnc")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Pawnc;

#[cfg(feature = "pawnc")]
impl Compiler for Pawnc {
    fn compile(&self, args: &mut ArgVector) -> i32 {
        let argc = args.argc();
        let argv = args.as_mut_ptr();
        // SAFETY: `argv` holds `argc` NUL-terminated buffers followed by NULL,
        // all owned by `args`, which outlives the call.
        unsafe { native::pc_compile(argc, argv) }
    }

    fn set_output_sink(&self, sink: Option<OutputSink>) {
        // SAFETY: the sink is a plain `extern "C"` function with the exact
        // signature the compiler expects; `None` maps to NULL.
        unsafe { native::pawnc_set_output_callback(sink) }
    }

    fn set_error_sink(&self, sink: Option<ErrorSink>) {
        // SAFETY: as above.
        unsafe { native::pawnc_set_error_callback(sink) }
    }

    fn clear_sinks(&self) {
        // SAFETY: takes no arguments and only resets the compiler's globals.
        unsafe { native::pawnc_clear_callbacks() }
    }
}
