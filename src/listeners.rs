//! Process-wide listener slots and the `extern "C"` trampolines the compiler
//! calls into.
//!
//! The compiler's callback contract carries no user data pointer, so the
//! current listeners have to live in statics. A slot holds an `Arc`; replacing
//! or clearing it drops the previous holder exactly once, and a trampoline
//! that is mid-delivery keeps its own clone alive until it returns.

use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;

// ── Listener traits ─────────────────────────────────────────────────

/// Receives textual compiler output.
pub trait OutputListener: Send + Sync {
    fn on_output(&self, message: &str);
}

/// Receives structured error reports.
pub trait ErrorListener: Send + Sync {
    fn on_error(&self, diagnostic: &Diagnostic);
}

impl<F> OutputListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_output(&self, message: &str) {
        self(message);
    }
}

impl<F> ErrorListener for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn on_error(&self, diagnostic: &Diagnostic) {
        self(diagnostic);
    }
}

// ── Slots ───────────────────────────────────────────────────────────

struct Slots {
    output: Option<Arc<dyn OutputListener>>,
    error: Option<Arc<dyn ErrorListener>>,
}

static SLOTS: Mutex<Slots> = Mutex::new(Slots {
    output: None,
    error: None,
});

/// Install (or with `None`, remove) the output listener.
///
/// The previous listener is released before the new one is registered with
/// the compiler.
pub fn set_output_listener<C: Compiler + ?Sized>(
    compiler: &C,
    listener: Option<Arc<dyn OutputListener>>,
) {
    let previous = SLOTS.lock().output.take();
    drop(previous);

    match listener {
        Some(listener) => {
            SLOTS.lock().output = Some(listener);
            compiler.set_output_sink(Some(relay_output));
        }
        None => compiler.set_output_sink(None),
    }
}

/// Install (or with `None`, remove) the error listener.
pub fn set_error_listener<C: Compiler + ?Sized>(
    compiler: &C,
    listener: Option<Arc<dyn ErrorListener>>,
) {
    let previous = SLOTS.lock().error.take();
    drop(previous);

    match listener {
        Some(listener) => {
            SLOTS.lock().error = Some(listener);
            compiler.set_error_sink(Some(relay_error));
        }
        None => compiler.set_error_sink(None),
    }
}

/// Tell the compiler to forget its callbacks, then release both listeners.
pub fn clear_listeners<C: Compiler + ?Sized>(compiler: &C) {
    compiler.clear_sinks();

    let (output, error) = {
        let mut slots = SLOTS.lock();
        (slots.output.take(), slots.error.take())
    };
    drop(output);
    drop(error);
}

pub fn has_output_listener() -> bool {
    SLOTS.lock().output.is_some()
}

pub fn has_error_listener() -> bool {
    SLOTS.lock().error.is_some()
}

// ── Trampolines ─────────────────────────────────────────────────────

/// Read a C string from the compiler. NULL reads as empty; invalid UTF-8 is
/// replaced rather than rejected.
///
/// # Safety
/// `ptr` must be NULL or point to a NUL-terminated string that stays valid
/// for the returned lifetime.
unsafe fn c_text<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        // SAFETY: non-null and NUL-terminated per the caller's contract.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
    }
}

fn deliver(kind: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        log::error!("{kind} listener panicked; callback dropped");
    }
}

/// Registered with the compiler as its output callback.
pub(crate) extern "C" fn relay_output(message: *const c_char) {
    let Some(listener) = SLOTS.lock().output.clone() else {
        return;
    };
    // SAFETY: the compiler passes NULL or a string valid for this call.
    let message = unsafe { c_text(message) };
    deliver("output", || listener.on_output(&message));
}

/// Registered with the compiler as its error callback.
pub(crate) extern "C" fn relay_error(
    number: c_int,
    filename: *const c_char,
    first_line: c_int,
    last_line: c_int,
    message: *const c_char,
) {
    let Some(listener) = SLOTS.lock().error.clone() else {
        return;
    };
    // SAFETY: the compiler passes NULL or strings valid for this call.
    let (file, message) = unsafe { (c_text(filename), c_text(message)) };
    let diagnostic = Diagnostic::new(number, file, first_line, last_line, message);
    deliver("error", || listener.on_error(&diagnostic));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use std::ptr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serial_test::serial;

    use super::*;
    use crate::testing::{Event, ScriptedCompiler};

    struct Counted {
        drops: Arc<AtomicUsize>,
    }

    impl OutputListener for Counted {
        fn on_output(&self, _message: &str) {}
    }

    impl ErrorListener for Counted {
        fn on_error(&self, _diagnostic: &Diagnostic) {}
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted() -> (Arc<Counted>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Counted {
                drops: Arc::clone(&drops),
            }),
            drops,
        )
    }

    #[test]
    #[serial]
    fn clear_releases_each_listener_exactly_once() {
        let compiler = ScriptedCompiler::new(0);
        let (out, out_drops) = counted();
        let (err, err_drops) = counted();

        set_output_listener(&compiler, Some(out));
        set_error_listener(&compiler, Some(err));
        assert!(has_output_listener() && has_error_listener());
        assert!(compiler.has_output_sink() && compiler.has_error_sink());

        clear_listeners(&compiler);
        assert_eq!(out_drops.load(Ordering::SeqCst), 1);
        assert_eq!(err_drops.load(Ordering::SeqCst), 1);
        assert_eq!(compiler.clear_calls(), 1);
        assert!(!has_output_listener() && !has_error_listener());

        clear_listeners(&compiler);
        assert_eq!(out_drops.load(Ordering::SeqCst), 1);
        assert_eq!(err_drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[serial]
    fn replacing_releases_previous_listener() {
        let compiler = ScriptedCompiler::new(0);
        let (first, first_drops) = counted();
        let (second, second_drops) = counted();

        set_output_listener(&compiler, Some(first));
        set_output_listener(&compiler, Some(second));
        assert_eq!(first_drops.load(Ordering::SeqCst), 1);
        assert_eq!(second_drops.load(Ordering::SeqCst), 0);

        set_output_listener(&compiler, None);
        assert_eq!(second_drops.load(Ordering::SeqCst), 1);
        assert!(!compiler.has_output_sink());
        clear_listeners(&compiler);
    }

    #[test]
    #[serial]
    fn relays_output_and_errors_with_all_fields() {
        let compiler = ScriptedCompiler::new(1).with_events(vec![
            Event::Output("Pawn compiler 3.10.10\n".into()),
            Event::Error(Diagnostic::new(17, "/src/gm.pwn", -1, 12, "undefined symbol \"foo\"")),
        ]);
        let output = Arc::new(Mutex::new(Vec::<String>::new()));
        let errors = Arc::new(Mutex::new(Vec::<Diagnostic>::new()));

        let sink = Arc::clone(&output);
        set_output_listener(
            &compiler,
            Some(Arc::new(move |m: &str| sink.lock().push(m.to_owned()))),
        );
        let sink = Arc::clone(&errors);
        set_error_listener(
            &compiler,
            Some(Arc::new(move |d: &Diagnostic| sink.lock().push(d.clone()))),
        );

        let mut args = crate::args::ArgVector::from_args(["pawncc"]);
        assert_eq!(compiler.compile(&mut args), 1);

        assert_eq!(*output.lock(), vec!["Pawn compiler 3.10.10\n".to_string()]);
        assert_eq!(
            *errors.lock(),
            vec![Diagnostic::new(17, "/src/gm.pwn", -1, 12, "undefined symbol \"foo\"")]
        );
        clear_listeners(&compiler);
    }

    #[test]
    #[serial]
    fn callbacks_from_another_thread_are_delivered() {
        let compiler = ScriptedCompiler::new(0)
            .with_events(vec![Event::Output("from worker".into())])
            .on_worker_thread();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        set_output_listener(
            &compiler,
            Some(Arc::new(move |m: &str| sink.lock().push(m.to_owned()))),
        );

        let mut args = crate::args::ArgVector::from_args(["pawncc"]);
        compiler.compile(&mut args);
        assert_eq!(*seen.lock(), vec!["from worker".to_string()]);
        clear_listeners(&compiler);
    }

    #[test]
    #[serial]
    fn null_strings_read_as_empty_and_missing_listener_is_ignored() {
        clear_listeners(&ScriptedCompiler::new(0));
        relay_output(ptr::null());
        relay_error(1, ptr::null(), -1, -1, ptr::null());

        let errors = Arc::new(Mutex::new(Vec::<Diagnostic>::new()));
        let sink = Arc::clone(&errors);
        let compiler = ScriptedCompiler::new(0);
        set_error_listener(
            &compiler,
            Some(Arc::new(move |d: &Diagnostic| sink.lock().push(d.clone()))),
        );
        relay_error(100, ptr::null(), -1, -1, ptr::null());
        assert_eq!(*errors.lock(), vec![Diagnostic::new(100, "", -1, -1, "")]);
        clear_listeners(&compiler);
    }

    #[test]
    #[serial]
    fn panicking_listener_does_not_unwind_into_caller() {
        let compiler = ScriptedCompiler::new(0).with_events(vec![Event::Output("boom".into())]);
        set_output_listener(
            &compiler,
            Some(Arc::new(|_: &str| panic!("listener failure"))),
        );
        let mut args = crate::args::ArgVector::from_args(["pawncc"]);
        assert_eq!(compiler.compile(&mut args), 0);
        clear_listeners(&compiler);
    }
}
