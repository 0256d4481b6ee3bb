//! High-level compile API: one call in, status plus every diagnostic out.
//!
//! This is what the managed wrapper builds on top of the raw bridge, offered
//! here for Rust callers and the CLI.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::args::{ArgVector, PROGRAM_NAME};
use crate::bridge::Bridge;
use crate::compiler::Compiler;
use crate::diagnostic::{CompileResult, Diagnostic};
use crate::listeners::{self, ErrorListener, OutputListener};
use crate::settings::CompilerSettings;

/// Collects every diagnostic of a run and forwards it to the user's listener.
#[derive(Default)]
struct Collector {
    diagnostics: Mutex<Vec<Diagnostic>>,
    forward: Mutex<Option<Arc<dyn ErrorListener>>>,
}

impl ErrorListener for Collector {
    fn on_error(&self, diagnostic: &Diagnostic) {
        self.diagnostics.lock().push(diagnostic.clone());
        let forward = self.forward.lock().clone();
        if let Some(listener) = forward {
            listener.on_error(diagnostic);
        }
    }
}

/// Owns the compiler's error slot while compiling; output goes straight to the
/// user's listener.
pub struct Session<C: Compiler> {
    bridge: Bridge<C>,
    collector: Arc<Collector>,
}

impl<C: Compiler> Session<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            bridge: Bridge::new(compiler),
            collector: Arc::new(Collector::default()),
        }
    }

    pub fn bridge(&self) -> &Bridge<C> {
        &self.bridge
    }

    pub fn set_output_listener(&self, listener: Option<Arc<dyn OutputListener>>) {
        self.bridge.set_output_listener(listener);
    }

    /// Diagnostics are collected whether or not a listener is set.
    pub fn set_error_listener(&self, listener: Option<Arc<dyn ErrorListener>>) {
        *self.collector.forward.lock() = listener;
    }

    /// Compile `source` as `pawncc <options> <source>`.
    ///
    /// Concurrent calls, from this session or any other, run one after the
    /// other, and each result holds only its own run's diagnostics.
    pub fn compile<S: AsRef<str>>(&self, source: &Path, options: &[S]) -> CompileResult {
        let ticket = Bridge::<C>::ticket();
        self.collector.diagnostics.lock().clear();
        let collector: Arc<dyn ErrorListener> = self.collector.clone();
        listeners::set_error_listener(self.bridge.compiler(), Some(collector));

        let status = self.bridge.compile_with_ticket(
            &ticket,
            ArgVector::invocation(PROGRAM_NAME, options, source),
        );

        let diagnostics = std::mem::take(&mut *self.collector.diagnostics.lock());
        CompileResult::new(status, diagnostics)
    }

    pub fn compile_with_settings(&self, source: &Path, settings: &CompilerSettings) -> CompileResult {
        self.compile(source, settings.build_options().as_slice())
    }

    /// Release every listener, the user's and the session's own.
    pub fn clear_listeners(&self) {
        *self.collector.forward.lock() = None;
        self.bridge.clear_listeners();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::testing::{Event, ScriptedCompiler};

    fn script() -> Vec<Event> {
        vec![
            Event::Output("Pawn compiler 3.10.10\n".into()),
            Event::Error(Diagnostic::new(203, "/src/gm.pwn", -1, 4, "symbol is never used: \"a\"")),
            Event::Error(Diagnostic::new(17, "/src/gm.pwn", -1, 9, "undefined symbol \"b\"")),
            Event::Output("1 Error.\n".into()),
        ]
    }

    #[test]
    #[serial]
    fn compile_collects_diagnostics_and_status() {
        let session = Session::new(ScriptedCompiler::new(1).with_events(script()));
        let result = session.compile(Path::new("/tmp/gm.pwn"), &["-d3"]);

        assert_eq!(result.status, 1);
        assert!(!result.success);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warning_count(), 1);
        assert_eq!(
            session.bridge().compiler().seen_args(),
            vec!["pawncc", "-d3", "/tmp/gm.pwn"]
        );
        session.clear_listeners();
    }

    #[test]
    #[serial]
    fn diagnostics_do_not_leak_between_runs() {
        let session = Session::new(ScriptedCompiler::new(1).with_events(script()));
        let first = session.compile::<&str>(Path::new("/tmp/gm.pwn"), &[]);
        let second = session.compile::<&str>(Path::new("/tmp/gm.pwn"), &[]);
        assert_eq!(first.diagnostics, second.diagnostics);
        session.clear_listeners();
    }

    #[test]
    #[serial]
    fn concurrent_compiles_keep_their_own_diagnostics() {
        let session = Session::new(ScriptedCompiler::new(1).with_events(script()));
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        let result = session.compile::<&str>(Path::new("/tmp/gm.pwn"), &[]);
                        assert_eq!(result.diagnostics.len(), 2);
                        assert_eq!(result.error_count(), 1);
                    }
                });
            }
        });
        session.clear_listeners();
    }

    #[test]
    #[serial]
    fn user_listeners_see_output_and_errors() {
        let session = Session::new(ScriptedCompiler::new(0).with_events(script()));
        let output = Arc::new(Mutex::new(String::new()));
        let errors = Arc::new(Mutex::new(Vec::<String>::new()));

        let sink = Arc::clone(&output);
        session.set_output_listener(Some(Arc::new(move |m: &str| sink.lock().push_str(m))));
        let sink = Arc::clone(&errors);
        session.set_error_listener(Some(Arc::new(move |d: &Diagnostic| {
            sink.lock().push(d.to_string());
        })));

        let result = session.compile::<&str>(Path::new("/tmp/gm.pwn"), &[]);
        assert!(result.success);
        assert_eq!(*output.lock(), "Pawn compiler 3.10.10\n1 Error.\n");
        assert_eq!(
            *errors.lock(),
            vec![
                "Warning 203: gm.pwn(4): symbol is never used: \"a\"".to_string(),
                "Error 017: gm.pwn(9): undefined symbol \"b\"".to_string(),
            ]
        );

        session.clear_listeners();
        assert!(!listeners::has_output_listener());
        assert!(!listeners::has_error_listener());
    }

    #[test]
    #[serial]
    fn settings_drive_the_option_list() {
        let session = Session::new(ScriptedCompiler::new(0));
        let settings = CompilerSettings {
            include_dirs: vec!["/sdcard/pawno/include".into()],
            debug_level: Some(3),
            ..CompilerSettings::default()
        };
        session.compile_with_settings(Path::new("/tmp/gm.pwn"), &settings);
        assert_eq!(
            session.bridge().compiler().seen_args(),
            vec!["pawncc", "-i/sdcard/pawno/include", "-d3", "/tmp/gm.pwn"]
        );
        session.clear_listeners();
    }
}
