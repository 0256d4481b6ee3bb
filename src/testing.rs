//! In-process stand-in for `libpawnc` used by the unit tests. It keeps the
//! sinks it is given and, on `compile`, replays a script through them the same
//! way the real compiler would.

use std::ffi::CString;
use std::path::PathBuf;
use std::thread;

use parking_lot::Mutex;

use crate::args::ArgVector;
use crate::compiler::{Compiler, ErrorSink, OutputSink};
use crate::diagnostic::Diagnostic;

#[derive(Debug, Clone)]
pub enum Event {
    Output(String),
    Error(Diagnostic),
}

#[derive(Default)]
struct Recorded {
    args: Vec<String>,
    cwd: Option<PathBuf>,
    clear_calls: usize,
}

pub struct ScriptedCompiler {
    status: i32,
    events: Vec<Event>,
    worker_thread: bool,
    output: Mutex<Option<OutputSink>>,
    error: Mutex<Option<ErrorSink>>,
    recorded: Mutex<Recorded>,
}

impl ScriptedCompiler {
    pub fn new(status: i32) -> Self {
        Self {
            status,
            events: Vec::new(),
            worker_thread: false,
            output: Mutex::new(None),
            error: Mutex::new(None),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    /// Fire callbacks from a freshly spawned thread instead of the caller's.
    pub fn on_worker_thread(mut self) -> Self {
        self.worker_thread = true;
        self
    }

    pub fn has_output_sink(&self) -> bool {
        self.output.lock().is_some()
    }

    pub fn has_error_sink(&self) -> bool {
        self.error.lock().is_some()
    }

    pub fn clear_calls(&self) -> usize {
        self.recorded.lock().clear_calls
    }

    pub fn seen_args(&self) -> Vec<String> {
        self.recorded.lock().args.clone()
    }

    pub fn seen_cwd(&self) -> Option<PathBuf> {
        self.recorded.lock().cwd.clone()
    }

    fn replay(events: &[Event], output: Option<OutputSink>, error: Option<ErrorSink>) {
        for event in events {
            match event {
                Event::Output(text) => {
                    if let (Some(sink), Ok(text)) = (output, CString::new(text.as_str())) {
                        sink(text.as_ptr());
                    }
                }
                Event::Error(d) => {
                    let (Some(sink), Ok(file), Ok(message)) = (
                        error,
                        CString::new(d.file.as_str()),
                        CString::new(d.message.as_str()),
                    ) else {
                        continue;
                    };
                    sink(d.number, file.as_ptr(), d.first_line, d.last_line, message.as_ptr());
                }
            }
        }
    }
}

impl Compiler for ScriptedCompiler {
    fn compile(&self, args: &mut ArgVector) -> i32 {
        {
            let mut recorded = self.recorded.lock();
            recorded.args = args.to_strings();
            recorded.cwd = std::env::current_dir().ok();
        }

        let output = *self.output.lock();
        let error = *self.error.lock();
        if self.worker_thread {
            let events = self.events.clone();
            let _ = thread::spawn(move || Self::replay(&events, output, error)).join();
        } else {
            Self::replay(&self.events, output, error);
        }
        self.status
    }

    fn set_output_sink(&self, sink: Option<OutputSink>) {
        *self.output.lock() = sink;
    }

    fn set_error_sink(&self, sink: Option<ErrorSink>) {
        *self.error.lock() = sink;
    }

    fn clear_sinks(&self) {
        *self.output.lock() = None;
        *self.error.lock() = None;
        self.recorded.lock().clear_calls += 1;
    }
}
