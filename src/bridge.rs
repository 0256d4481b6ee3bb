use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::args::ArgVector;
use crate::compiler::Compiler;
use crate::listeners::{self, ErrorListener, OutputListener};
use crate::workdir::WorkingDirGuard;

/// The working directory is process-global, so only one compile may be in
/// flight at a time.
static COMPILE_LOCK: Mutex<()> = Mutex::new(());

/// Proof that the caller holds the compile lock. Lets a caller run several
/// steps around one compile without another compile slipping in between.
pub struct CompileTicket {
    _guard: MutexGuard<'static, ()>,
}

/// The bridge's operations bound to one compiler backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bridge<C> {
    compiler: C,
}

impl<C: Compiler> Bridge<C> {
    pub const fn new(compiler: C) -> Self {
        Self { compiler }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Run the compiler on an already-marshaled argument vector.
    ///
    /// The status is returned as the compiler produced it.
    pub fn compile_argv(&self, args: ArgVector) -> i32 {
        let ticket = Self::ticket();
        self.compile_with_ticket(&ticket, args)
    }

    /// Block until no other compile is running.
    pub fn ticket() -> CompileTicket {
        CompileTicket {
            _guard: COMPILE_LOCK.lock(),
        }
    }

    /// `compile_argv` for a caller that already holds the lock.
    pub fn compile_with_ticket(&self, _ticket: &CompileTicket, mut args: ArgVector) -> i32 {
        let _cwd = WorkingDirGuard::enter_source_dir(&args);

        log::info!("Calling pc_compile with {} args", args.argc());
        let result = self.compiler.compile(&mut args);
        log::info!("pc_compile returned {result}");
        result
    }

    pub fn compile<I, S>(&self, args: I) -> i32
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.compile_argv(ArgVector::from_args(args))
    }

    pub fn set_output_listener(&self, listener: Option<Arc<dyn OutputListener>>) {
        listeners::set_output_listener(&self.compiler, listener);
    }

    pub fn set_error_listener(&self, listener: Option<Arc<dyn ErrorListener>>) {
        listeners::set_error_listener(&self.compiler, listener);
    }

    pub fn clear_listeners(&self) {
        listeners::clear_listeners(&self.compiler);
    }
}
