//! Argument marshaling: managed string arrays to a C `argv`.
//!
//! Each argument is copied into its own NUL-terminated buffer, so the
//! compiler is free to scribble on them the way C `main` arguments allow.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use crate::error::BridgeError;

/// Program name passed as `argv[0]`.
pub const PROGRAM_NAME: &str = "pawncc";

/// Owned, ordered argument list plus a NULL-terminated pointer table.
#[derive(Debug, Default)]
pub struct ArgVector {
    buffers: Vec<Vec<u8>>,
    ptrs: Vec<*mut c_char>,
}

impl ArgVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any sequence of strings. Arguments that cannot be
    /// represented as C strings are logged and skipped.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut argv = Self::new();
        for (index, arg) in args.into_iter().enumerate() {
            if let Err(e) = argv.push(arg.as_ref(), index) {
                log::error!("{e}");
            }
        }
        argv
    }

    /// `program options… source`, the layout the managed wrapper sends.
    pub fn invocation<S: AsRef<str>>(program: &str, options: &[S], source: &Path) -> Self {
        let source = source.to_string_lossy();
        let args = std::iter::once(program)
            .chain(options.iter().map(|opt| opt.as_ref()))
            .chain(std::iter::once(&*source));
        Self::from_args(args)
    }

    fn push(&mut self, arg: &str, index: usize) -> Result<(), BridgeError> {
        let c = CString::new(arg).map_err(|e| BridgeError::InvalidArgument {
            index,
            message: e.to_string(),
        })?;
        self.buffers.push(c.into_bytes_with_nul());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Argument count as the C side sees it.
    pub fn argc(&self) -> c_int {
        c_int::try_from(self.buffers.len()).unwrap_or(c_int::MAX)
    }

    /// Pointer table for `char **argv`, terminated by a NULL entry.
    ///
    /// The pointers stay valid until `self` is mutated or dropped.
    pub fn as_mut_ptr(&mut self) -> *mut *mut c_char {
        self.ptrs.clear();
        self.ptrs.extend(
            self.buffers
                .iter_mut()
                .map(|buf| buf.as_mut_ptr().cast::<c_char>()),
        );
        self.ptrs.push(ptr::null_mut());
        self.ptrs.as_mut_ptr()
    }

    /// Arguments in order, without their terminators.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.buffers.iter().map(|buf| arg_str(buf))
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(str::to_owned).collect()
    }

    /// The source file is the last argument, provided there is more than
    /// just the program name.
    pub fn source_path(&self) -> Option<&str> {
        if self.buffers.len() > 1 {
            self.buffers.last().map(|buf| arg_str(buf))
        } else {
            None
        }
    }
}

fn arg_str(buf: &[u8]) -> &str {
    let bytes = buf.strip_suffix(&[0]).unwrap_or(buf);
    std::str::from_utf8(bytes).unwrap_or_default()
}
