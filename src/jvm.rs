//! JNI glue for `com.rvdjv.pawnmc.PawnCompiler`.
//!
//! Managed listeners are pinned with global references and called through
//! method IDs cached when they are registered. Compiler callbacks can fire on
//! a thread the VM has never seen; such threads are attached on first use and
//! stay attached.

use std::sync::OnceLock;

use jni::objects::{GlobalRef, JMethodID, JObject, JObjectArray, JString, JValue};
use jni::signature::{Primitive, ReturnType};
use jni::sys::jsize;
use jni::{JNIEnv, JavaVM};

use crate::bridge::Bridge;
use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;
use crate::error::BridgeError;
use crate::listeners::{ErrorListener, OutputListener};

pub const OUTPUT_METHOD: &str = "onOutput";
pub const OUTPUT_SIGNATURE: &str = "(Ljava/lang/String;)V";
pub const ERROR_METHOD: &str = "onError";
pub const ERROR_SIGNATURE: &str = "(ILjava/lang/String;IILjava/lang/String;)V";

static JVM: OnceLock<JavaVM> = OnceLock::new();

/// Remember the VM for callback delivery. Later calls are ignored.
pub fn register_vm(vm: JavaVM) {
    let _ = JVM.set(vm);
}

/// The registered VM, falling back to the one behind `env` when the library
/// was loaded without `JNI_OnLoad` running.
fn java_vm(env: &JNIEnv) -> Result<&'static JavaVM, BridgeError> {
    if let Some(vm) = JVM.get() {
        return Ok(vm);
    }
    let vm = env.get_java_vm()?;
    Ok(JVM.get_or_init(|| vm))
}

/// Describe and clear a pending Java exception so later JNI calls stay legal.
fn clear_exception(env: &mut JNIEnv, context: &str) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
        log::error!("Java exception during {context}");
    }
}

// ── Listener proxies ─────────────────────────────────────────────

/// A managed object plus the cached method to call on it.
struct JavaTarget {
    vm: &'static JavaVM,
    object: GlobalRef,
    method: JMethodID,
}

impl JavaTarget {
    fn resolve(
        env: &mut JNIEnv,
        listener: &JObject,
        name: &str,
        signature: &str,
    ) -> Result<Self, BridgeError> {
        let vm = java_vm(env)?;
        let object = env.new_global_ref(listener)?;
        let class = env.get_object_class(listener)?;
        let method = env.get_method_id(&class, name, signature);
        if method.is_err() {
            clear_exception(env, name);
        }
        env.delete_local_ref(class)?;
        let method = method?;
        Ok(Self { vm, object, method })
    }
}

/// Forwards compiler output to `OutputCallback.onOutput(String)`.
pub struct JavaOutputListener {
    target: JavaTarget,
}

impl JavaOutputListener {
    pub fn new(env: &mut JNIEnv, listener: &JObject) -> Result<Self, BridgeError> {
        Ok(Self {
            target: JavaTarget::resolve(env, listener, OUTPUT_METHOD, OUTPUT_SIGNATURE)?,
        })
    }

    fn deliver(&self, message: &str) -> Result<(), BridgeError> {
        let target = &self.target;
        let mut env = target.vm.attach_current_thread_permanently()?;
        let jmessage = env.new_string(message)?;
        // SAFETY: `method` was resolved on this object's class with signature
        // `(Ljava/lang/String;)V` and the one argument is a java.lang.String.
        let result = unsafe {
            env.call_method_unchecked(
                &target.object,
                target.method,
                ReturnType::Primitive(Primitive::Void),
                &[JValue::Object(&jmessage).as_jni()],
            )
        };
        clear_exception(&mut env, OUTPUT_METHOD);
        env.delete_local_ref(jmessage)?;
        result?;
        Ok(())
    }
}

impl OutputListener for JavaOutputListener {
    fn on_output(&self, message: &str) {
        if let Err(e) = self.deliver(message) {
            log::error!("Failed to deliver compiler output: {e}");
        }
    }
}

/// Forwards diagnostics to `ErrorCallback.onError(int, String, int, int, String)`.
pub struct JavaErrorListener {
    target: JavaTarget,
}

impl JavaErrorListener {
    pub fn new(env: &mut JNIEnv, listener: &JObject) -> Result<Self, BridgeError> {
        Ok(Self {
            target: JavaTarget::resolve(env, listener, ERROR_METHOD, ERROR_SIGNATURE)?,
        })
    }

    fn deliver(&self, diagnostic: &Diagnostic) -> Result<(), BridgeError> {
        let target = &self.target;
        let mut env = target.vm.attach_current_thread_permanently()?;
        let jfile = env.new_string(&diagnostic.file)?;
        let jmessage = env.new_string(&diagnostic.message)?;
        // SAFETY: `method` was resolved with signature
        // `(ILjava/lang/String;IILjava/lang/String;)V`; the arguments below
        // follow it exactly.
        let result = unsafe {
            env.call_method_unchecked(
                &target.object,
                target.method,
                ReturnType::Primitive(Primitive::Void),
                &[
                    JValue::Int(diagnostic.number).as_jni(),
                    JValue::Object(&jfile).as_jni(),
                    JValue::Int(diagnostic.first_line).as_jni(),
                    JValue::Int(diagnostic.last_line).as_jni(),
                    JValue::Object(&jmessage).as_jni(),
                ],
            )
        };
        clear_exception(&mut env, ERROR_METHOD);
        env.delete_local_ref(jfile)?;
        env.delete_local_ref(jmessage)?;
        result?;
        Ok(())
    }
}

impl ErrorListener for JavaErrorListener {
    fn on_error(&self, diagnostic: &Diagnostic) {
        if let Err(e) = self.deliver(diagnostic) {
            log::error!("Failed to deliver compiler diagnostic: {e}");
        }
    }
}

// ── Argument arrays ──────────────────────────────────────────────

fn read_element(
    env: &mut JNIEnv,
    array: &JObjectArray,
    index: jsize,
) -> Result<String, BridgeError> {
    let position = usize::try_from(index).unwrap_or_default();
    let element = env.get_object_array_element(array, index)?;
    if element.is_null() {
        return Err(BridgeError::MissingElement { index: position });
    }
    let jstr = JString::from(element);
    let value = env
        .get_string(&jstr)
        .map(String::from)
        .map_err(|e| BridgeError::InvalidArgument {
            index: position,
            message: e.to_string(),
        });
    env.delete_local_ref(jstr)?;
    value
}

/// Elements of a managed argument array, read one at a time.
pub trait ArgumentSource {
    /// Number of elements. An error means the array itself is unusable.
    fn count(&mut self) -> Result<usize, BridgeError>;

    fn element(&mut self, index: usize) -> Result<String, BridgeError>;

    /// Called after a failed `element` so later reads start clean.
    fn recover(&mut self) {}
}

/// Read every element in order. Null or unreadable elements are logged and
/// skipped; only a failure to read the array itself is an error.
pub fn read_arguments<A: ArgumentSource + ?Sized>(
    source: &mut A,
) -> Result<Vec<String>, BridgeError> {
    let count = source.count()?;
    let mut args = Vec::with_capacity(count);
    for index in 0..count {
        match source.element(index) {
            Ok(arg) => args.push(arg),
            Err(e) => {
                source.recover();
                log::error!("{e}");
            }
        }
    }
    Ok(args)
}

/// Status reported when the arguments could not be read at all.
pub const UNREADABLE_ARGUMENTS: i32 = -1;

/// Marshal `source` and compile it. If the array cannot be read the compiler
/// is not called and `UNREADABLE_ARGUMENTS` is returned.
pub fn compile_arguments<C, A>(bridge: &Bridge<C>, source: &mut A) -> i32
where
    C: Compiler,
    A: ArgumentSource + ?Sized,
{
    match read_arguments(source) {
        Ok(args) => bridge.compile(args),
        Err(e) => {
            log::error!("Cannot read compiler arguments: {e}");
            UNREADABLE_ARGUMENTS
        }
    }
}

/// A `String[]` handed over by the VM.
pub struct JavaStringArray<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
    array: &'a JObjectArray<'local>,
}

impl<'a, 'local> JavaStringArray<'a, 'local> {
    pub fn new(env: &'a mut JNIEnv<'local>, array: &'a JObjectArray<'local>) -> Self {
        Self { env, array }
    }
}

impl ArgumentSource for JavaStringArray<'_, '_> {
    fn count(&mut self) -> Result<usize, BridgeError> {
        if self.array.is_null() {
            return Err(BridgeError::Jni {
                message: "argument array is null".into(),
            });
        }
        let len = self.env.get_array_length(self.array)?;
        Ok(usize::try_from(len).unwrap_or_default())
    }

    fn element(&mut self, index: usize) -> Result<String, BridgeError> {
        let jindex = jsize::try_from(index).map_err(|e| BridgeError::InvalidArgument {
            index,
            message: e.to_string(),
        })?;
        read_element(self.env, self.array, jindex)
    }

    fn recover(&mut self) {
        clear_exception(self.env, "argument marshaling");
    }
}

pub fn read_string_array<'local>(
    env: &mut JNIEnv<'local>,
    array: &JObjectArray<'local>,
) -> Result<Vec<String>, BridgeError> {
    read_arguments(&mut JavaStringArray::new(env, array))
}

// ── Exports ──────────────────────────────────────────────────────

#[cfg(feature = "pawnc")]
#[allow(non_snake_case)]
mod exports {
    use std::ffi::c_void;
    use std::sync::Arc;

    use jni::objects::{JObject, JObjectArray};
    use jni::sys::{jint, JNI_ERR, JNI_VERSION_1_6};
    use jni::{JNIEnv, JavaVM};

    use super::{compile_arguments, register_vm, JavaErrorListener, JavaOutputListener, JavaStringArray};
    use crate::bridge::Bridge;
    use crate::compiler::Pawnc;
    use crate::listeners::{ErrorListener, OutputListener};
    use crate::logging;

    static BRIDGE: Bridge<Pawnc> = Bridge::new(Pawnc);

    #[no_mangle]
    pub extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
        logging::init();
        // SAFETY: the VM passes a valid pointer that outlives this library.
        match unsafe { JavaVM::from_raw(vm) } {
            Ok(vm) => {
                register_vm(vm);
                JNI_VERSION_1_6
            }
            Err(e) => {
                log::error!("JNI_OnLoad received an unusable VM: {e}");
                JNI_ERR
            }
        }
    }

    #[no_mangle]
    pub extern "system" fn Java_com_rvdjv_pawnmc_PawnCompiler_nativeCompile<'local>(
        mut env: JNIEnv<'local>,
        _this: JObject<'local>,
        args: JObjectArray<'local>,
    ) -> jint {
        compile_arguments(&BRIDGE, &mut JavaStringArray::new(&mut env, &args))
    }

    #[no_mangle]
    pub extern "system" fn Java_com_rvdjv_pawnmc_PawnCompiler_nativeSetOutputCallback<'local>(
        mut env: JNIEnv<'local>,
        _this: JObject<'local>,
        listener: JObject<'local>,
    ) {
        let listener: Option<Arc<dyn OutputListener>> = if listener.is_null() {
            None
        } else {
            match JavaOutputListener::new(&mut env, &listener) {
                Ok(proxy) => Some(Arc::new(proxy)),
                Err(e) => {
                    log::error!("Failed to register output callback: {e}");
                    None
                }
            }
        };
        BRIDGE.set_output_listener(listener);
    }

    #[no_mangle]
    pub extern "system" fn Java_com_rvdjv_pawnmc_PawnCompiler_nativeSetErrorCallback<'local>(
        mut env: JNIEnv<'local>,
        _this: JObject<'local>,
        listener: JObject<'local>,
    ) {
        let listener: Option<Arc<dyn ErrorListener>> = if listener.is_null() {
            None
        } else {
            match JavaErrorListener::new(&mut env, &listener) {
                Ok(proxy) => Some(Arc::new(proxy)),
                Err(e) => {
                    log::error!("Failed to register error callback: {e}");
                    None
                }
            }
        };
        BRIDGE.set_error_listener(listener);
    }

    #[no_mangle]
    pub extern "system" fn Java_com_rvdjv_pawnmc_PawnCompiler_nativeClearCallbacks<'local>(
        _env: JNIEnv<'local>,
        _this: JObject<'local>,
    ) {
        BRIDGE.clear_listeners();
    }
}
