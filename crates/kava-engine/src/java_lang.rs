//! Built-in classes every engine starts with

use crate::error::EngineResult;
use crate::library::{LibraryClass, NativeReturn};
use crate::program::{Program, StepContext, StepOutcome};
use crate::value::Value;
use kava_types::PrimitiveValue;

pub const ILLEGAL_ARGUMENT: &str = "IllegalArgumentException";
pub const ILLEGAL_MONITOR_STATE: &str = "IllegalMonitorStateException";
pub const NULL_POINTER: &str = "NullPointerException";
pub const STACK_OVERFLOW: &str = "StackOverflowError";
pub const ARITHMETIC: &str = "ArithmeticException";
pub const INDEX_OUT_OF_BOUNDS: &str = "IndexOutOfBoundsException";

/// `(class, superclass)` for the exception hierarchy
const THROWABLES: &[(&str, &str)] = &[
    ("Exception", "Throwable"),
    ("Error", "Throwable"),
    ("RuntimeException", "Exception"),
    (ILLEGAL_ARGUMENT, "RuntimeException"),
    (ILLEGAL_MONITOR_STATE, "RuntimeException"),
    (NULL_POINTER, "RuntimeException"),
    (ARITHMETIC, "RuntimeException"),
    (INDEX_OUT_OF_BOUNDS, "RuntimeException"),
    ("ClassCastException", "RuntimeException"),
    ("UnsupportedOperationException", "RuntimeException"),
    ("InterruptedException", "Exception"),
    ("IOException", "Exception"),
    ("FileNotFoundException", "IOException"),
    (STACK_OVERFLOW, "Error"),
];

/// Every built-in class declaration
pub fn classes() -> Vec<LibraryClass> {
    let mut out = vec![object(), string(), throwable(), thread(), semaphore(), math()];
    out.extend(
        THROWABLES
            .iter()
            .map(|(name, parent)| LibraryClass::class(*name).extends(*parent)),
    );
    out
}

/// Program that runs one step and returns nothing
fn single<F>(name: &str, args: usize, f: F) -> Program
where
    F: Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static,
{
    Program::new(name)
        .with_locals(args)
        .step(f)
        .step(|_| Ok(StepOutcome::Return(None)))
}

static NULL: Value = Value::Null;

/// Argument `index`, `null` when absent
fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

fn timeout_arg(ctx: &StepContext<'_>) -> EngineResult<Option<i64>> {
    Ok(Some(ctx.load_local(1)?.as_i64()?))
}

fn object() -> LibraryClass {
    LibraryClass::class("Object")
        .native("public int hashCode()", |_, args| {
            let hash = match args.first() {
                Some(Value::Object(h)) => h.id()?.as_u64() as i32,
                _ => 0,
            };
            Ok(NativeReturn::Value(Value::int(hash)))
        })
        .native("public String toString()", |_, args| {
            let text = args.first().map(Value::to_string).unwrap_or_default();
            Ok(NativeReturn::Value(Value::string(text)))
        })
        .java(
            "public final void wait()",
            single("Object.wait", 1, |ctx| {
                Ok(StepOutcome::Wait {
                    monitor: ctx.load_local(0)?,
                    timeout_ms: None,
                })
            }),
        )
        .java(
            "public final void wait(long timeout)",
            single("Object.wait", 2, |ctx| {
                Ok(StepOutcome::Wait {
                    monitor: ctx.load_local(0)?,
                    timeout_ms: timeout_arg(ctx)?,
                })
            }),
        )
        .java(
            "public final void notify()",
            single("Object.notify", 1, |ctx| Ok(StepOutcome::Notify(ctx.load_local(0)?))),
        )
        .java(
            "public final void notifyAll()",
            single("Object.notifyAll", 1, |ctx| {
                Ok(StepOutcome::NotifyAll(ctx.load_local(0)?))
            }),
        )
}

fn string() -> LibraryClass {
    LibraryClass::class("String")
        .final_class()
        .native("public int length()", |_, args| {
            let s = string_receiver(args)?;
            Ok(NativeReturn::Value(Value::int(s.encode_utf16().count() as i32)))
        })
        .native("public char charAt(int index)", |ctx, args| {
            let s = string_receiver(args)?;
            let index = args.get(1).map(Value::as_i64).transpose()?.unwrap_or(-1);
            let unit = usize::try_from(index)
                .ok()
                .and_then(|i| s.encode_utf16().nth(i));
            match unit {
                Some(c) => Ok(NativeReturn::Value(Value::Primitive(PrimitiveValue::Char(c)))),
                None => Ok(NativeReturn::Throw(ctx.exception(
                    INDEX_OUT_OF_BOUNDS,
                    format!("Index {} out of bounds for length {}", index, s.encode_utf16().count()),
                )?)),
            }
        })
        .template("public static String valueOf(int i)", "(\"\" + $1)")
}

fn string_receiver(args: &[Value]) -> EngineResult<&str> {
    let receiver = arg(args, 0);
    receiver
        .as_primitive()?
        .as_str()
        .ok_or_else(|| StepContext::mismatch("String", receiver))
}

fn throwable() -> LibraryClass {
    LibraryClass::class("Throwable")
        .native("public String getMessage()", |_, args| {
            let receiver = arg(args, 0);
            let message = receiver.as_exception()?.message().map(Value::string);
            Ok(NativeReturn::Value(message.unwrap_or(Value::Null)))
        })
        .native("public String toString()", |_, args| {
            let receiver = arg(args, 0);
            Ok(NativeReturn::Value(Value::string(
                receiver.as_exception()?.to_string(),
            )))
        })
}

fn thread() -> LibraryClass {
    LibraryClass::class("Thread")
        .native("public static Thread currentThread()", |ctx, _| {
            Ok(NativeReturn::Value(Value::Thread(ctx.thread_id())))
        })
        .java(
            "public static void sleep(long millis)",
            single("Thread.sleep", 1, |ctx| {
                Ok(StepOutcome::Sleep(ctx.load_local(0)?.as_i64()?))
            }),
        )
        .java(
            "public static void yield()",
            single("Thread.yield", 0, |_| Ok(StepOutcome::Yield)),
        )
        .java(
            "public final void join()",
            single("Thread.join", 1, |ctx| {
                Ok(StepOutcome::Join {
                    thread: ctx.load_local(0)?.as_thread()?,
                    timeout_ms: None,
                })
            }),
        )
        .java(
            "public final void join(long millis)",
            single("Thread.join", 2, |ctx| {
                Ok(StepOutcome::Join {
                    thread: ctx.load_local(0)?.as_thread()?,
                    timeout_ms: timeout_arg(ctx)?,
                })
            }),
        )
}

/// Step acquiring or releasing the permits in local 1, or one permit
fn permit_step(
    release: bool,
    explicit: bool,
) -> impl Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static {
    move |ctx: &mut StepContext<'_>| {
        let permits = if explicit { ctx.load_local(1)?.as_i64()? } else { 1 };
        let Ok(permits) = usize::try_from(permits) else {
            return ctx.throw(ILLEGAL_ARGUMENT, "permits must not be negative");
        };
        let semaphore = ctx.load_local(0)?;
        Ok(if release {
            StepOutcome::SemaphoreRelease { semaphore, permits }
        } else {
            StepOutcome::SemaphoreAcquire { semaphore, permits }
        })
    }
}

fn semaphore() -> LibraryClass {
    LibraryClass::class("Semaphore")
        .native("public Semaphore(int permits)", |ctx, args| {
            let receiver = arg(args, 0);
            let permits = args.get(1).map(Value::as_i64).transpose()?.unwrap_or(0);
            ctx.create_semaphore(receiver, permits)?;
            Ok(NativeReturn::Void)
        })
        .native("public int availablePermits()", |ctx, args| {
            let receiver = arg(args, 0);
            let permits = ctx.available_permits(receiver)?;
            Ok(NativeReturn::Value(Value::int(permits as i32)))
        })
        .java("public void acquire()", single("Semaphore.acquire", 1, permit_step(false, false)))
        .java(
            "public void acquire(int permits)",
            single("Semaphore.acquire", 2, permit_step(false, true)),
        )
        .java("public void release()", single("Semaphore.release", 1, permit_step(true, false)))
        .java(
            "public void release(int permits)",
            single("Semaphore.release", 2, permit_step(true, true)),
        )
}

fn math() -> LibraryClass {
    LibraryClass::class("Math")
        .final_class()
        .native("public static int abs(int a)", |_, args| {
            let a = arg(args, 0).as_i64()? as i32;
            Ok(NativeReturn::Value(Value::int(a.wrapping_abs())))
        })
        .template("public static int max(int a, int b)", "(($1) >= ($2) ? ($1) : ($2))")
        .template("public static int min(int a, int b)", "(($1) <= ($2) ? ($1) : ($2))")
}
