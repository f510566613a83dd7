//! Calling library methods from running threads

mod common;

use common::{emit, record, record_caught, Harness, Log};
use kava_engine::{
    EngineConfig, EngineResult, Halt, LibraryClass, MethodImplementation, NativeReturn, Program,
    StepContext, StepOutcome, TickOutcome, TryBlock, Value,
};

/// Step popping a string result into the log
fn record_string(log: &Log) -> impl Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static {
    let log = log.clone();
    move |ctx| {
        let value = ctx.pop()?;
        let text = value.as_primitive()?.as_str().unwrap_or("<not a string>").to_string();
        log.lock().push(text);
        Ok(StepOutcome::Next)
    }
}

/// Step popping an integer result into the log
fn record_int(log: &Log) -> impl Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static {
    let log = log.clone();
    move |ctx| {
        let n = ctx.pop()?.as_i64()?;
        log.lock().push(n.to_string());
        Ok(StepOutcome::Next)
    }
}

/// Step calling `signature` on the value in local 0
fn call_on_local(signature: &'static str) -> impl Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static {
    move |ctx| {
        let receiver = ctx.load_local(0)?;
        ctx.push(receiver)?;
        Ok(StepOutcome::InvokeVirtual {
            signature: signature.into(),
            args: 1,
        })
    }
}

fn speaks(text: &'static str) -> impl Fn(&mut StepContext<'_>, &[Value]) -> EngineResult<NativeReturn> + Send + Sync + 'static {
    move |_, _| Ok(NativeReturn::Value(Value::string(text)))
}

#[test]
fn test_string_methods_dispatch_on_string_values() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .step(|ctx| {
            ctx.push(Value::string("héllo"))?;
            Ok(StepOutcome::InvokeVirtual {
                signature: "length()".into(),
                args: 1,
            })
        })
        .step(record_int(&h.log))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["5"]);
}

#[test]
fn test_native_can_throw_into_caller() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(
            TryBlock::new().catch(["IndexOutOfBoundsException"], 3),
        )))
        .step(|ctx| {
            ctx.push(Value::string("ab"))?;
            ctx.push(Value::int(5))?;
            Ok(StepOutcome::InvokeVirtual {
                signature: "charAt(int)".into(),
                args: 2,
            })
        })
        .step(emit(StepOutcome::ExitTry))
        .step(record_caught(&h.log))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["IndexOutOfBoundsException"]);
}

#[test]
fn test_subclass_override_wins() {
    let classes = vec![
        LibraryClass::class("Animal").native("public String speak()", speaks("...")),
        LibraryClass::class("Dog")
            .extends("Animal")
            .native("public String speak()", speaks("woof")),
        LibraryClass::class("Cat").extends("Animal"),
    ];
    let mut h = Harness::with_library(EngineConfig::default(), classes);
    let main = Program::new("Main.main")
        .with_locals(1)
        .step(|ctx| {
            let dog = ctx.new_object("Dog")?;
            ctx.store_local(0, dog)?;
            Ok(StepOutcome::Next)
        })
        .step(call_on_local("speak()"))
        .step(record_string(&h.log))
        .step(|ctx| {
            let cat = ctx.new_object("Cat")?;
            ctx.store_local(0, cat)?;
            Ok(StepOutcome::Next)
        })
        .step(call_on_local("speak()"))
        .step(record_string(&h.log))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["woof", "..."]);
}

#[test]
fn test_exception_values_use_throwable_methods() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .step(|ctx| {
            let e = ctx.exception("FileNotFoundException", "a.txt")?;
            ctx.push(Value::Exception(e))?;
            Ok(StepOutcome::InvokeVirtual {
                signature: "getMessage()".into(),
                args: 1,
            })
        })
        .step(record_string(&h.log))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    h.engine.run(100);
    assert_eq!(h.entries(), vec!["a.txt"]);
}

#[test]
fn test_current_thread_native() {
    let mut h = Harness::new(EngineConfig::default());
    let current = h
        .engine
        .context()
        .library()
        .method("Thread", "currentThread()")
        .cloned()
        .unwrap();
    let log = h.log.clone();
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::Invoke {
            method: current,
            args: 0,
        }))
        .step(move |ctx| {
            let t = ctx.pop()?.as_thread()?;
            log.lock().push((t == ctx.thread_id()).to_string());
            Ok(StepOutcome::Next)
        })
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    h.engine.run(100);
    assert_eq!(h.entries(), vec!["true"]);
}

#[test]
fn test_unresolved_virtual_call_faults() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .with_locals(1)
        .step(|ctx| {
            let o = ctx.new_object("Object")?;
            ctx.store_local(0, o)?;
            Ok(StepOutcome::Next)
        })
        .step(call_on_local("fly()"))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert!(matches!(h.engine.run(100), TickOutcome::Halted(Halt::Fault(_))));
    assert!(h.sink.faults()[0].contains("fly()"));
}

#[test]
fn test_template_methods_are_not_callable() {
    let mut h = Harness::new(EngineConfig::default());
    let max = h
        .engine
        .context()
        .library()
        .method("Math", "max(int,int)")
        .cloned()
        .unwrap();
    assert!(matches!(max, MethodImplementation::Template(_)));
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::Invoke { method: max, args: 0 }))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert!(matches!(h.engine.run(10), TickOutcome::Halted(Halt::Fault(_))));
}

// ============================================================================
// Semaphores
// ============================================================================

#[test]
fn test_semaphore_through_library_methods() {
    let mut h = Harness::new(EngineConfig::default());
    let constructor = h
        .engine
        .context()
        .library()
        .method("Semaphore", "Semaphore(int)")
        .cloned()
        .unwrap();
    let main = Program::new("Main.main")
        .with_locals(1)
        .step(move |ctx| {
            let semaphore = ctx.new_object("Semaphore")?;
            ctx.store_local(0, semaphore.clone())?;
            ctx.push(semaphore)?;
            ctx.push(Value::int(2))?;
            Ok(StepOutcome::Invoke {
                method: constructor.clone(),
                args: 2,
            })
        })
        .step(|ctx| {
            let semaphore = ctx.load_local(0)?;
            ctx.push(semaphore)?;
            ctx.push(Value::int(2))?;
            Ok(StepOutcome::InvokeVirtual {
                signature: "acquire(int)".into(),
                args: 2,
            })
        })
        .step(call_on_local("availablePermits()"))
        .step(record_int(&h.log))
        .step(call_on_local("release()"))
        .step(call_on_local("availablePermits()"))
        .step(record_int(&h.log))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["0", "1"]);
}

#[test]
fn test_blocked_acquire_resumes_on_release() {
    let mut h = Harness::new(EngineConfig::default());
    let semaphore = h.engine.context().new_object("Semaphore").unwrap();
    let object = semaphore.as_object().unwrap().id().unwrap();
    let setup = semaphore.clone();
    let main = Program::new("Main.main")
        .step(move |ctx| {
            ctx.create_semaphore(&setup, 0)?;
            Ok(StepOutcome::Next)
        })
        .step(record(&h.log, "releasing"))
        .step(emit(StepOutcome::SemaphoreRelease {
            semaphore: semaphore.clone(),
            permits: 1,
        }))
        .into_arc();
    let worker = Program::new("Worker.run")
        .step(emit(StepOutcome::SemaphoreAcquire {
            semaphore: semaphore.clone(),
            permits: 1,
        }))
        .step(record(&h.log, "acquired"))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();
    h.engine.spawn("worker", worker, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["releasing", "acquired"]);
    assert_eq!(
        h.engine.scheduler().semaphore(object).unwrap().available_permits(),
        0
    );
}

#[test]
fn test_semaphore_can_start_in_deficit() {
    let mut h = Harness::new(EngineConfig::default());
    let constructor = h
        .engine
        .context()
        .library()
        .method("Semaphore", "Semaphore(int)")
        .cloned()
        .unwrap();
    let main = Program::new("Main.main")
        .with_locals(1)
        .step(move |ctx| {
            let semaphore = ctx.new_object("Semaphore")?;
            ctx.store_local(0, semaphore.clone())?;
            ctx.push(semaphore)?;
            ctx.push(Value::int(-1))?;
            Ok(StepOutcome::Invoke {
                method: constructor.clone(),
                args: 2,
            })
        })
        .step(call_on_local("availablePermits()"))
        .step(record_int(&h.log))
        .step(call_on_local("release()"))
        .step(call_on_local("availablePermits()"))
        .step(record_int(&h.log))
        .step(call_on_local("release()"))
        .step(call_on_local("availablePermits()"))
        .step(record_int(&h.log))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["-1", "0", "1"]);
    assert!(h.sink.uncaught().is_empty());
}

#[test]
fn test_negative_permits_throw() {
    let mut h = Harness::new(EngineConfig::default());
    let constructor = h
        .engine
        .context()
        .library()
        .method("Semaphore", "Semaphore(int)")
        .cloned()
        .unwrap();
    let main = Program::new("Main.main")
        .with_locals(1)
        .step(move |ctx| {
            let semaphore = ctx.new_object("Semaphore")?;
            ctx.store_local(0, semaphore.clone())?;
            ctx.push(semaphore)?;
            ctx.push(Value::int(1))?;
            Ok(StepOutcome::Invoke {
                method: constructor.clone(),
                args: 2,
            })
        })
        .step(|ctx| {
            let semaphore = ctx.load_local(0)?;
            ctx.push(semaphore)?;
            ctx.push(Value::int(-1))?;
            Ok(StepOutcome::InvokeVirtual {
                signature: "release(int)".into(),
                args: 2,
            })
        })
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();
    h.engine.run(100);

    assert_eq!(h.sink.uncaught()[0].identifier, "IllegalArgumentException");
}
