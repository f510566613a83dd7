//! Catch selection, finally blocks and uncaught reports

mod common;

use common::{emit, record, record_caught, Harness};
use kava_engine::{
    EngineConfig, Halt, IoToken, JavaException, LibraryClass, MethodImplementation, Program,
    SourceRange, StepOutcome, TickOutcome, TryBlock, Value,
};
use std::sync::Arc;

// ============================================================================
// Catch Clauses
// ============================================================================

#[test]
fn test_first_matching_clause_wins() {
    let mut h = Harness::new(EngineConfig::default());
    let log = h.log.clone();
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(
            TryBlock::new()
                .catch(["IOException"], 4)
                .catch(["Exception"], 6),
        )))
        .step(|ctx| ctx.throw("FileNotFoundException", "a.txt"))
        .step(emit(StepOutcome::ExitTry))
        .step(emit(StepOutcome::Return(None)))
        .step(move |ctx| {
            let caught = ctx.pop()?;
            log.lock().push(format!("io: {}", caught.as_exception()?));
            Ok(StepOutcome::Next)
        })
        .step(emit(StepOutcome::Return(None)))
        .step(record(&h.log, "exception"))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["io: FileNotFoundException: a.txt"]);
}

#[test]
fn test_multi_catch_clause() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(TryBlock::new().catch(
            ["ArithmeticException", "NullPointerException"],
            3,
        ))))
        .step(|ctx| ctx.throw("NullPointerException", "x"))
        .step(emit(StepOutcome::ExitTry))
        .step(record_caught(&h.log))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    h.engine.run(100);
    assert_eq!(h.entries(), vec!["NullPointerException"]);
}

#[test]
fn test_exception_crosses_frames_and_restores_stack() {
    let mut h = Harness::new(EngineConfig::default());
    let log = h.log.clone();
    let thrower = Program::new("Util.fail")
        .step(|ctx| {
            ctx.push(Value::int(9))?;
            Ok(StepOutcome::Next)
        })
        .step(|ctx| ctx.throw("IllegalArgumentException", "bad"))
        .into_arc();
    let main = Program::new("Main.main")
        .step(|ctx| {
            for i in 0..3 {
                ctx.push(Value::int(i))?;
            }
            Ok(StepOutcome::Next)
        })
        .step(emit(StepOutcome::EnterTry(
            TryBlock::new().catch(["RuntimeException"], 5),
        )))
        .step(|ctx| {
            ctx.push(Value::int(3))?;
            ctx.push(Value::int(4))?;
            Ok(StepOutcome::Next)
        })
        .step(emit(StepOutcome::Invoke {
            method: MethodImplementation::Java(thrower),
            args: 0,
        }))
        .step(emit(StepOutcome::Return(None)))
        .step(move |ctx| {
            let caught = ctx.pop()?;
            log.lock().push(format!(
                "{} at depth {}",
                caught.as_exception()?.identifier(),
                ctx.depth()
            ));
            Ok(StepOutcome::Next)
        })
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["IllegalArgumentException at depth 3"]);
}

// ============================================================================
// Finally Blocks
// ============================================================================

#[test]
fn test_finally_runs_before_return_value_reaches_caller() {
    let mut h = Harness::new(EngineConfig::default());
    let log = h.log.clone();
    let callee = Program::new("Util.value")
        .step(emit(StepOutcome::EnterTry(TryBlock::new().finally(3))))
        .step(emit(StepOutcome::Return(Some(Value::int(7)))))
        .step(emit(StepOutcome::ExitTry))
        .step(record(&h.log, "finally"))
        .step(emit(StepOutcome::EndFinally))
        .into_arc();
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::Invoke {
            method: MethodImplementation::Java(callee),
            args: 0,
        }))
        .step(move |ctx| {
            let value = ctx.pop()?.as_i64()?;
            log.lock().push(format!("got {}", value));
            Ok(StepOutcome::Next)
        })
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["finally", "got 7"]);
}

#[test]
fn test_finally_runs_after_normal_completion() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(TryBlock::new().finally(4))))
        .step(record(&h.log, "body"))
        .step(emit(StepOutcome::ExitTry))
        .step(emit(StepOutcome::Jump(6)))
        .step(record(&h.log, "finally"))
        .step(emit(StepOutcome::EndFinally))
        .step(record(&h.log, "after"))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["body", "finally", "after"]);
}

#[test]
fn test_finally_runs_after_catch_handler() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(
            TryBlock::new().catch(["Exception"], 4).finally(7),
        )))
        .step(|ctx| ctx.throw("IOException", "disk"))
        .step(emit(StepOutcome::ExitTry))
        .step(emit(StepOutcome::Jump(9)))
        .step(record_caught(&h.log))
        .step(emit(StepOutcome::ExitTry))
        .step(emit(StepOutcome::Jump(9)))
        .step(record(&h.log, "finally"))
        .step(emit(StepOutcome::EndFinally))
        .step(record(&h.log, "after"))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["IOException", "finally", "after"]);
}

#[test]
fn test_exception_in_handler_still_runs_finally() {
    let classes = vec![LibraryClass::class("IllegalStateException").extends("RuntimeException")];
    let mut h = Harness::with_library(EngineConfig::default(), classes);
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(
            TryBlock::new().catch(["Exception"], 3).finally(5),
        )))
        .step(|ctx| ctx.throw("IOException", "disk"))
        .step(emit(StepOutcome::ExitTry))
        .step(record_caught(&h.log))
        .step(|ctx| ctx.throw("IllegalStateException", "handler"))
        .step(record(&h.log, "finally"))
        .step(emit(StepOutcome::EndFinally))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["IOException", "finally"]);
    let uncaught = h.sink.uncaught();
    assert_eq!(uncaught.len(), 1);
    assert_eq!(uncaught[0].identifier, "IllegalStateException");
}

// ============================================================================
// Uncaught Exceptions
// ============================================================================

#[test]
fn test_uncaught_report_carries_thread_and_trace() {
    let mut h = Harness::new(EngineConfig::default());
    let failing = Program::new("Util.fail")
        .step_at(SourceRange::at(12, 9), |ctx| ctx.throw("IOException", "disk"))
        .into_arc();
    let main = Program::new("Main.main")
        .step_at(
            SourceRange::at(3, 5),
            emit(StepOutcome::Invoke {
                method: MethodImplementation::Java(failing),
                args: 0,
            }),
        )
        .step(record(&h.log, "unreachable"))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert!(h.entries().is_empty());

    let uncaught = h.sink.uncaught();
    assert_eq!(uncaught.len(), 1);
    let report = &uncaught[0];
    assert_eq!(report.thread_name, "main");
    assert_eq!(report.message.as_deref(), Some("disk"));
    assert_eq!(report.source, Some(SourceRange::at(12, 9)));
    let text = report.to_string();
    assert!(text.starts_with("Exception in thread \"main\" IOException: disk"));
    assert!(text.contains("at Util.fail"));
    assert!(text.contains("at Main.main"));
    assert_eq!(h.engine.scheduler().stats().uncaught_exceptions, 1);
}

#[test]
fn test_uncaught_exception_ends_only_its_thread() {
    let mut h = Harness::new(EngineConfig::default());
    let failing = Program::new("Fail.run")
        .step(|ctx| ctx.throw("RuntimeException", "x"))
        .into_arc();
    let survivor = Program::new("Survivor.run")
        .step(record(&h.log, "s0"))
        .step(record(&h.log, "s1"))
        .into_arc();
    h.engine.spawn("fail", failing, vec![]).unwrap();
    h.engine.spawn("survivor", survivor, vec![]).unwrap();

    assert_eq!(h.engine.run(100), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["s0", "s1"]);
    assert_eq!(h.sink.uncaught()[0].thread_name, "fail");
}

#[test]
fn test_uncatchable_bypasses_handlers_and_halts() {
    let mut h = Harness::new(EngineConfig::default());
    let killer = Arc::new(JavaException::uncatchable("ThreadDeath", None));
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(
            TryBlock::new().catch(["Throwable"], 3).finally(4),
        )))
        .step(emit(StepOutcome::Throw(killer)))
        .step(emit(StepOutcome::ExitTry))
        .step(record_caught(&h.log))
        .step(record(&h.log, "finally"))
        .step(emit(StepOutcome::EndFinally))
        .into_arc();
    let other = Program::new("Other.run")
        .step(emit(StepOutcome::Jump(0)))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();
    h.engine.spawn("other", other, vec![]).unwrap();

    assert_eq!(
        h.engine.run(100),
        TickOutcome::Halted(Halt::Uncatchable("ThreadDeath".into()))
    );
    assert_eq!(h.entries(), vec!["finally"]);
}

#[test]
fn test_rethrow_keeps_original_origin() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(TryBlock::new().catch(["Exception"], 3))))
        .step_at(SourceRange::at(4, 1), |ctx| ctx.throw("IOException", "first"))
        .step(emit(StepOutcome::ExitTry))
        .step_at(SourceRange::at(8, 1), emit(StepOutcome::Rethrow))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();
    h.engine.run(100);

    let uncaught = h.sink.uncaught();
    assert_eq!(uncaught[0].identifier, "IOException");
    assert_eq!(uncaught[0].source, Some(SourceRange::at(4, 1)));
}

// ============================================================================
// Engine-raised Exceptions
// ============================================================================

#[test]
fn test_deep_recursion_throws_stack_overflow_error() {
    let recurse = Program::new("Recursor.down")
        .with_locals(1)
        .step(|ctx| {
            let receiver = ctx.load_local(0)?;
            ctx.push(receiver)?;
            Ok(StepOutcome::InvokeVirtual {
                signature: "down()".into(),
                args: 1,
            })
        })
        .step(emit(StepOutcome::Return(None)));
    let classes = vec![LibraryClass::class("Recursor").java("public void down()", recurse)];
    let config = EngineConfig {
        max_call_depth: 50,
        ..EngineConfig::default()
    };
    let mut h = Harness::with_library(config, classes);
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(
            TryBlock::new().catch(["StackOverflowError"], 4),
        )))
        .step(|ctx| {
            let receiver = ctx.new_object("Recursor")?;
            ctx.push(receiver)?;
            Ok(StepOutcome::InvokeVirtual {
                signature: "down()".into(),
                args: 1,
            })
        })
        .step(emit(StepOutcome::ExitTry))
        .step(emit(StepOutcome::Return(None)))
        .step(record_caught(&h.log))
        .into_arc();
    let id = h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(1_000), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["StackOverflowError"]);
    assert!(h.sink.faults().is_empty());
    assert_eq!(h.engine.scheduler().thread(id).unwrap().stack().frame_count(), 0);
}

#[test]
fn test_virtual_call_on_null_throws() {
    let mut h = Harness::new(EngineConfig::default());
    let main = Program::new("Main.main")
        .step(|ctx| {
            ctx.push(Value::Null)?;
            Ok(StepOutcome::InvokeVirtual {
                signature: "hashCode()".into(),
                args: 1,
            })
        })
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();
    h.engine.run(10);

    let uncaught = h.sink.uncaught();
    assert_eq!(uncaught[0].identifier, "NullPointerException");
    assert!(uncaught[0]
        .message
        .as_deref()
        .is_some_and(|m| m.contains("hashCode()")));
}

// ============================================================================
// Host I/O
// ============================================================================

#[test]
fn test_io_completion_pushes_result() {
    let mut h = Harness::new(EngineConfig::default());
    let token = IoToken::new();
    let log = h.log.clone();
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::AwaitIo(token)))
        .step(move |ctx| {
            let n = ctx.pop()?.as_i64()?;
            log.lock().push(n.to_string());
            Ok(StepOutcome::Next)
        })
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(10), TickOutcome::Idle);
    h.engine
        .scheduler_mut()
        .complete_io(token, Some(Value::int(42)))
        .unwrap();
    assert_eq!(h.engine.run(10), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["42"]);
    assert!(h.engine.scheduler_mut().complete_io(token, None).is_err());
}

#[test]
fn test_io_failure_throws_in_waiting_thread() {
    let mut h = Harness::new(EngineConfig::default());
    let token = IoToken::new();
    let main = Program::new("Main.main")
        .step(emit(StepOutcome::EnterTry(TryBlock::new().catch(["IOException"], 4))))
        .step(emit(StepOutcome::AwaitIo(token)))
        .step(emit(StepOutcome::ExitTry))
        .step(emit(StepOutcome::Return(None)))
        .step(record_caught(&h.log))
        .into_arc();
    h.engine.spawn_main(main, vec![]).unwrap();

    assert_eq!(h.engine.run(10), TickOutcome::Idle);
    let failure = h
        .engine
        .context()
        .exception("IOException", Some("connection reset".into()))
        .unwrap();
    h.engine.scheduler_mut().fail_io(token, failure).unwrap();
    assert_eq!(h.engine.run(10), TickOutcome::Finished);
    assert_eq!(h.entries(), vec!["IOException"]);
}
