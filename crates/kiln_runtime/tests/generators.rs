use kiln_runtime::ops;
use kiln_runtime::{
    CallSite, CellRef, Context, ExcKind, Frame, GenStep, Outcome, RuntimeConfig, Signal, Value,
};

const SITE: CallSite = CallSite::new("gen.kn", 7);

fn counter(ctx: &mut Context, _: Option<CellRef<Frame>>, _: usize) -> Outcome {
    match ctx.resume_point() {
        None => Err(ctx.suspend(1, &[Value::Int(100)], Value::Int(10))),
        Some((1, locals)) => {
            let next = ops::add_int(ctx, locals[0], 1)?;
            Err(ctx.suspend(2, &[next], Value::Int(20)))
        }
        Some((_, locals)) => ops::add_int(ctx, locals[0], 1),
    }
}

#[test]
fn generator_yields_then_finishes() {
    let mut ctx = Context::default();
    let g = ctx.closure("counter", counter, None);
    ctx.push_var(g).unwrap();

    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Yielded(Value::Int(10))));
    assert!(!ctx.is_finished(g));
    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Yielded(Value::Int(20))));
    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Done(Value::Int(102))));
    assert!(ctx.is_finished(g));
    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Done(Value::Undefined)));
    assert_eq!(ctx.depth(), 0);
    assert_eq!(ctx.stack_pointer(), 1);
}

fn keeps_a_string(ctx: &mut Context, _: Option<CellRef<Frame>>, _: usize) -> Outcome {
    match ctx.resume_point() {
        None => {
            let s = ctx.string("kept");
            Err(ctx.suspend(1, &[s], s))
        }
        Some((_, locals)) => {
            for i in 0..16 {
                ctx.string(&format!("garbage{i}"));
            }
            ctx.collect();
            Ok(Value::bool(ctx.heap.str_of(locals[0]) == Some("kept")))
        }
    }
}

#[test]
fn saved_locals_survive_collection() {
    let mut ctx = Context::new(RuntimeConfig {
        gc_interval: 1,
        ..RuntimeConfig::default()
    });
    let g = ctx.closure("keeps_a_string", keeps_a_string, None);
    ctx.push_var(g).unwrap();

    let Ok(GenStep::Yielded(s)) = ctx.resume(g, SITE) else {
        panic!("first resume yields");
    };
    ctx.collect();
    assert_eq!(ctx.heap.str_of(s), Some("kept"));
    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Done(Value::TRUE)));

    ctx.collect();
    assert!(!ctx.heap.value_is_live(s), "a finished generator drops its snapshot");
}

fn fails_second_time(ctx: &mut Context, _: Option<CellRef<Frame>>, _: usize) -> Outcome {
    match ctx.resume_point() {
        None => Err(ctx.suspend(1, &[], Value::Int(1))),
        Some(_) => Err(ctx.throw(ExcKind::OutOfRange, "exhausted")),
    }
}

#[test]
fn an_exception_finishes_the_generator() {
    let mut ctx = Context::default();
    let g = ctx.closure("fails", fails_second_time, None);
    ctx.push_var(g).unwrap();

    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Yielded(Value::Int(1))));
    let Err(Signal::Exception(exc)) = ctx.resume(g, SITE) else {
        panic!("second resume throws");
    };
    let info = ctx.exception_info(exc).unwrap();
    assert_eq!(info.kind, "OutOfRange");
    assert_eq!(info.trace.len(), 1);
    assert_eq!(info.trace[0].function, "fails");
    assert_eq!(info.trace[0].file, "gen.kn");
    assert!(ctx.is_finished(g));
    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Done(Value::Undefined)));
}

fn leaf(ctx: &mut Context, _: Option<CellRef<Frame>>, _: usize) -> Outcome {
    match ctx.resume_point() {
        None => Err(ctx.suspend(1, &[], Value::Int(1))),
        Some(_) => Ok(Value::Int(2)),
    }
}

fn driver(ctx: &mut Context, env: Option<CellRef<Frame>>, _: usize) -> Outcome {
    let leaf = env.and_then(|f| ctx.load_var(f, 0, 0)).unwrap_or_default();
    match ctx.call(leaf, &[], CallSite::new("driver.kn", 4)) {
        Err(Signal::Yield) => Err(ctx.save_locals(1, &[])),
        other => other,
    }
}

#[test]
fn yields_from_nested_calls_reach_the_resumer() {
    let mut ctx = Context::default();
    let env = ctx.frame(1, None);
    let inner = ctx.closure("leaf", leaf, None);
    ctx.store_var(env, 0, 0, inner);
    let g = ctx.closure("driver", driver, Some(env));
    ctx.push_var(g).unwrap();

    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Yielded(Value::Int(1))));
    assert_eq!(ctx.resume(g, SITE), Ok(GenStep::Done(Value::Int(2))));
    assert!(ctx.is_finished(g));
}

#[test]
fn resuming_a_non_closure_is_a_type_mismatch() {
    let mut ctx = Context::default();
    let Err(Signal::Exception(exc)) = ctx.resume(Value::Int(1), SITE) else {
        panic!("ints cannot be resumed");
    };
    assert!(ctx.is_exception(exc, ExcKind::TypeMismatch));
    assert!(!ctx.is_finished(Value::Int(1)));
}
