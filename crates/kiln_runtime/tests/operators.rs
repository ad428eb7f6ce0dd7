use kiln_runtime::{Context, Outcome, Signal, Value, ops};

fn thrown<T: std::fmt::Debug>(ctx: &Context, result: Outcome<T>) -> (String, String) {
    match result {
        Err(Signal::Exception(e)) => {
            let info = ctx.exception_info(e).expect("exception record");
            (info.kind, info.message)
        }
        other => panic!("expected an exception, got {other:?}"),
    }
}

fn text(ctx: &Context, v: Value) -> String {
    ctx.heap.str_of(v).expect("a live string").to_string()
}

#[test]
fn string_plus_anything_concatenates_display_forms() {
    let mut ctx = Context::default();
    let s = ctx.string("n=");
    let v = ops::add(&mut ctx, s, Value::Int(5)).unwrap();
    assert_eq!(text(&ctx, v), "n=5");

    let x = ctx.string("x");
    let v = ops::add(&mut ctx, Value::Int(5), x).unwrap();
    assert_eq!(text(&ctx, v), "5x");

    let a = ctx.string("a");
    let v = ops::add(&mut ctx, a, Value::Double(2.5)).unwrap();
    assert_eq!(text(&ctx, v), "a2.5");
    let v = ops::add(&mut ctx, a, Value::Undefined).unwrap();
    assert_eq!(text(&ctx, v), "aundefined");
}

#[test]
fn binaries_concatenate() {
    let mut ctx = Context::default();
    let a = ctx.binary(vec![1, 2]);
    let b = ctx.binary(vec![3]);
    let Value::Binary(joined) = ops::add(&mut ctx, a, b).unwrap() else {
        panic!("expected a binary");
    };
    assert_eq!(ctx.heap.bytes(joined), Some(&[1u8, 2, 3][..]));
}

#[test]
fn string_repetition() {
    let mut ctx = Context::default();
    let ab = ctx.string("ab");
    let v = ops::mul(&mut ctx, ab, Value::Int(3)).unwrap();
    assert_eq!(text(&ctx, v), "ababab");
    let v = ops::mul(&mut ctx, Value::Int(2), ab).unwrap();
    assert_eq!(text(&ctx, v), "abab");
    let v = ops::mul(&mut ctx, ab, Value::Int(0)).unwrap();
    assert_eq!(text(&ctx, v), "");

    let r = ops::mul(&mut ctx, ab, Value::Int(-1));
    assert_eq!(thrown(&ctx, r).0, "OutOfRange");
}

#[test]
fn string_division_joins_paths() {
    let mut ctx = Context::default();
    let cases = [("a", "b", "a/b"), ("a/", "/b", "a/b"), ("", "b", "b"), ("/", "etc", "/etc")];
    for (left, right, want) in cases {
        let l = ctx.string(left);
        let r = ctx.string(right);
        let v = ops::div(&mut ctx, l, r).unwrap();
        assert_eq!(text(&ctx, v), want, "{left:?} / {right:?}");
    }
}

#[test]
fn unsupported_pairs_name_operator_and_types() {
    let mut ctx = Context::default();
    let obj = ctx.object();
    let r = ops::add(&mut ctx, obj, Value::Int(1));
    let (kind, message) = thrown(&ctx, r);
    assert_eq!(kind, "UnsupportedOperation");
    assert!(message.contains('+'), "{message}");
    assert!(message.contains("object") && message.contains("int"), "{message}");

    let a = ctx.string("a");
    let b = ctx.string("b");
    let r = ops::sub(&mut ctx, a, b);
    assert_eq!(thrown(&ctx, r).0, "UnsupportedOperation");
    let r = ops::mul(&mut ctx, a, Value::Double(2.0));
    assert_eq!(thrown(&ctx, r).0, "UnsupportedOperation");
}

#[test]
fn comparisons_answer_one_or_zero() {
    let mut ctx = Context::default();
    assert_eq!(ops::lt(&mut ctx, Value::Int(1), Value::Int(2)).unwrap(), Value::Int(1));
    assert_eq!(ops::lt(&mut ctx, Value::Int(2), Value::Double(1.5)).unwrap(), Value::Int(0));
    assert_eq!(ops::le(&mut ctx, Value::Int(2), Value::Int(2)).unwrap(), Value::Int(1));
    assert_eq!(ops::gt(&mut ctx, Value::Double(2.5), Value::Int(2)).unwrap(), Value::Int(1));
    assert_eq!(ops::ge(&mut ctx, Value::Int(1), Value::Int(2)).unwrap(), Value::Int(0));

    let a = ctx.string("apple");
    let b = ctx.string("banana");
    assert_eq!(ops::cmp3(&mut ctx, a, b).unwrap(), Value::Int(-1));
    assert_eq!(ops::cmp3(&mut ctx, b, a).unwrap(), Value::Int(1));
    assert_eq!(ops::cmp3(&mut ctx, a, a).unwrap(), Value::Int(0));

    let big = ops::add(&mut ctx, Value::Int(i64::MAX), Value::Int(1)).unwrap();
    assert_eq!(ops::cmp3(&mut ctx, big, Value::Int(i64::MAX)).unwrap(), Value::Int(1));
    assert_eq!(ops::lt(&mut ctx, Value::Int(i64::MIN), big).unwrap(), Value::Int(1));

    let x = ctx.binary(vec![1, 2]);
    let y = ctx.binary(vec![1, 3]);
    assert_eq!(ops::lt(&mut ctx, x, y).unwrap(), Value::Int(1));
}

#[test]
fn nan_and_mixed_types_are_unordered() {
    let mut ctx = Context::default();
    assert_eq!(ops::lt(&mut ctx, Value::Double(f64::NAN), Value::Int(1)).unwrap(), Value::Int(0));
    let r = ops::cmp3(&mut ctx, Value::Double(f64::NAN), Value::Int(1));
    assert_eq!(thrown(&ctx, r).0, "UnsupportedOperation");

    let s = ctx.string("1");
    let r = ops::lt(&mut ctx, s, Value::Int(1));
    assert_eq!(thrown(&ctx, r).0, "UnsupportedOperation");
}

#[test]
fn equality_by_value_content_or_identity() {
    let mut ctx = Context::default();
    assert!(ops::equals(&ctx.heap, Value::Int(1), Value::Double(1.0)));
    assert!(ops::equals(&ctx.heap, Value::Undefined, Value::Undefined));
    assert!(!ops::equals(&ctx.heap, Value::Undefined, Value::Int(0)));

    let a = ctx.string("same");
    let b = ctx.string("same");
    assert_ne!(a, b, "distinct cells");
    assert!(ops::equals(&ctx.heap, a, b));

    let o1 = ctx.object();
    let o2 = ctx.object();
    assert!(ops::equals(&ctx.heap, o1, o1));
    assert!(!ops::equals(&ctx.heap, o1, o2));
    assert_eq!(ops::ne(&mut ctx, o1, o2).unwrap(), Value::Int(1));
    assert_eq!(ops::eq(&mut ctx, a, b).unwrap(), Value::Int(1));
}

#[test]
fn truthiness() {
    let mut ctx = Context::default();
    let empty = ctx.string("");
    let full = ctx.string("x");
    let no_bytes = ctx.binary(Vec::new());
    let obj = ctx.object();
    for falsy in [Value::Undefined, Value::Int(0), Value::Double(0.0), empty, no_bytes] {
        assert!(!ops::truthy(&ctx, falsy), "{falsy:?}");
    }
    for truthy in [Value::Int(-1), Value::Double(0.1), full, obj] {
        assert!(ops::truthy(&ctx, truthy), "{truthy:?}");
    }
}

#[test]
fn copy_duplicates_owned_payloads_and_shares_records() {
    let mut ctx = Context::default();
    let s = ctx.string("payload");
    let c = ctx.copy(s).unwrap();
    assert_ne!(s, c);
    assert_eq!(text(&ctx, c), "payload");

    let big = ops::add(&mut ctx, Value::Int(i64::MAX), Value::Int(1)).unwrap();
    let big_copy = ctx.copy(big).unwrap();
    assert_ne!(big, big_copy);
    assert!(ops::equals(&ctx.heap, big, big_copy));

    let obj = ctx.object();
    assert_eq!(ctx.copy(obj).unwrap(), obj);
    assert_eq!(ctx.copy(Value::Int(4)).unwrap(), Value::Int(4));
}
