use kiln_runtime::format::render;
use kiln_runtime::{Context, FormatError, Signal, Value, ops};

fn fmt(ctx: &Context, template: &str, args: &[Value]) -> String {
    render(&ctx.heap, template, args).expect("renders")
}

#[test]
fn integer_conversions() {
    let ctx = Context::default();
    let n = Value::Int(42);
    assert_eq!(fmt(&ctx, "%5d|%-5d|%+d", &[n, n, n]), "   42|42   |+42");
    assert_eq!(fmt(&ctx, "% d", &[Value::Int(7)]), " 7");
    assert_eq!(fmt(&ctx, "%.3d|%05.3d|%05d", &[Value::Int(7), Value::Int(7), Value::Int(-7)]), "007|  007|-0007");
    assert_eq!(fmt(&ctx, "%ld %lld %i", &[Value::Int(1), Value::Int(2), Value::Int(3)]), "1 2 3");
}

#[test]
fn radix_conversions() {
    let ctx = Context::default();
    let args = [255, 255, 255, 8, 8, 5].map(Value::Int);
    assert_eq!(fmt(&ctx, "%x %X %#x %o %#o %b", &args), "ff FF 0xff 10 010 101");
    assert_eq!(fmt(&ctx, "%#x", &[Value::Int(0)]), "0");
    assert_eq!(fmt(&ctx, "%08x", &[Value::Int(0xbeef)]), "0000beef");
}

#[test]
fn float_conversions() {
    let ctx = Context::default();
    assert_eq!(fmt(&ctx, "%.2f", &[Value::Double(3.14159)]), "3.14");
    assert_eq!(fmt(&ctx, "%08.3f", &[Value::Double(-3.14159)]), "-003.142");
    assert_eq!(fmt(&ctx, "%f", &[Value::Int(2)]), "2.000000");
    assert_eq!(fmt(&ctx, "%.3e", &[Value::Double(12345.678)]), "1.235e+04");
    assert_eq!(fmt(&ctx, "%E", &[Value::Double(0.00012)]), "1.200000E-04");
    assert_eq!(fmt(&ctx, "%g", &[Value::Double(0.0001)]), "0.0001");
    assert_eq!(fmt(&ctx, "%g", &[Value::Double(1234567.0)]), "1.23457e+06");
    assert_eq!(fmt(&ctx, "%g", &[Value::Double(100.0)]), "100");
    assert_eq!(fmt(&ctx, "%G", &[Value::Double(1e-10)]), "1E-10");
    assert_eq!(fmt(&ctx, "%f|%F", &[Value::Double(f64::NAN), Value::Double(f64::INFINITY)]), "nan|INF");
}

#[test]
fn text_conversions() {
    let mut ctx = Context::default();
    let hello = ctx.string("hello");
    let c = ctx.string("zeta");
    assert_eq!(
        fmt(&ctx, "%s|%.2s|%c|%c|%%|%-7s|", &[hello, hello, Value::Int(65), c, hello]),
        "hello|he|A|z|%|hello  |"
    );
    let big = ops::add(&mut ctx, Value::Int(i64::MAX), Value::Int(1)).unwrap();
    assert_eq!(fmt(&ctx, "%d", &[big]), "9223372036854775808");
}

#[test]
fn render_errors() {
    let ctx = Context::default();
    assert_eq!(
        render(&ctx.heap, "%d %d", &[Value::Int(1)]),
        Err(FormatError::TooFewArguments { needed: 2, given: 1 })
    );
    assert_eq!(render(&ctx.heap, "%y", &[Value::Int(1)]), Err(FormatError::UnknownConversion('y')));
    assert_eq!(render(&ctx.heap, "100%", &[]), Err(FormatError::Truncated));
    assert!(matches!(
        render(&ctx.heap, "%d", &[Value::Undefined]),
        Err(FormatError::BadArgument { conv: 'd', .. })
    ));
}

#[test]
fn percent_builds_formatter_records() {
    let mut ctx = Context::default();
    let template = ctx.string("%s=%05.1f");
    let partial = ops::rem(&mut ctx, template, Value::Undefined).unwrap();
    let key = ctx.string("x");
    let first = ops::rem(&mut ctx, template, key).unwrap();
    let full = ops::rem(&mut ctx, first, Value::Double(3.14159)).unwrap();
    assert_eq!(ctx.display(full).unwrap(), "x=003.1");

    // Appending builds a new record; the shorter one still lacks an argument.
    let r = ctx.display(first);
    let Err(Signal::Exception(e)) = r else {
        panic!("expected TooFewArguments, got {r:?}");
    };
    assert_eq!(ctx.exception_kind(e), Some("TooFewArguments"));
    assert!(ctx.display(partial).is_err());
}

#[test]
fn formatters_render_when_concatenated() {
    let mut ctx = Context::default();
    let template = ctx.string("%d items");
    let f = ops::rem(&mut ctx, template, Value::Int(3)).unwrap();
    let prefix = ctx.string("have: ");
    let joined = ops::add(&mut ctx, prefix, f).unwrap();
    assert_eq!(ctx.heap.str_of(joined), Some("have: 3 items"));
}

#[test]
fn display_forms() {
    let mut ctx = Context::default();
    assert_eq!(ctx.display(Value::Double(2.0)).unwrap(), "2");
    assert_eq!(ctx.display(Value::Double(0.1)).unwrap(), "0.1");
    assert_eq!(ctx.display(Value::Double(f64::NAN)).unwrap(), "NaN");
    assert_eq!(ctx.display(Value::Double(f64::NEG_INFINITY)).unwrap(), "-Infinity");

    let a = ctx.string("a");
    let arr = ctx.array(&[Value::Int(1), a, Value::Double(2.5)]);
    assert_eq!(ctx.display(arr).unwrap(), "[1, a, 2.5]");

    let obj = ctx.object();
    ctx.obj_set(obj, "k", Value::Int(1)).unwrap();
    assert_eq!(ctx.display(obj).unwrap(), "{k: 1}");

    let bin = ctx.binary(vec![0; 4]);
    assert_eq!(ctx.display(bin).unwrap(), "<binary 4 bytes>");
}

#[test]
fn cyclic_records_display_finitely() {
    let mut ctx = Context::default();
    let arr = ctx.array(&[]);
    ctx.push(arr, arr).unwrap();
    let shown = ctx.display(arr).unwrap();
    assert!(shown.starts_with("[[") && shown.contains("..."), "{shown}");
}

#[test]
fn cycles_through_formatters_display_finitely() {
    let mut ctx = Context::default();
    let arr = ctx.array(&[]);
    ctx.push_var(arr).unwrap();
    let template = ctx.string("%s");
    let f = ops::rem(&mut ctx, template, arr).unwrap();
    ctx.push(arr, f).unwrap();
    let shown = ctx.display(arr).unwrap();
    assert!(shown.starts_with("[[[") && shown.contains("..."), "{shown}");
}

#[test]
fn oversized_fields_are_rejected() {
    let ctx = Context::default();
    let one = [Value::Int(1)];
    assert_eq!(
        render(&ctx.heap, "%.99999999999999999999d", &one),
        Err(FormatError::FieldTooWide { found: usize::MAX })
    );
    assert_eq!(
        render(&ctx.heap, "%99999999f", &one),
        Err(FormatError::FieldTooWide { found: 99_999_999 })
    );
    assert_eq!(render(&ctx.heap, "%65536d", &one).map(|s| s.len()), Ok(65536));
}

#[test]
fn oversized_fields_throw_out_of_range() {
    let mut ctx = Context::default();
    let template = ctx.string("%.1000000000s");
    let f = ops::rem(&mut ctx, template, Value::Int(1)).unwrap();
    let Err(Signal::Exception(e)) = ctx.display(f) else {
        panic!("expected OutOfRange");
    };
    assert_eq!(ctx.exception_kind(e), Some("OutOfRange"));
}
