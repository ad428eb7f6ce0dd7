//! Value display and printf-style rendering.

use std::iter::Peekable;
use std::str::Chars;

use num_bigint::{BigInt, Sign};
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use crate::core::{Heap, Value};

/// Nesting beyond this prints as `...`; also bounds output for cyclic records.
const MAX_DISPLAY_DEPTH: usize = 16;

/// Upper bound on a directive's width and precision.
pub const MAX_FIELD_WIDTH: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("format needs at least {needed} arguments, got {given}")]
    TooFewArguments { needed: usize, given: usize },
    #[error("unknown conversion '%{0}'")]
    UnknownConversion(char),
    #[error("format string ends inside a conversion")]
    Truncated,
    #[error("'%{conv}' cannot format a value of type {found}")]
    BadArgument { conv: char, found: &'static str },
    #[error("{0} handle refers to a collected cell")]
    Stale(&'static str),
    #[error("field width or precision {found} exceeds {}", MAX_FIELD_WIDTH)]
    FieldTooWide { found: usize },
}

pub trait Appendable {
    fn append_str(&mut self, s: &str);
    fn append_i64(&mut self, i: i64);
    fn append_f64(&mut self, f: f64);
    fn append_value(&mut self, heap: &Heap, v: Value) -> Result<(), FormatError>;
}

impl Appendable for String {
    fn append_str(&mut self, s: &str) {
        self.push_str(s);
    }

    fn append_i64(&mut self, i: i64) {
        let mut buf = itoa::Buffer::new();
        self.push_str(buf.format(i));
    }

    fn append_f64(&mut self, f: f64) {
        if f.is_nan() {
            self.push_str("NaN");
        } else if f.is_infinite() {
            self.push_str(if f > 0.0 { "Infinity" } else { "-Infinity" });
        } else if f.fract() == 0.0 && f.abs() < 1e16 {
            self.append_i64(f as i64);
        } else {
            let mut buf = ryu::Buffer::new();
            self.push_str(buf.format_finite(f));
        }
    }

    fn append_value(&mut self, heap: &Heap, v: Value) -> Result<(), FormatError> {
        append_nested(self, heap, v, 0)
    }
}

/// The string form used by concatenation and `%s`.
pub fn display(heap: &Heap, v: Value) -> Result<String, FormatError> {
    let mut out = String::new();
    out.append_value(heap, v)?;
    Ok(out)
}

fn append_nested(out: &mut String, heap: &Heap, v: Value, depth: usize) -> Result<(), FormatError> {
    match v {
        Value::Undefined => out.push_str("undefined"),
        Value::Int(i) => out.append_i64(i),
        Value::Double(f) => out.append_f64(f),
        Value::BigInt(r) => {
            let big = heap.bigint(r).ok_or(FormatError::Stale("bigint"))?;
            out.push_str(&big.to_string());
        }
        Value::Str(r) => out.push_str(heap.string(r).ok_or(FormatError::Stale("string"))?),
        Value::Binary(r) => {
            let bytes = heap.bytes(r).ok_or(FormatError::Stale("binary"))?;
            out.push_str("<binary ");
            out.append_i64(bytes.len() as i64);
            out.push_str(" bytes>");
        }
        Value::Closure(r) => {
            let closure = heap.closure(r).ok_or(FormatError::Stale("closure"))?;
            out.push_str("<closure ");
            out.push_str(closure.display_name());
            out.push('>');
        }
        Value::Object(r) => {
            let record = heap.object(r).ok_or(FormatError::Stale("object"))?;
            if depth >= MAX_DISPLAY_DEPTH {
                out.push_str("...");
                return Ok(());
            }
            if record.is_formatter() {
                let template = record.template().unwrap_or_default();
                let template = heap.str_of(template).unwrap_or_default();
                let args: Vec<Value> = record.dense_values().collect();
                out.push_str(&render_nested(heap, template, &args, depth)?);
                return Ok(());
            }
            if record.map_len() == 0 {
                out.push('[');
                let mut first = true;
                for item in record.dense_values() {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    append_nested(out, heap, item, depth + 1)?;
                }
                for (index, item) in record.sparse_entries() {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    out.append_i64(index as i64);
                    out.push_str(": ");
                    append_nested(out, heap, item, depth + 1)?;
                }
                out.push(']');
            } else {
                out.push('{');
                let mut first = true;
                for (key, item) in record.entries() {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    out.push_str(key);
                    out.push_str(": ");
                    append_nested(out, heap, item, depth + 1)?;
                }
                out.push('}');
            }
        }
    }
    Ok(())
}

/// One `%` directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Directive {
    left: bool,
    plus: bool,
    space: bool,
    alternate: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conv: char,
}

/// A converted argument before padding.
struct Field {
    sign: &'static str,
    prefix: &'static str,
    body: String,
    /// Whether the `0` flag may pad between sign and digits.
    zero_pad: bool,
}

impl Field {
    fn text(body: String) -> Self {
        Self {
            sign: "",
            prefix: "",
            body,
            zero_pad: false,
        }
    }
}

/// Renders a C-style template.
///
/// Directives: `%[flags][width][.precision]conv` with flags `- + space # 0`
/// and conversions `d i u s f F e E g G x X o b c %`. Length modifiers
/// (`l`, `h`, `q`, ...) are accepted and ignored.
pub fn render(heap: &Heap, template: &str, args: &[Value]) -> Result<String, FormatError> {
    render_nested(heap, template, args, 0)
}

/// `depth` is the display nesting of the formatter being rendered; `%s`
/// arguments continue one level below it.
pub(crate) fn render_nested(
    heap: &Heap,
    template: &str,
    args: &[Value],
    depth: usize,
) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut chars = template.chars().peekable();
    let mut next_arg = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let directive = parse_directive(&mut chars)?;
        if directive.conv == '%' {
            out.push('%');
            continue;
        }
        let arg = *args.get(next_arg).ok_or(FormatError::TooFewArguments {
            needed: next_arg + 1,
            given: args.len(),
        })?;
        next_arg += 1;
        let field = convert(heap, &directive, arg, depth)?;
        pad(&mut out, &directive, &field);
    }
    Ok(out)
}

fn digits(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        n = Some(n.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
    }
    n
}

fn bounded(n: Option<usize>) -> Result<Option<usize>, FormatError> {
    match n {
        Some(found) if found > MAX_FIELD_WIDTH => Err(FormatError::FieldTooWide { found }),
        n => Ok(n),
    }
}

fn parse_directive(chars: &mut Peekable<Chars<'_>>) -> Result<Directive, FormatError> {
    let mut d = Directive::default();
    while let Some(&c) = chars.peek() {
        match c {
            '-' => d.left = true,
            '+' => d.plus = true,
            ' ' => d.space = true,
            '#' => d.alternate = true,
            '0' => d.zero = true,
            _ => break,
        }
        chars.next();
    }
    d.width = bounded(digits(chars))?;
    if chars.peek() == Some(&'.') {
        chars.next();
        d.precision = bounded(Some(digits(chars).unwrap_or(0)))?;
    }
    while matches!(chars.peek(), Some('l' | 'h' | 'q' | 'L' | 'j' | 'z' | 't')) {
        chars.next();
    }
    d.conv = chars.next().ok_or(FormatError::Truncated)?;
    Ok(d)
}

fn sign_for(d: &Directive, negative: bool) -> &'static str {
    if negative {
        "-"
    } else if d.plus {
        "+"
    } else if d.space {
        " "
    } else {
        ""
    }
}

/// Integral view of an argument; doubles truncate toward zero.
fn integer_parts(heap: &Heap, d: &Directive, arg: Value) -> Result<BigInt, FormatError> {
    match arg {
        Value::Int(i) => Ok(BigInt::from(i)),
        Value::BigInt(r) => heap.bigint(r).cloned().ok_or(FormatError::Stale("bigint")),
        Value::Double(f) if f.is_finite() => Ok(BigInt::from_f64(f.trunc()).unwrap_or_default()),
        other => Err(FormatError::BadArgument {
            conv: d.conv,
            found: other.type_name(),
        }),
    }
}

fn float_arg(heap: &Heap, d: &Directive, arg: Value) -> Result<f64, FormatError> {
    match arg {
        Value::Int(i) => Ok(i as f64),
        Value::Double(f) => Ok(f),
        Value::BigInt(r) => heap
            .bigint(r)
            .map(|b| b.to_f64().unwrap_or(f64::NAN))
            .ok_or(FormatError::Stale("bigint")),
        other => Err(FormatError::BadArgument {
            conv: d.conv,
            found: other.type_name(),
        }),
    }
}

fn convert(heap: &Heap, d: &Directive, arg: Value, depth: usize) -> Result<Field, FormatError> {
    match d.conv {
        'd' | 'i' | 'u' => {
            let n = integer_parts(heap, d, arg)?;
            let mut body = n.magnitude().to_string();
            if let Some(p) = d.precision {
                zero_extend(&mut body, p);
            }
            Ok(Field {
                sign: sign_for(d, n.sign() == Sign::Minus),
                prefix: "",
                body,
                zero_pad: d.precision.is_none(),
            })
        }
        'x' | 'X' | 'o' | 'b' => {
            let n = integer_parts(heap, d, arg)?;
            let radix = match d.conv {
                'o' => 8,
                'b' => 2,
                _ => 16,
            };
            let mut body = n.magnitude().to_str_radix(radix);
            if d.conv == 'X' {
                body.make_ascii_uppercase();
            }
            if let Some(p) = d.precision {
                zero_extend(&mut body, p);
            }
            let prefix = match (d.alternate && !n.is_zero(), d.conv) {
                (false, _) => "",
                (true, 'x') => "0x",
                (true, 'X') => "0X",
                (true, 'b') => "0b",
                (true, _) if body.starts_with('0') => "",
                (true, _) => "0",
            };
            Ok(Field {
                sign: if n.is_negative() { "-" } else { "" },
                prefix,
                body,
                zero_pad: d.precision.is_none(),
            })
        }
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
            let f = float_arg(heap, d, arg)?;
            let upper = d.conv.is_ascii_uppercase();
            let negative = f.is_sign_negative() && !f.is_nan();
            let abs = f.abs();
            let body = if !f.is_finite() {
                let word = if f.is_nan() { "nan" } else { "inf" };
                if upper { word.to_ascii_uppercase() } else { word.to_string() }
            } else {
                let precision = d.precision.unwrap_or(6);
                match d.conv {
                    'f' | 'F' => fixed(abs, precision, d.alternate),
                    'e' | 'E' => exponential(abs, precision, upper, d.alternate),
                    _ => general(abs, d.precision, upper, d.alternate),
                }
            };
            Ok(Field {
                sign: sign_for(d, negative),
                prefix: "",
                body,
                zero_pad: f.is_finite(),
            })
        }
        's' => {
            let mut body = String::new();
            append_nested(&mut body, heap, arg, depth + 1)?;
            if let Some(p) = d.precision {
                if let Some((cut, _)) = body.char_indices().nth(p) {
                    body.truncate(cut);
                }
            }
            Ok(Field::text(body))
        }
        'c' => {
            let c = match arg {
                Value::Int(i) => u32::try_from(i).ok().and_then(char::from_u32),
                Value::Str(r) => heap
                    .string(r)
                    .ok_or(FormatError::Stale("string"))?
                    .chars()
                    .next(),
                _ => None,
            };
            let c = c.ok_or(FormatError::BadArgument {
                conv: 'c',
                found: arg.type_name(),
            })?;
            Ok(Field::text(c.to_string()))
        }
        other => Err(FormatError::UnknownConversion(other)),
    }
}

fn zero_extend(body: &mut String, min_digits: usize) {
    let len = body.len();
    if len < min_digits {
        body.insert_str(0, &"0".repeat(min_digits - len));
    }
}

fn fixed(abs: f64, precision: usize, alternate: bool) -> String {
    let mut s = format!("{abs:.precision$}");
    if alternate && precision == 0 {
        s.push('.');
    }
    s
}

/// `d.ddde±XX`, with at least two exponent digits.
fn exponential(abs: f64, precision: usize, upper: bool, alternate: bool) -> String {
    let raw = format!("{abs:.precision$e}");
    let (mantissa, exp) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let mut out = String::with_capacity(mantissa.len() + 5);
    out.push_str(mantissa);
    if alternate && !mantissa.contains('.') {
        out.push('.');
    }
    out.push(if upper { 'E' } else { 'e' });
    out.push(if exp < 0 { '-' } else { '+' });
    let magnitude = exp.unsigned_abs();
    if magnitude < 10 {
        out.push('0');
    }
    out.push_str(itoa::Buffer::new().format(magnitude));
    out
}

fn decimal_exponent(abs: f64, precision: usize) -> i32 {
    if abs == 0.0 {
        return 0;
    }
    let raw = format!("{abs:.precision$e}");
    raw.split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0)
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn general(abs: f64, precision: Option<usize>, upper: bool, alternate: bool) -> String {
    let p = match precision {
        Some(0) => 1,
        Some(p) => p,
        None => 6,
    };
    let x = decimal_exponent(abs, p - 1);
    if x >= -4 && x < p as i32 {
        let s = fixed(abs, (p as i32 - 1 - x) as usize, alternate);
        if alternate { s } else { strip_fraction_zeros(&s).to_string() }
    } else {
        let s = exponential(abs, p - 1, upper, alternate);
        if alternate {
            return s;
        }
        let split = s.find(['e', 'E']).unwrap_or(s.len());
        let (mantissa, exp) = s.split_at(split);
        let mut out = strip_fraction_zeros(mantissa).to_string();
        out.push_str(exp);
        out
    }
}

fn pad(out: &mut String, d: &Directive, field: &Field) {
    let len = field.sign.len() + field.prefix.len() + field.body.chars().count();
    let fill = d.width.unwrap_or(0).saturating_sub(len);
    if d.left {
        out.push_str(field.sign);
        out.push_str(field.prefix);
        out.push_str(&field.body);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if d.zero && field.zero_pad {
        out.push_str(field.sign);
        out.push_str(field.prefix);
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(&field.body);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(field.sign);
        out.push_str(field.prefix);
        out.push_str(&field.body);
    }
}
