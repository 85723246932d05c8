//! Compact JSON rendering for `Display` and `Debug`
//!
//! Decimals always carry a decimal point so they stay distinguishable from
//! integers when printed (`1` vs `1.0`).

use std::fmt::{self, Write};

use crate::kind::ValueType;
use crate::rc::RcPolicy;
use crate::value_ref::ValueRef;

pub(crate) fn write_json<P: RcPolicy>(value: ValueRef<'_, P>, f: &mut impl Write) -> fmt::Result {
    match value.value_type() {
        ValueType::Null => f.write_str("null"),
        ValueType::Boolean => f.write_str(if value.as_bool() == Some(true) {
            "true"
        } else {
            "false"
        }),
        ValueType::Integer => write!(f, "{}", value.as_integer().unwrap_or_default()),
        ValueType::Decimal => write_decimal(value.as_decimal().unwrap_or_default(), f),
        ValueType::String => write_string(value.as_str().unwrap_or_default(), f),
        ValueType::Array => {
            f.write_char('[')?;
            for (i, child) in value.elements().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write_json(child, f)?;
            }
            f.write_char(']')
        }
        ValueType::Object => {
            f.write_char('{')?;
            for (i, (key, child)) in value.entries().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write_string(key, f)?;
                f.write_char(':')?;
                write_json(child, f)?;
            }
            f.write_char('}')
        }
    }
}

fn write_decimal(d: f64, f: &mut impl Write) -> fmt::Result {
    if !d.is_finite() {
        // JSON has no spelling for NaN or infinities
        return f.write_str("null");
    }
    let s = d.to_string();
    f.write_str(&s)?;
    if !s.contains(['.', 'e', 'E']) {
        f.write_str(".0")?;
    }
    Ok(())
}

fn write_string(s: &str, f: &mut impl Write) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\x08' => f.write_str("\\b")?,
            '\x0C' => f.write_str("\\f")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use crate::{Builder, Unsafe};

    #[test]
    fn test_display_keeps_decimal_point() {
        let mut arr = Builder::<Unsafe>::array();
        arr.push(1i64).unwrap();
        arr.push(1.0).unwrap();
        arr.push(2.5).unwrap();
        assert_eq!(arr.to_string(), "[1,1.0,2.5]");
    }

    #[test]
    fn test_display_escapes_strings() {
        let mut obj = Builder::<Unsafe>::object();
        obj.insert("quote", "say \"hi\"\n").unwrap();
        obj.insert("ctl", "\u{1}").unwrap();
        assert_eq!(
            obj.to_string(),
            r#"{"ctl":"\u0001","quote":"say \"hi\"\n"}"#
        );
    }

    #[test]
    fn test_display_finalized_matches_builder() {
        let mut obj = Builder::<Unsafe>::object();
        obj.insert("b", false).unwrap();
        obj.insert("a", Builder::null()).unwrap();
        assert_eq!(obj.finalize().to_string(), obj.to_string());
    }
}
