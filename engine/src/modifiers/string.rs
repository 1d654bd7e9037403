//! String modifiers.

use crate::error::{MoldError, MoldResult, ParseValueError};
use crate::transform::{Context, FieldLevel};
use crate::value::{Type, Value};
use once_cell::sync::Lazy;
use regex::Regex;

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid regex"));
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").expect("valid regex"));
static NON_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}]").expect("valid regex"));
static LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}").expect("valid regex"));
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{P}").expect("valid regex"));
static NOT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\s\-']").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Replace a string field with `f` of its contents. Other kinds are skipped.
fn map_string(fl: &mut FieldLevel<'_>, f: impl FnOnce(&str) -> String) {
    if let Some(s) = fl.field().as_str() {
        let out = f(s);
        fl.set(Value::String(out));
    }
}

pub(super) fn trim_space(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    map_string(fl, |s| s.trim().to_string());
    Ok(())
}

pub(super) fn trim_left(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let cutset = fl.param();
    map_string(fl, |s| {
        if cutset.is_empty() {
            s.trim_start().to_string()
        } else {
            s.trim_start_matches(|c: char| cutset.contains(c)).to_string()
        }
    });
    Ok(())
}

pub(super) fn trim_right(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let cutset = fl.param();
    map_string(fl, |s| {
        if cutset.is_empty() {
            s.trim_end().to_string()
        } else {
            s.trim_end_matches(|c: char| cutset.contains(c)).to_string()
        }
    });
    Ok(())
}

pub(super) fn trim_prefix(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let prefix = fl.param();
    map_string(fl, |s| s.strip_prefix(prefix).unwrap_or(s).to_string());
    Ok(())
}

pub(super) fn trim_suffix(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let suffix = fl.param();
    map_string(fl, |s| s.strip_suffix(suffix).unwrap_or(s).to_string());
    Ok(())
}

pub(super) fn to_lower(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    map_string(fl, str::to_lowercase);
    Ok(())
}

pub(super) fn to_upper(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    map_string(fl, str::to_uppercase);
    Ok(())
}

// =============================================================================
// Case conversion
// =============================================================================

/// Split into words on non-alphanumerics and on lower-to-upper boundaries.
fn words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in s.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        let boundary = c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_numeric());
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev = Some(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn snake(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, word) in words(s).iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            out.push_str(&upper_first(&lower));
        }
    }
    out
}

/// Upper case the first letter of every word. Anything but letters, digits
/// and `_` separates words.
fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_start = true;
    for c in s.chars() {
        if at_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => s.to_string(),
    }
}

fn clean_name(s: &str) -> String {
    let lowered = s.to_lowercase();
    let kept = NOT_NAME.replace_all(&lowered, "");
    let collapsed = WHITESPACE.replace_all(&kept, " ");
    title(collapsed.trim_matches(|c: char| !c.is_alphabetic()))
}

pub(super) fn snake_case(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    map_string(fl, snake);
    Ok(())
}

pub(super) fn camel_case(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    map_string(fl, camel);
    Ok(())
}

pub(super) fn title_case(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    map_string(fl, title);
    Ok(())
}

pub(super) fn name_case(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    map_string(fl, clean_name);
    Ok(())
}

pub(super) fn uppercase_first(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    map_string(fl, upper_first);
    Ok(())
}

// =============================================================================
// Character classes
// =============================================================================

fn strip(fl: &mut FieldLevel<'_>, re: &Regex) {
    map_string(fl, |s| re.replace_all(s, "").into_owned());
}

pub(super) fn strip_alpha(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    strip(fl, &NON_DIGIT);
    Ok(())
}

pub(super) fn strip_num(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    strip(fl, &DIGIT);
    Ok(())
}

pub(super) fn strip_num_unicode(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    strip(fl, &NON_LETTER);
    Ok(())
}

pub(super) fn strip_alpha_unicode(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    strip(fl, &LETTER);
    Ok(())
}

pub(super) fn strip_punctuation(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    strip(fl, &PUNCTUATION);
    Ok(())
}

// =============================================================================
// Length
// =============================================================================

fn parse_count(param: &str) -> MoldResult<usize> {
    param.trim().parse::<usize>().map_err(|e| {
        MoldError::ParseValue(ParseValueError::Invalid {
            ty: Type::int(),
            cause: e.to_string(),
        })
    })
}

/// `<end>` or `<start>-<end>`, counted in characters.
fn parse_range(param: &str) -> MoldResult<(usize, usize)> {
    match param.split_once('-') {
        Some((start, end)) => Ok((parse_count(start)?, parse_count(end)?)),
        None => Ok((0, parse_count(param)?)),
    }
}

pub(super) fn substr(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let (start, end) = parse_range(fl.param())?;
    map_string(fl, |s| {
        let len = s.chars().count();
        let end = end.min(len);
        if start >= end {
            return String::new();
        }
        s.chars().skip(start).take(end - start).collect()
    });
    Ok(())
}

fn padding(s: &str, len: usize) -> String {
    let missing = len.saturating_sub(s.chars().count());
    "0".repeat(missing)
}

pub(super) fn pad_left(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let len = parse_count(fl.param())?;
    map_string(fl, |s| format!("{}{}", padding(s, len), s));
    Ok(())
}

pub(super) fn pad_right(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let len = parse_count(fl.param())?;
    map_string(fl, |s| format!("{}{}", s, padding(s, len)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::new;
    use super::*;

    fn apply(tag: &str, input: &str) -> String {
        let mut v = Value::string(input);
        new().transform_field(&Context::background(), &mut v, tag).unwrap();
        v.as_str().unwrap().to_string()
    }

    #[test]
    fn test_trim() {
        assert_eq!(apply("trim", "           Dean.Karn@gmail.com            "), "Dean.Karn@gmail.com");
        assert_eq!(apply("ltrim", "  left  "), "left  ");
        assert_eq!(apply("rtrim", "  right  "), "  right");
    }

    #[test]
    fn test_trim_cutset() {
        assert_eq!(apply("ltrim=#$%_", "#$%_test"), "test");
        assert_eq!(apply("rtrim=#$%_", "test#$%_"), "test");
    }

    #[test]
    fn test_trim_prefix_suffix() {
        assert_eq!(apply("tprefix=pre-", "pre-test"), "test");
        assert_eq!(apply("tprefix=pre-", "pre-pre-test"), "pre-test");
        assert_eq!(apply("tsuffix=-suffix", "test-suffix"), "test");
    }

    #[test]
    fn test_case() {
        assert_eq!(apply("lcase", "TEST"), "test");
        assert_eq!(apply("ucase", "test"), "TEST");
        assert_eq!(apply("snake", "ThisIsSNAKEcase"), "this_is_snakecase");
        assert_eq!(apply("camel", "this_is_snakecase"), "thisIsSnakecase");
        assert_eq!(apply("title", "this is a sentence"), "This Is A Sentence");
        assert_eq!(apply("ucfirst", "this is uc first case"), "This is uc first case");
        assert_eq!(apply("ucfirst", ""), "");
    }

    #[test]
    fn test_name() {
        assert_eq!(apply("name", "3493€848Jo-$%£@Ann "), "Jo-Ann");
        assert_eq!(apply("name", " ~~ The Dude ~~"), "The Dude");
        assert_eq!(apply("name", "**susan**"), "Susan");
        assert_eq!(apply("name", " hugh fearnley-whittingstall"), "Hugh Fearnley-Whittingstall");
    }

    #[test]
    fn test_strip() {
        assert_eq!(apply("strip_alpha", "the price is €30,38"), "3038");
        assert_eq!(apply("strip_num", "39472349D34a34v69e8932747"), "Dave");
        assert_eq!(
            apply("strip_num_unicode", "!@£$%^&'()Hello 1234567890 World+[];\\"),
            "HelloWorld"
        );
        assert_eq!(
            apply("strip_alpha_unicode", "Everything's here but the letters!"),
            "'    !"
        );
        assert_eq!(apply("strip_punctuation", "# M5W-1E6!!!"), " M5W1E6");
    }

    #[test]
    fn test_substr() {
        let cases = [
            ("substr=1", "1"),
            ("substr=0-3", "123"),
            ("substr=0-2", "12"),
            ("substr=3-3", ""),
            ("substr=4-5", ""),
            ("substr=2-1", ""),
            ("substr=2-5", "3"),
        ];
        for (tag, expected) in cases {
            assert_eq!(apply(tag, "123"), expected, "{}", tag);
        }
    }

    #[test]
    fn test_substr_bad_param() {
        let mut v = Value::string("123");
        let err = new()
            .transform_field(&Context::background(), &mut v, "substr=a-2")
            .unwrap_err();
        assert!(matches!(err, MoldError::ParseValue(_)));
        assert_eq!(v, Value::string("123"));
    }

    #[test]
    fn test_pad() {
        assert_eq!(apply("lpad=5", "42"), "00042");
        assert_eq!(apply("rpad=5", "42"), "42000");
        assert_eq!(apply("lpad=2", "12345"), "12345");
    }

    #[test]
    fn test_non_strings_are_skipped() {
        let mut v = Value::int(5);
        new().transform_field(&Context::background(), &mut v, "trim,ucase").unwrap();
        assert_eq!(v, Value::int(5));
    }

    #[test]
    fn test_through_interface_and_pointer() {
        let ctx = Context::background();
        let mut v = Value::interface(Value::pointer_to(Value::interface(Value::string(" x "))));
        new().transform_field(&ctx, &mut v, "trim,ucase").unwrap();
        assert_eq!(v.deref(), &Value::string("X"));

        let mut nil = Value::interface(Value::pointer_to(Value::nil_interface()));
        new().transform_field(&ctx, &mut nil, "trim").unwrap();
        assert_eq!(nil, Value::interface(Value::pointer_to(Value::nil_interface())));
    }
}
