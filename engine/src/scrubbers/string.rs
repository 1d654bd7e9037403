use crate::error::MoldResult;
use crate::transform::{Context, FieldLevel};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([a-z0-9._%+\-]+)@([a-z0-9\-]+(?:\.[a-z0-9\-]+)*\.[a-z]{2,})").expect("valid regex")
});

fn hash_string(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

fn scrubbed(label: &str, input: &str) -> String {
    format!("<<scrubbed::{}::sha256::{}>>", label, hash_string(input))
}

fn scrub_string(fl: &mut FieldLevel<'_>, f: impl FnOnce(&str) -> String) {
    if let Some(s) = fl.field().as_str() {
        let out = f(s);
        fl.set(Value::String(out));
    }
}

/// Hash the local part of each address, keeping the domain. Local parts are
/// case-folded first so the same mailbox always scrubs the same way.
pub(super) fn emails(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    scrub_string(fl, |s| {
        EMAIL
            .replace_all(s, |caps: &Captures| {
                format!("{}@{}", scrubbed("email", &caps[1].to_lowercase()), &caps[2])
            })
            .into_owned()
    });
    Ok(())
}

pub(super) fn text(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    scrub_string(fl, |s| scrubbed("text", s));
    Ok(())
}

pub(super) fn full_name(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    scrub_string(fl, |s| scrubbed("name", s));
    Ok(())
}
