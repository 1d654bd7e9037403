//! Scrubbers that de-identify personal data before it is logged or stored.
//!
//! [`new`] returns a [`Transformer`] reading the `scrub` tag:
//!
//! - `emails` - replace the local part of every e-mail address with a hash
//! - `text` - replace the whole string with a hash
//! - `name` - same as `text`, labelled as a name
//!
//! Hashes are SHA-256 in lower-case hex, e.g.
//! `<<scrubbed::email::sha256::f186...38c8>>@gmail.com`.

mod string;

use crate::transform::Transformer;

/// Tag key read by the scrubber set.
pub const TAG_NAME: &str = "scrub";

/// A transformer with every scrubber registered.
pub fn new() -> Transformer {
    let mut t = Transformer::with_tag_name(TAG_NAME);
    t.register("emails", string::emails);
    t.register("text", string::text);
    t.register("name", string::full_name);
    t
}
