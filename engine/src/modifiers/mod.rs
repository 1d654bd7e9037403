//! Ready-made modifiers for normalizing user input.
//!
//! [`new`] returns a [`Transformer`] reading the `mod` tag with every function
//! below registered:
//!
//! | Tag | Effect |
//! |-----|--------|
//! | `trim` | Remove leading and trailing whitespace |
//! | `ltrim=<cutset>` / `rtrim=<cutset>` | Trim the cutset (whitespace when empty) from one side |
//! | `tprefix=<p>` / `tsuffix=<s>` | Remove a prefix or suffix once |
//! | `lcase` / `ucase` | Lower or upper case |
//! | `snake` / `camel` | `snake_case` / `camelCase` |
//! | `title` | Upper case the first letter of every word |
//! | `name` | Clean up a person's name: letters, spaces, `-` and `'`, title cased |
//! | `ucfirst` | Upper case the first letter |
//! | `strip_alpha` | Keep ASCII digits only |
//! | `strip_num` | Remove ASCII digits |
//! | `strip_num_unicode` | Keep letters only |
//! | `strip_alpha_unicode` | Remove letters |
//! | `strip_punctuation` | Remove punctuation |
//! | `substr=<end>` / `substr=<start>-<end>` | Character range, clamped |
//! | `lpad=<len>` / `rpad=<len>` | Pad with `0` to a length |
//! | `default=<v>` | Assign `v` when the field is zero |
//! | `set=<v>` | Assign `v` |
//! | `empty` | Reset to the zero value |
//!
//! String functions leave fields of other types alone.

mod multi;
mod string;

use crate::transform::Transformer;

/// Tag key read by the modifier set.
pub const TAG_NAME: &str = "mod";

/// A transformer with every modifier registered.
pub fn new() -> Transformer {
    let mut t = Transformer::with_tag_name(TAG_NAME);

    t.register("trim", string::trim_space);
    t.register("ltrim", string::trim_left);
    t.register("rtrim", string::trim_right);
    t.register("tprefix", string::trim_prefix);
    t.register("tsuffix", string::trim_suffix);
    t.register("lcase", string::to_lower);
    t.register("ucase", string::to_upper);
    t.register("snake", string::snake_case);
    t.register("camel", string::camel_case);
    t.register("title", string::title_case);
    t.register("name", string::name_case);
    t.register("ucfirst", string::uppercase_first);
    t.register("strip_alpha", string::strip_alpha);
    t.register("strip_num", string::strip_num);
    t.register("strip_num_unicode", string::strip_num_unicode);
    t.register("strip_alpha_unicode", string::strip_alpha_unicode);
    t.register("strip_punctuation", string::strip_punctuation);
    t.register("substr", string::substr);
    t.register("lpad", string::pad_left);
    t.register("rpad", string::pad_right);

    t.register("default", multi::default_value);
    t.register("set", multi::set_value);
    t.register("empty", multi::empty);

    t
}
