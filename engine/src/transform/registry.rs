//! Registration of functions, aliases, struct-level hooks and interceptors.
//!
//! Registration takes `&mut self` and is expected to finish before the
//! transformer is shared. Misuse (empty or restricted names) is a programming
//! error and panics immediately.

use super::tag::{DIVE_TAG, END_KEYS_TAG, IGNORE_TAG, KEYS_TAG};
use super::{Context, FieldLevel, StructLevel, Transformer};
use crate::error::MoldResult;
use crate::value::{StructType, Type, Value};
use std::sync::Arc;

/// Characters that may not appear in a function or alias name.
pub const RESTRICTED_TAG_CHARS: &str = ".[],|=+()`~!@#$%^&*\\\"/?<>{}";

/// Names with a fixed meaning in tag strings.
pub const RESTRICTED_TAGS: [&str; 4] = [DIVE_TAG, IGNORE_TAG, KEYS_TAG, END_KEYS_TAG];

fn is_restricted(name: &str) -> bool {
    RESTRICTED_TAGS.contains(&name) || name.contains(|c: char| RESTRICTED_TAG_CHARS.contains(c))
}

impl Transformer {
    /// Register `func` under `tag`, replacing any previous function.
    ///
    /// # Panics
    ///
    /// If `tag` is empty, reserved, or contains a restricted character.
    pub fn register<F>(&mut self, tag: &str, func: F)
    where
        F: Fn(&Context, &mut FieldLevel<'_>) -> MoldResult<()> + Send + Sync + 'static,
    {
        if tag.is_empty() {
            panic!("Function Key cannot be empty");
        }
        if is_restricted(tag) {
            panic!(
                "Tag '{}' either contains restricted characters or is the same as a restricted tag needed for normal operation",
                tag
            );
        }

        self.transformations.insert(tag.to_string(), Arc::new(func));
        self.clear_caches();
    }

    /// Register `alias` as shorthand for the tag string `tags`.
    ///
    /// # Panics
    ///
    /// If either is empty, or `alias` is reserved or contains a restricted
    /// character.
    pub fn register_alias(&mut self, alias: &str, tags: &str) {
        if alias.is_empty() {
            panic!("Alias cannot be empty");
        }
        if tags.is_empty() {
            panic!("Aliased tags cannot be empty");
        }
        if is_restricted(alias) {
            panic!(
                "Alias '{}' either contains restricted characters or is the same as a restricted tag needed for normal operation",
                alias
            );
        }

        self.aliases.insert(alias.to_string(), tags.to_string());
        self.clear_caches();
    }

    /// Run `func` against every struct of the given types before its fields
    /// are transformed. Useful for types whose definition cannot carry tags.
    pub fn register_struct_level<F, I>(&mut self, func: F, types: I)
    where
        F: Fn(&Context, &mut StructLevel<'_>) -> MoldResult<()> + Send + Sync + 'static,
        I: IntoIterator<Item = Arc<StructType>>,
    {
        let func: super::StructLevelFn = Arc::new(func);
        for ty in types {
            self.struct_level_fns.insert(Type::Struct(ty), Arc::clone(&func));
        }
        self.clear_caches();
    }

    /// Redirect functions applied to values of the given types to the inner
    /// value `func` returns, e.g. the string inside a nullable-string wrapper.
    pub fn register_interceptor<F, I>(&mut self, func: F, types: I)
    where
        F: Fn(&mut Value) -> &mut Value + Send + Sync + 'static,
        I: IntoIterator<Item = Type>,
    {
        let func: super::InterceptorFn = Arc::new(func);
        for ty in types {
            self.interceptors.insert(ty, Arc::clone(&func));
        }
        self.clear_caches();
    }

    /// Registered function names, sorted.
    pub fn registered_tags(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transformations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered aliases with their expansions, sorted by alias.
    pub fn registered_aliases(&self) -> Vec<(&str, &str)> {
        let mut aliases: Vec<(&str, &str)> = self
            .aliases
            .iter()
            .map(|(alias, tags)| (alias.as_str(), tags.as_str()))
            .collect();
        aliases.sort_unstable();
        aliases
    }

    /// Compile and cache the shape of `ty` ahead of first use.
    ///
    /// Returns the first tag error found, so a bad tag can be caught at
    /// startup rather than on the first request.
    pub fn prepare(&self, ty: &Arc<StructType>) -> MoldResult<()> {
        self.shape_for(ty).map(|_| ())
    }
}
