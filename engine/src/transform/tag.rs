//! Tag string compiler.
//!
//! `"trim,dive,keys,lcase,endkeys,default=n/a"` compiles into a singly linked
//! chain of [`CompiledTag`] nodes. Aliases are spliced in place, parameters are
//! split off at the first `=`, and the `keys ... endkeys` segment becomes a
//! nested chain hanging off a `Keys` node.

use super::{TransformFn, Transformer};
use crate::error::{MoldError, MoldResult};
use std::fmt;

pub(crate) const DIVE_TAG: &str = "dive";
pub(crate) const KEYS_TAG: &str = "keys";
pub(crate) const END_KEYS_TAG: &str = "endkeys";
pub(crate) const IGNORE_TAG: &str = "-";

const PARAM_SEPARATOR: char = '=';
const TAG_SEPARATOR: char = ',';
const ESCAPED_COMMA: &str = "0x2C";

/// Aliases nested deeper than this are treated as a cycle.
const MAX_ALIAS_DEPTH: usize = 32;

pub(crate) enum TagKind {
    Func { name: String, func: TransformFn },
    Dive,
    /// Map key chain, terminated by an `EndKeys` node.
    Keys(Box<CompiledTag>),
    EndKeys,
}

/// One compiled step. Immutable once published to a cache.
pub(crate) struct CompiledTag {
    pub(crate) kind: TagKind,
    pub(crate) param: String,
    pub(crate) next: Option<Box<CompiledTag>>,
}

impl CompiledTag {
    fn new(kind: TagKind, param: String) -> Self {
        Self {
            kind,
            param,
            next: None,
        }
    }

    /// Iterate the chain from this node on.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &CompiledTag> {
        std::iter::successors(Some(self), |ct| ct.next.as_deref())
    }
}

impl fmt::Debug for CompiledTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for ct in self.iter() {
            match &ct.kind {
                TagKind::Func { name, .. } if ct.param.is_empty() => list.entry(name),
                TagKind::Func { name, .. } => list.entry(&format_args!("{}={}", name, ct.param)),
                TagKind::Dive => list.entry(&DIVE_TAG),
                TagKind::Keys(keys) => list.entry(&format_args!("keys{:?}", keys)),
                TagKind::EndKeys => list.entry(&END_KEYS_TAG),
            };
        }
        list.finish()
    }
}

impl Transformer {
    /// Compile `tag` for `field` (empty for ad-hoc values).
    pub(crate) fn compile_tag(&self, tag: &str, field: &str) -> MoldResult<CompiledTag> {
        let mut steps = Vec::new();
        self.compile_steps(tag, field, false, 0, &mut steps)?;
        link(steps).ok_or_else(|| MoldError::InvalidTag {
            tag: tag.to_string(),
            field: field.to_string(),
        })
    }

    fn compile_steps(
        &self,
        tag: &str,
        field: &str,
        in_keys: bool,
        depth: usize,
        out: &mut Vec<CompiledTag>,
    ) -> MoldResult<()> {
        let segments: Vec<&str> = tag.split(TAG_SEPARATOR).collect();
        let mut i = 0;

        while i < segments.len() {
            let segment = segments[i];
            i += 1;

            match segment {
                DIVE_TAG => out.push(CompiledTag::new(TagKind::Dive, String::new())),
                KEYS_TAG => {
                    if !matches!(out.last(), Some(CompiledTag { kind: TagKind::Dive, .. })) {
                        return Err(MoldError::KeysWithoutDive);
                    }

                    let start = i;
                    while i < segments.len() {
                        i += 1;
                        if segments[i - 1] == END_KEYS_TAG {
                            break;
                        }
                    }
                    let key_tag = segments[start..i].join(",");

                    let mut key_steps = Vec::new();
                    self.compile_steps(&key_tag, field, true, depth, &mut key_steps)?;
                    let keys = link(key_steps).ok_or_else(|| MoldError::InvalidTag {
                        tag: key_tag.clone(),
                        field: field.to_string(),
                    })?;
                    out.push(CompiledTag::new(TagKind::Keys(Box::new(keys)), String::new()));
                }
                END_KEYS_TAG => {
                    if !in_keys || i != segments.len() {
                        return Err(MoldError::EndKeysWithoutKeys);
                    }
                    out.push(CompiledTag::new(TagKind::EndKeys, String::new()));
                }
                _ => {
                    if let Some(expansion) = self.aliases.get(segment) {
                        if depth >= MAX_ALIAS_DEPTH {
                            return Err(MoldError::AliasCycle {
                                alias: segment.to_string(),
                            });
                        }
                        self.compile_steps(expansion, field, in_keys, depth + 1, out)?;
                        continue;
                    }

                    if segment.is_empty() {
                        return Err(MoldError::InvalidTag {
                            tag: String::new(),
                            field: field.to_string(),
                        });
                    }

                    // "=x" has an empty name and is reported as undefined.
                    let (name, param) = segment
                        .split_once(PARAM_SEPARATOR)
                        .unwrap_or((segment, ""));

                    let func = self
                        .transformations
                        .get(name)
                        .cloned()
                        .ok_or_else(|| MoldError::UndefinedTag {
                            tag: name.to_string(),
                            field: field.to_string(),
                        })?;

                    out.push(CompiledTag::new(
                        TagKind::Func {
                            name: name.to_string(),
                            func,
                        },
                        param.replace(ESCAPED_COMMA, ","),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Link a flat list of steps into a chain, back to front.
fn link(steps: Vec<CompiledTag>) -> Option<CompiledTag> {
    steps.into_iter().rev().fold(None, |next, mut ct| {
        ct.next = next.map(Box::new);
        Some(ct)
    })
}
