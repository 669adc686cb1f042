//! Structure-preserving attribute overrides for `provider "aws"` blocks.
//!
//! The patcher parses a file with a write-preserving HCL editor, locates
//! every `provider "aws"` block, and replaces the values of the addressed
//! attributes in place. Comments, attribute order, and the whitespace of
//! untouched tokens all survive byte-for-byte. Overrides never create
//! attributes or blocks; a path that does not resolve is silently skipped.

use std::collections::HashMap;
use std::path::Path;

use hcl_edit::expr::{Array, Expression, Null, Object, ObjectKey, ObjectValue};
use hcl_edit::structure::Body;
use hcl_edit::{Decorate, Decorated};

use crate::{Error, Result};

const PROVIDER_BLOCK: &str = "provider";
const AWS_PROVIDER_LABEL: &str = "aws";

/// Override the given attributes inside every `provider "aws"` block of
/// `code`.
///
/// Keys are dot-delimited paths: the leading segments address nested,
/// label-free blocks and the final segment names the attribute. Values are
/// JSON literals (string values must be quoted). Returns the rewritten source
/// and whether anything actually changed; re-applying the same overrides is a
/// no-op.
///
/// `file_path` is only used for error context.
pub fn patch_provider_blocks(
    code: &str,
    file_path: &Path,
    overrides: &HashMap<String, String>,
) -> Result<(String, bool)> {
    if overrides.is_empty() {
        return Ok((code.to_string(), false));
    }

    let mut body: Body = code.parse().map_err(|err: hcl_edit::parser::Error| {
        Error::HclParse {
            path: file_path.to_path_buf(),
            message: err.to_string(),
        }
    })?;

    let mut updated = false;
    for block in body.get_blocks_mut(PROVIDER_BLOCK) {
        let is_aws = block.labels.len() == 1 && block.labels[0].as_str() == AWS_PROVIDER_LABEL;
        if !is_aws {
            continue;
        }

        for (key, raw_value) in overrides {
            let segments: Vec<&str> = key.split('.').collect();
            let Some((attr_name, block_path)) = segments.split_last() else {
                continue;
            };
            let Some(target) = nested_body_mut(&mut block.body, block_path) else {
                continue;
            };
            let Some(mut attr) = target.get_attribute_mut(attr_name) else {
                continue;
            };

            let mut expression = decode_override_value(raw_value)?;
            // Keep the original spacing and trailing trivia around the value
            // so only the value expression itself changes.
            *expression.decor_mut() = attr.value.decor().clone();
            if attr.value != expression {
                *attr.value_mut() = expression;
                updated = true;
            }
        }
    }

    Ok((body.to_string(), updated))
}

/// Walk `path` through nested label-free child blocks, returning the
/// addressed body. Returns `None` as soon as a segment does not resolve.
fn nested_body_mut<'a>(body: &'a mut Body, path: &[&'a str]) -> Option<&'a mut Body> {
    let Some((head, rest)) = path.split_first() else {
        return Some(body);
    };
    let block = body
        .get_blocks_mut(head)
        .find(|block| block.labels.is_empty())?;
    nested_body_mut(&mut block.body, rest)
}

/// Decode an override value: JSON infers the dynamic type, which then maps
/// onto an HCL literal expression.
fn decode_override_value(raw: &str) -> Result<Expression> {
    let json: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| Error::TypeInference {
            value: raw.to_string(),
        })?;
    expression_from_json(&json).map_err(|message| Error::MalformedJson {
        value: raw.to_string(),
        message,
    })
}

fn expression_from_json(value: &serde_json::Value) -> std::result::Result<Expression, String> {
    use serde_json::Value;

    let expression = match value {
        Value::Null => Expression::Null(Decorated::new(Null)),
        Value::Bool(b) => Expression::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Expression::from(i)
            } else if let Some(u) = n.as_u64() {
                Expression::from(u)
            } else {
                let f = n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| format!("number '{n}' has no HCL representation"))?;
                Expression::from(f)
            }
        },
        Value::String(s) => Expression::from(s.as_str()),
        Value::Array(items) => {
            let mut array = Array::new();
            for item in items {
                array.push(expression_from_json(item)?);
            }
            Expression::Array(array)
        },
        Value::Object(map) => {
            let mut object = Object::new();
            for (k, v) in map {
                let key = ObjectKey::Expression(Expression::String(Decorated::new(k.clone())));
                object.insert(key, ObjectValue::new(expression_from_json(v)?));
            }
            Expression::Object(object)
        },
    };
    Ok(expression)
}
