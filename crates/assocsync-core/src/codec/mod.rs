//! Key-casing codec between the storage convention (`lower_snake_case`) and
//! the application convention (`lowerCamelCase`).
//!
//! The transform is structural and schema-agnostic: every mapping key is
//! rewritten, lists map element-wise, and leaves (including dates and
//! timestamps) pass through untouched.

#[cfg(test)]
mod tests;

use crate::{error::Error, remote::Row, value::Value};
use serde::{Serialize, de::DeserializeOwned};

/// Rewrite every mapping key from storage to application convention.
#[must_use]
pub fn to_internal(value: Value) -> Value {
    rewrite_keys(value, &snake_to_camel)
}

/// Rewrite every mapping key from application to storage convention.
#[must_use]
pub fn to_external(value: Value) -> Value {
    rewrite_keys(value, &camel_to_snake)
}

fn rewrite_keys(value: Value, key_fn: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| rewrite_keys(item, key_fn))
                .collect(),
        ),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (key_fn(&k), rewrite_keys(v, key_fn)))
                .collect(),
        ),
        leaf => leaf,
    }
}

/// `_x` → `X` for every underscore followed by a lowercase ASCII letter.
#[must_use]
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_'
            && let Some(next) = chars.peek().copied()
            && next.is_ascii_lowercase()
        {
            out.push(next.to_ascii_uppercase());
            chars.next();
        } else {
            out.push(c);
        }
    }

    out
}

/// `X` → `_x` for every uppercase ASCII letter.
#[must_use]
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);

    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

// ---------------------------------------------------------------------
// Row boundary
// ---------------------------------------------------------------------

/// Serialize an application value and encode it into a storage row.
pub fn encode_row<T: Serialize>(value: &T) -> Result<Row, Error> {
    let json = serde_json::to_value(value).map_err(|err| Error::decode(err.to_string()))?;

    match serde_json::Value::from(to_external(Value::from(json))) {
        serde_json::Value::Object(row) => Ok(row),
        other => Err(Error::decode(format!(
            "expected an object payload, found {other}"
        ))),
    }
}

/// Decode a storage row into an application value.
pub fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T, Error> {
    let internal = serde_json::Value::from(to_internal(Value::Map(
        row.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
    )));

    serde_json::from_value(internal).map_err(|err| Error::decode(err.to_string()))
}

/// Decode a batch of rows, failing on the first malformed one.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, Error> {
    rows.into_iter().map(decode_row).collect()
}
