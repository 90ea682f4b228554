use super::*;
use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use serde::Deserialize;
use serde_json::json;

// ---- helpers -----------------------------------------------------------

fn map(entries: &[(&str, Value)]) -> Value {
    Value::Map(
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect(),
    )
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9..1.0e9f64).prop_map(Value::Float),
        "[a-zA-Z_ ]{0,12}".prop_map(Value::Text),
        (0i64..40_000).prop_map(|days| {
            let base = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch");
            Value::Date(base + chrono::Duration::days(days))
        }),
        (0i64..4_000_000_000).prop_map(|secs| {
            Value::Timestamp(Utc.timestamp_opt(secs, 0).single().expect("in range"))
        }),
    ]
}

fn tree(keys: &'static str) -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 48, 6, move |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::List),
            prop::collection::btree_map(keys, inner, 0..5).prop_map(Value::Map),
        ]
    })
}

const SNAKE_KEY: &str = "[a-z][a-z0-9]{0,5}(_[a-z][a-z0-9]{0,5}){0,3}";
const CAMEL_KEY: &str = "[a-z][a-z0-9]{0,5}([A-Z][a-z0-9]{0,5}){0,3}";

// ---- key transform -----------------------------------------------------

#[test]
fn snake_keys_become_camel() {
    assert_eq!(snake_to_camel("admission_date"), "admissionDate");
    assert_eq!(snake_to_camel("member_id"), "memberId");
    assert_eq!(snake_to_camel("id"), "id");
}

#[test]
fn camel_keys_become_snake() {
    assert_eq!(camel_to_snake("admissionDate"), "admission_date");
    assert_eq!(camel_to_snake("avatarUrl"), "avatar_url");
    assert_eq!(camel_to_snake("id"), "id");
}

#[test]
fn underscores_without_lowercase_follower_are_kept() {
    assert_eq!(snake_to_camel("line_2"), "line_2");
    assert_eq!(snake_to_camel("trailing_"), "trailing_");
    assert_eq!(snake_to_camel("_private"), "Private");
}

// ---- structural walk ---------------------------------------------------

#[test]
fn nested_maps_and_lists_are_rewritten() {
    let external = map(&[
        ("member_name", Value::from("Ana")),
        (
            "linked_rows",
            Value::List(vec![map(&[("row_id", Value::Int(1))])]),
        ),
    ]);

    let internal = to_internal(external);

    assert_eq!(
        internal,
        map(&[
            ("memberName", Value::from("Ana")),
            (
                "linkedRows",
                Value::List(vec![map(&[("rowId", Value::Int(1))])]),
            ),
        ])
    );
}

#[test]
fn leaves_are_never_rewritten() {
    let day = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
    let external = map(&[
        ("due_date", Value::Date(day)),
        ("note", Value::from("keep_this_text")),
        ("empty", Value::Null),
    ]);

    let internal = to_internal(external);
    let fields = internal.as_map().expect("still a map");

    assert_eq!(fields.get("dueDate"), Some(&Value::Date(day)));
    assert_eq!(fields.get("note"), Some(&Value::from("keep_this_text")));
    assert_eq!(fields.get("empty"), Some(&Value::Null));
}

#[test]
fn scalars_pass_through() {
    assert_eq!(to_external(Value::Int(7)), Value::Int(7));
    assert_eq!(to_internal(Value::Null), Value::Null);
    assert_eq!(
        to_internal(Value::List(vec![Value::from("a_b")])),
        Value::List(vec![Value::from("a_b")])
    );
}

proptest! {
    #[test]
    fn external_round_trip_is_identity(value in tree(SNAKE_KEY)) {
        prop_assert_eq!(to_external(to_internal(value.clone())), value);
    }

    #[test]
    fn internal_round_trip_is_identity(value in tree(CAMEL_KEY)) {
        prop_assert_eq!(to_internal(to_external(value.clone())), value);
    }

    #[test]
    fn transform_is_deterministic(value in tree(SNAKE_KEY)) {
        prop_assert_eq!(to_internal(value.clone()), to_internal(value));
    }
}

// ---- row boundary ------------------------------------------------------

#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Sample {
    full_name: String,
    admission_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
}

#[test]
fn encode_row_uses_storage_keys_and_skips_absent_fields() {
    let sample = Sample {
        full_name: "Ana".into(),
        admission_date: NaiveDate::from_ymd_opt(2023, 1, 15).expect("valid date"),
        avatar_url: None,
    };

    let row = encode_row(&sample).expect("encodes");

    assert_eq!(row.get("full_name"), Some(&json!("Ana")));
    assert_eq!(row.get("admission_date"), Some(&json!("2023-01-15")));
    assert!(!row.contains_key("avatar_url"));
}

#[test]
fn decode_row_reads_storage_keys() {
    let row = json!({
        "full_name": "Ana",
        "admission_date": "2023-01-15",
        "avatar_url": "https://cdn/a.png"
    });
    let serde_json::Value::Object(row) = row else {
        panic!("object literal");
    };

    let sample: Sample = decode_row(row).expect("decodes");
    assert_eq!(sample.avatar_url.as_deref(), Some("https://cdn/a.png"));
}

#[test]
fn encode_row_rejects_non_object_payloads() {
    let err = encode_row(&vec![1, 2, 3]).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn decode_row_reports_shape_mismatch() {
    let mut row = Row::new();
    row.insert("full_name".into(), json!(42));

    let err = decode_row::<Sample>(row).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}
