use super::*;
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid calendar date")
}

#[test]
fn json_object_converts_to_map_and_back() {
    let raw = json!({
        "full_name": "Ana Souza",
        "dues": 12,
        "balance": 12.5,
        "tags": ["board", null],
        "active": true
    });

    let value = Value::from(raw.clone());
    let map = value.as_map().expect("object becomes map");
    assert_eq!(map.get("dues"), Some(&Value::Int(12)));
    assert_eq!(map.get("balance"), Some(&Value::Float(12.5)));
    assert_eq!(
        map.get("tags"),
        Some(&Value::List(vec![Value::Text("board".into()), Value::Null]))
    );

    assert_eq!(serde_json::Value::from(value), raw);
}

#[test]
fn dates_serialize_as_iso_text() {
    let value = Value::Date(date(2024, 3, 9));
    assert_eq!(serde_json::Value::from(value), json!("2024-03-09"));
}

#[test]
fn non_finite_float_becomes_null() {
    assert_eq!(serde_json::Value::from(Value::Float(f64::NAN)), json!(null));
}

#[test]
fn text_contains_respects_mode() {
    let value = Value::from("Mariana");

    assert!(value.text_contains("ANA", TextMode::Ci));
    assert!(!value.text_contains("ANA", TextMode::Cs));
    assert!(value.text_contains("ana", TextMode::Cs));
    assert!(!Value::Null.text_contains("", TextMode::Ci));
}

#[test]
fn order_places_nulls_last() {
    let mut values = [Value::Null, Value::from("beta"), Value::from("Alpha")];
    values.sort_by(Value::order_cmp);

    assert_eq!(
        values,
        [Value::from("Alpha"), Value::from("beta"), Value::Null]
    );
}

#[test]
fn order_compares_mixed_numbers() {
    assert_eq!(Value::Int(2).order_cmp(&Value::Float(2.5)), Ordering::Less);
    assert_eq!(Value::Float(3.0).order_cmp(&Value::Int(3)), Ordering::Equal);
}

#[test]
fn optional_values_map_to_null() {
    let none: Option<&str> = None;
    assert_eq!(Value::from(none), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::from("x"));
}
