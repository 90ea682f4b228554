use super::*;
use crate::codec::{decode_row, encode_row};
use chrono::NaiveDate;
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn member_row_decodes_from_storage_convention() {
    let row = json!({
        "id": "m1",
        "name": "Ana",
        "email": "ana@example.org",
        "postal_code": "1000-001",
        "status": "Active",
        "role": "FoundingMember",
        "admission_date": "2021-03-04",
        "birth_date": null,
    });
    let serde_json::Value::Object(row) = row else {
        unreachable!()
    };

    let member: Member = decode_row(row).unwrap();
    assert_eq!(member.postal_code.as_deref(), Some("1000-001"));
    assert_eq!(member.role, AssociationRole::FoundingMember);
    assert_eq!(member.admission_date, date(2021, 3, 4));
    assert_eq!(member.birth_date, None);
}

#[test]
fn patch_omits_absent_fields_and_sends_explicit_nulls() {
    let patch = MemberPatch {
        phone: Some(None),
        city: Some(Some("Porto".into())),
        ..MemberPatch::default()
    };

    let row = encode_row(&patch).unwrap();
    assert_eq!(row.len(), 2);
    assert_eq!(row.get("phone"), Some(&serde_json::Value::Null));
    assert_eq!(row.get("city"), Some(&json!("Porto")));
}

#[test]
fn empty_patch_encodes_to_empty_row() {
    assert!(encode_row(&EventPatch::default()).unwrap().is_empty());
}

#[test]
fn transaction_link_columns_flatten_into_the_row() {
    let draft = TransactionDraft {
        links: LinkColumns::resolved(&LinkRef::project("p1"), "Garden"),
        ..TransactionDraft::new("Seeds", 40.0, TransactionKind::Expense, date(2024, 5, 1))
    };

    let row = encode_row(&draft).unwrap();
    assert_eq!(row.get("project_id"), Some(&json!("p1")));
    assert_eq!(row.get("project_name"), Some(&json!("Garden")));
    assert!(!row.contains_key("member_id"));
    assert!(!row.contains_key("link"));
}

#[test]
fn transaction_reads_back_its_link_and_sign() {
    let row = json!({
        "id": "t1",
        "description": "Annual fee",
        "amount": 25,
        "kind": "Income",
        "date": "2024-01-15",
        "member_id": "m1",
        "member_name": "Ana",
        "project_id": null,
    });
    let serde_json::Value::Object(row) = row else {
        unreachable!()
    };

    let tx: Transaction = decode_row(row).unwrap();
    assert_eq!(tx.link(), Some(LinkRef::member("m1")));
    assert_eq!(tx.links.display_name(), Some("Ana"));
    assert!((tx.signed_amount() - 25.0).abs() < f64::EPSILON);
}

#[test]
fn relinking_nulls_every_other_link_column() {
    let mut patch = TransactionPatch::default();
    patch.set_link_columns(LinkColumns::resolved(&LinkRef::provider("s1"), "Print Co"));

    let row = encode_row(&patch).unwrap();
    assert_eq!(row.get("provider_name"), Some(&json!("Print Co")));
    assert_eq!(row.get("member_id"), Some(&serde_json::Value::Null));
    assert_eq!(row.get("project_name"), Some(&serde_json::Value::Null));
}

#[test]
fn roles_gate_finance_and_admin() {
    assert!(Role::SuperAdmin.is_super_admin());
    assert!(Role::Finance.can_manage_finance());
    assert!(!Role::Member.can_manage_finance());
}

#[test]
fn link_kinds_name_their_id_fields() {
    let fields: Vec<_> = LinkKind::ALL.iter().map(|k| k.id_field()).collect();
    assert_eq!(fields, ["memberId", "projectId", "providerId"]);
}
