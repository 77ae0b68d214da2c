use fkguard_core::DepthLimitMode;
use fkguard_core::storage::TableResolver;

use super::*;

#[test]
fn test_config_reads_partial_json() {
    let config = ForeignKeyConfig::from_json_str(r#"{"depth_limit_mode": "strict"}"#).unwrap();
    assert!(config.foreign_key_checks);
    assert_eq!(config.depth_limit_mode, DepthLimitMode::Strict);

    let config = ForeignKeyConfig::from_json_str("{}").unwrap();
    assert_eq!(config, ForeignKeyConfig::default());

    let raw = ForeignKeyConfig::without_checks().to_json_string().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["foreign_key_checks"], serde_json::json!(false));
    assert_eq!(value["depth_limit_mode"], serde_json::json!("mysql_compatible"));
}

#[test]
fn test_config_rejects_unknown_mode() {
    let err = ForeignKeyConfig::from_json_str(r#"{"depth_limit_mode": "lenient"}"#).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Config);
    assert_eq!(err.code_str(), "config");
}

#[test]
fn test_checks_off_skips_restrict_and_cascade() -> anyhow::Result<()> {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Cascade);
    db.insert_tokens("customers", &["1", "ann"])?;
    db.insert_tokens("orders", &["10", "1"])?;

    let editor = build_foreign_key_editor(&db, DB, "customers", &ForeignKeyConfig::without_checks())?;
    assert_eq!(editor.len(), 1);
    editor.update(
        &vec![Value::Int(1), Value::text("ann")],
        &vec![Value::Int(2), Value::text("ann")],
    )?;
    editor.delete(&vec![Value::Int(2), Value::text("ann")])?;
    editor.close()?;

    assert!(db.rows("customers")?.is_empty());
    assert_eq!(db.rows("orders")?, vec![ints(&[10, 1])]);
    Ok(())
}

#[test]
fn test_checks_off_accepts_orphan_inserts() -> anyhow::Result<()> {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Restrict);

    let editor = build_foreign_key_editor(&db, DB, "orders", &ForeignKeyConfig::without_checks())?;
    editor.check_insert(&ints(&[1, 99]))?;
    editor.close()?;
    assert_eq!(db.reference_check_count("customers")?, 0);
    Ok(())
}

#[test]
fn test_keys_into_another_database_need_a_resolver_that_knows_it() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Restrict);
    let child = db.table("orders").unwrap();
    let parent = db.table("customers").unwrap();
    let def = ForeignKeyConstraint::new("orders", &["id"], "customers", &["id"])
        .with_database(DB)
        .with_parent_database("archive");
    resolve_foreign_key(&child, &parent, def, true, true, false).unwrap();

    let err = build_foreign_key_editor(&db, DB, "orders", &ForeignKeyConfig::default()).unwrap_err();
    assert!(matches!(err, FkError::TableNotFound { ref table } if table == "archive.customers"));
    assert_eq!(err.class(), ErrorClass::Storage);
    assert!(db.resolve_table("ARCHIVE", "customers").is_err());
    assert!(db.resolve_table("MYDB", "customers").is_ok());
}

#[test]
fn test_strict_preset_only_changes_depth_mode() {
    let strict = ForeignKeyConfig::strict();
    assert!(strict.foreign_key_checks);
    assert_eq!(strict.depth_limit_mode, DepthLimitMode::Strict);
    assert!(!DepthLimitMode::Strict.exceeded(15, true));
    assert!(DepthLimitMode::MysqlCompatible.exceeded(15, true));
}

#[test]
fn test_unknown_root_table_fails_to_build() {
    let db = test_db();
    let err = build_foreign_key_editor(&db, DB, "nowhere", &ForeignKeyConfig::default()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TableNotFound);
}
