use super::*;

fn seed_tables(db: &MemDatabase) {
    db.create_table(
        "customers",
        Schema::new(vec![
            col("id", "int").primary_key(),
            col("code", "int"),
            col("bio", "text"),
        ]),
    )
    .unwrap();
    db.create_table(
        "orders",
        Schema::new(vec![
            col("id", "int").primary_key(),
            col("customer_id", "int"),
            col("backup_id", "int"),
            col("note", "text"),
            col("big_id", "bigint"),
            col("required_id", "int").not_null(),
            col("bio_ref", "varchar(20)"),
        ]),
    )
    .unwrap();
}

fn fk(columns: &[&str], parent_columns: &[&str]) -> ForeignKeyConstraint {
    ForeignKeyConstraint::new("orders", columns, "customers", parent_columns).with_database(DB)
}

fn resolve(db: &MemDatabase, def: ForeignKeyConstraint) -> fkguard_core::Result<ForeignKeyConstraint> {
    let child = db.table("orders")?;
    let parent = db.table("customers")?;
    resolve_foreign_key(&child, &parent, def, true, true, false)
}

fn index_names(db: &MemDatabase, table: &str) -> Vec<String> {
    let mut names: Vec<String> = db
        .table(table)
        .unwrap()
        .indexes()
        .unwrap()
        .iter()
        .map(|i| i.id().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_resolve_stores_key_and_creates_child_index() {
    let db = test_db();
    seed_tables(&db);

    let stored = resolve(&db, fk(&["CUSTOMER_ID"], &["ID"])).unwrap();
    assert_eq!(stored.name, "orders_ibfk_1");
    assert_eq!(stored.columns, vec!["customer_id".to_string()]);
    assert_eq!(stored.parent_columns, vec!["id".to_string()]);
    assert!(stored.is_resolved);
    assert_eq!(db.foreign_keys("orders").unwrap(), vec![stored]);
    assert_eq!(index_names(&db, "orders"), vec!["PRIMARY", "customer_id"]);
    assert_eq!(db.open_count("customers").unwrap(), 0);
}

#[test]
fn test_text_parent_column_is_rejected() {
    let db = test_db();
    seed_tables(&db);
    db.create_index("customers", IndexDef::new("bio_idx", &["bio"])).unwrap();

    let err = resolve(&db, fk(&["bio_ref"], &["bio"])).unwrap_err();
    assert!(matches!(err, FkError::TextBlob { ref column } if column == "bio"));
    assert!(db.foreign_keys("orders").unwrap().is_empty());
}

#[test]
fn test_row_check_closes_the_parent_handle_it_opens() {
    let db = test_db();
    seed_tables(&db);
    db.insert_tokens("customers", &["1", "7", "NULL"]).unwrap();
    db.insert_tokens("orders", &["1", "1", "NULL", "NULL", "NULL", "0", "NULL"]).unwrap();
    db.insert_tokens("orders", &["2", "9", "NULL", "NULL", "NULL", "0", "NULL"]).unwrap();
    let child = db.table("orders").unwrap();
    let parent = db.table("customers").unwrap();

    let err = resolve_foreign_key(&child, &parent, fk(&["customer_id"], &["id"]), true, true, true)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ChildViolation);
    assert_eq!(db.open_count("customers").unwrap(), 1);
    assert_eq!(db.close_count("customers").unwrap(), 1);

    resolve_foreign_key(&child, &parent, fk(&["backup_id"], &["id"]), true, true, true).unwrap();
    assert_eq!(db.open_count("customers").unwrap(), 2);
    assert_eq!(db.close_count("customers").unwrap(), 2);
}

#[test]
fn test_synthesized_names_count_up() {
    let db = test_db();
    seed_tables(&db);

    resolve(&db, fk(&["customer_id"], &["id"])).unwrap();
    let second = resolve(&db, fk(&["backup_id"], &["id"])).unwrap();
    assert_eq!(second.name, "orders_ibfk_2");
}

#[test]
fn test_missing_parent_index_leaves_child_untouched() {
    let db = test_db();
    seed_tables(&db);

    let err = resolve(&db, fk(&["customer_id"], &["code"])).unwrap_err();
    assert!(matches!(err, FkError::MissingReferenceIndex { ref name, ref table }
        if name == "orders_ibfk_1" && table == "customers"));
    assert_eq!(err.class(), ErrorClass::Definition);
    assert!(db.foreign_keys("orders").unwrap().is_empty());
    assert_eq!(index_names(&db, "orders"), vec!["PRIMARY"]);
}

#[test]
fn test_parent_secondary_index_is_enough() {
    let db = test_db();
    seed_tables(&db);
    db.create_index("customers", IndexDef::new("code_idx", &["code"])).unwrap();

    resolve(&db, fk(&["customer_id"], &["code"])).unwrap();
}

#[test]
fn test_existing_child_index_is_reused() {
    let db = test_db();
    seed_tables(&db);
    db.create_index("orders", IndexDef::new("by_customer", &["customer_id", "backup_id"]))
        .unwrap();

    resolve(&db, fk(&["customer_id"], &["id"])).unwrap();
    assert_eq!(index_names(&db, "orders"), vec!["PRIMARY", "by_customer"]);
}

#[test]
fn test_generated_index_name_avoids_collisions() {
    let db = test_db();
    seed_tables(&db);
    db.create_index("orders", IndexDef::new("customer_id", &["backup_id"])).unwrap();
    db.create_index("orders", IndexDef::new("customer_id_2", &["big_id"])).unwrap();

    resolve(&db, fk(&["customer_id"], &["id"])).unwrap();
    assert!(index_names(&db, "orders").contains(&"customer_id_3".to_string()));
}

#[test]
fn test_explicit_name_names_the_child_index() {
    let db = test_db();
    seed_tables(&db);

    let stored = resolve(&db, fk(&["customer_id"], &["id"]).with_name("fk_customer")).unwrap();
    assert_eq!(stored.name, "fk_customer");
    assert!(index_names(&db, "orders").contains(&"fk_customer".to_string()));
}

#[test]
fn test_explicit_name_clashing_with_an_index_is_rejected() {
    let db = test_db();
    seed_tables(&db);
    db.create_index("orders", IndexDef::new("fk_customer", &["backup_id"])).unwrap();

    let err = resolve(&db, fk(&["customer_id"], &["id"]).with_name("fk_customer")).unwrap_err();
    assert!(matches!(err, FkError::DuplicateKey { ref name } if name == "fk_customer"));
    assert!(db.foreign_keys("orders").unwrap().is_empty());
}

#[test]
fn test_duplicate_constraint_name_is_rejected() {
    let db = test_db();
    seed_tables(&db);
    resolve(&db, fk(&["customer_id"], &["id"]).with_name("fk_customer")).unwrap();

    let err = resolve(&db, fk(&["backup_id"], &["id"]).with_name("FK_CUSTOMER")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateName);
    assert_eq!(db.foreign_keys("orders").unwrap().len(), 1);
}

#[test]
fn test_definition_errors() {
    let db = test_db();
    seed_tables(&db);

    let cases: Vec<(ForeignKeyConstraint, ErrorCode)> = vec![
        (fk(&[], &[]), ErrorCode::MissingColumns),
        (fk(&["customer_id", "backup_id"], &["id"]), ErrorCode::ColumnCountMismatch),
        (fk(&["missing"], &["id"]), ErrorCode::ColumnNotFound),
        (fk(&["customer_id"], &["missing"]), ErrorCode::ColumnNotFound),
        (fk(&["customer_id", "CUSTOMER_ID"], &["id", "code"]), ErrorCode::DuplicateColumn),
        (fk(&["big_id"], &["id"]), ErrorCode::ColumnTypeMismatch),
        (fk(&["note"], &["bio"]), ErrorCode::TextBlob),
        (fk(&["bio_ref"], &["bio"]), ErrorCode::TextBlob),
        (
            fk(&["required_id"], &["id"]).with_on_delete(ReferentialAction::SetNull),
            ErrorCode::SetNullNonNullable,
        ),
    ];
    for (def, code) in cases {
        let err = resolve(&db, def.clone()).unwrap_err();
        assert_eq!(err.code(), code, "{def:?}");
        assert_eq!(err.class(), ErrorClass::Definition);
    }
    assert!(db.foreign_keys("orders").unwrap().is_empty());
}

#[test]
fn test_already_resolved_definition_is_rejected() {
    let db = test_db();
    seed_tables(&db);
    let mut def = fk(&["customer_id"], &["id"]).with_name("fk_customer");
    def.is_resolved = true;

    let err = resolve(&db, def).unwrap_err();
    assert!(matches!(err, FkError::AlreadyResolved { ref name } if name == "fk_customer"));
}

#[test]
fn test_temporary_child_is_rejected() {
    let db = test_db();
    seed_tables(&db);
    let scratch = db
        .create_temporary_table(
            "scratch",
            Schema::new(vec![col("id", "int").primary_key(), col("customer_id", "int")]),
        )
        .unwrap();
    let parent = db.table("customers").unwrap();
    let def = ForeignKeyConstraint::new("scratch", &["customer_id"], "customers", &["id"]);

    let err = resolve_foreign_key(&scratch, &parent, def, true, true, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TemporaryTable);
}

#[test]
fn test_checks_off_stores_an_unresolved_key() {
    let db = test_db();
    seed_tables(&db);
    let child = db.table("orders").unwrap();
    let parent = db.table("customers").unwrap();

    // No index on `code`, which only matters once checks are on.
    let def = fk(&["customer_id"], &["code"]).with_on_delete(ReferentialAction::Restrict);
    let stored = resolve_foreign_key(&child, &parent, def, true, false, false).unwrap();
    assert!(!stored.is_resolved);
    assert_eq!(index_names(&db, "orders"), vec!["PRIMARY", "customer_id"]);

    // Unresolved keys are not enforced.
    db.insert_tokens("customers", &["1", "7", "NULL"]).unwrap();
    db.insert_tokens("orders", &["1", "7", "NULL", "NULL", "NULL", "0", "NULL"]).unwrap();
    delete(&db, "customers", &db.rows("customers").unwrap()[0]).unwrap();
    assert_eq!(db.rows("orders").unwrap().len(), 1);
}

#[test]
fn test_deferred_key_resolves_in_place() {
    let db = test_db();
    seed_tables(&db);
    let child = db.table("orders").unwrap();
    let parent = db.table("customers").unwrap();

    let def = fk(&["customer_id"], &["id"]).with_on_delete(ReferentialAction::Cascade);
    let pending = resolve_foreign_key(&child, &parent, def, true, false, false).unwrap();
    let resolved = resolve_foreign_key(&child, &parent, pending, false, true, true).unwrap();
    assert!(resolved.is_resolved);
    assert_eq!(db.foreign_keys("orders").unwrap(), vec![resolved]);

    db.insert_tokens("customers", &["1", "7", "NULL"]).unwrap();
    db.insert_tokens("orders", &["1", "1", "NULL", "NULL", "NULL", "0", "NULL"]).unwrap();
    delete(&db, "customers", &db.rows("customers").unwrap()[0]).unwrap();
    assert!(db.rows("orders").unwrap().is_empty());
}

#[test]
fn test_updating_a_missing_key_fails() {
    let db = test_db();
    seed_tables(&db);
    let child = db.table("orders").unwrap();
    let parent = db.table("customers").unwrap();

    let def = fk(&["customer_id"], &["id"]).with_name("ghost");
    let err = resolve_foreign_key(&child, &parent, def, false, true, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ForeignKeyNotFound);
}
