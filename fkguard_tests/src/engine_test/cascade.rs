use super::*;

#[test]
fn test_delete_cascade_removes_child_rows() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Cascade, ReferentialAction::Restrict);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();
    db.insert("orders", ints(&[1, 1])).unwrap();

    delete(&db, "customers", &vec![Value::Int(1), Value::text("ann")]).unwrap();

    assert!(db.rows("customers").unwrap().is_empty());
    assert!(db.rows("orders").unwrap().is_empty());
}

#[test]
fn test_delete_restrict_blocks_and_keeps_both_rows() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Restrict);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();
    db.insert("orders", ints(&[1, 1])).unwrap();

    let err = delete(&db, "customers", &vec![Value::Int(1), Value::text("ann")]).unwrap_err();

    assert_eq!(err.code(), ErrorCode::ParentViolation);
    assert_eq!(err.class(), ErrorClass::Integrity);
    assert!(err.to_string().contains("orders_ibfk_1"));
    assert!(err.to_string().contains("[1]"));
    assert_eq!(db.rows("customers").unwrap().len(), 1);
    assert_eq!(db.rows("orders").unwrap(), vec![ints(&[1, 1])]);
}

#[test]
fn test_no_action_behaves_like_restrict() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::NoAction, ReferentialAction::NoAction);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();
    db.insert("orders", ints(&[1, 1])).unwrap();

    let err = delete(&db, "customers", &vec![Value::Int(1), Value::text("ann")]).unwrap_err();
    assert!(matches!(err, FkError::ParentViolation { .. }));
}

#[test]
fn test_delete_unreferenced_parent_succeeds_under_restrict() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Restrict);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();
    db.insert_tokens("customers", &["2", "bob"]).unwrap();
    db.insert("orders", ints(&[1, 1])).unwrap();

    delete(&db, "customers", &vec![Value::Int(2), Value::text("bob")]).unwrap();
    assert_eq!(db.rows("customers").unwrap().len(), 1);
}

#[test]
fn test_delete_set_null_clears_only_mapped_columns() {
    let db = test_db();
    db.create_table(
        "teams",
        Schema::new(vec![col("id", "int").primary_key(), col("code", "varchar(8)")]),
    )
    .unwrap();
    db.create_table(
        "players",
        Schema::new(vec![
            col("id", "int").primary_key(),
            col("team_id", "int"),
            col("team_code", "varchar(8)"),
            col("score", "int"),
        ]),
    )
    .unwrap();
    db.create_index("teams", IndexDef::new("id_code", &["id", "code"]).unique())
        .unwrap();
    add_fk(
        &db,
        ForeignKeyConstraint::new("players", &["team_id", "team_code"], "teams", &["id", "code"])
            .with_on_delete(ReferentialAction::SetNull),
    )
    .unwrap();
    db.insert_tokens("teams", &["1", "red"]).unwrap();
    db.insert_tokens("players", &["10", "1", "red", "7"]).unwrap();
    db.insert_tokens("players", &["11", "1", "red", "9"]).unwrap();

    delete(&db, "teams", &vec![Value::Int(1), Value::text("red")]).unwrap();

    assert_eq!(
        db.rows("players").unwrap(),
        vec![
            vec![Value::Int(10), Value::Null, Value::Null, Value::Int(7)],
            vec![Value::Int(11), Value::Null, Value::Null, Value::Int(9)],
        ]
    );
}

#[test]
fn test_delete_set_default_writes_column_defaults() {
    let db = test_db();
    db.create_table("tiers", Schema::new(vec![col("id", "int").primary_key()]))
        .unwrap();
    db.create_table(
        "accounts",
        Schema::new(vec![
            col("id", "int").primary_key(),
            col("tier", "int").with_default("0"),
            col("backup_tier", "int"),
        ]),
    )
    .unwrap();
    add_fk(
        &db,
        ForeignKeyConstraint::new("accounts", &["tier"], "tiers", &["id"])
            .with_on_delete(ReferentialAction::SetDefault),
    )
    .unwrap();
    add_fk(
        &db,
        ForeignKeyConstraint::new("accounts", &["backup_tier"], "tiers", &["id"])
            .with_on_delete(ReferentialAction::SetDefault),
    )
    .unwrap();
    db.insert("tiers", ints(&[0])).unwrap();
    db.insert("tiers", ints(&[3])).unwrap();
    db.insert("accounts", ints(&[1, 3, 3])).unwrap();

    delete(&db, "tiers", &ints(&[3])).unwrap();

    assert_eq!(
        db.rows("accounts").unwrap(),
        vec![vec![Value::Int(1), Value::Int(0), Value::Null]]
    );
}

#[test]
fn test_update_cascade_rewrites_mapped_columns_only() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Cascade);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();
    db.insert("orders", ints(&[100, 1])).unwrap();
    db.insert("orders", ints(&[101, 1])).unwrap();

    update(
        &db,
        "customers",
        &vec![Value::Int(1), Value::text("ann")],
        &vec![Value::Int(5), Value::text("ann")],
    )
    .unwrap();

    assert_eq!(db.rows("customers").unwrap(), vec![vec![Value::Int(5), Value::text("ann")]]);
    assert_eq!(db.rows("orders").unwrap(), vec![ints(&[100, 5]), ints(&[101, 5])]);
}

#[test]
fn test_update_cascade_pads_into_a_fixed_width_child() {
    let db = test_db();
    db.create_table("parents", Schema::new(vec![col("id", "varbinary(4)").primary_key()]))
        .unwrap();
    db.create_table(
        "children",
        Schema::new(vec![col("id", "int").primary_key(), col("parent_ref", "binary(4)")]),
    )
    .unwrap();
    add_fk(
        &db,
        ForeignKeyConstraint::new("children", &["parent_ref"], "parents", &["id"])
            .with_on_update(ReferentialAction::Cascade)
            .with_on_delete(ReferentialAction::Restrict),
    )
    .unwrap();
    db.insert("parents", vec![Value::Bytes(vec![1])]).unwrap();
    db.insert("children", vec![Value::Int(1), Value::Bytes(vec![1, 0, 0, 0])])
        .unwrap();

    update(&db, "parents", &vec![Value::Bytes(vec![1])], &vec![Value::Bytes(vec![2])]).unwrap();
    let child = vec![Value::Int(1), Value::Bytes(vec![2, 0, 0, 0])];
    assert_eq!(db.rows("children").unwrap(), vec![child.clone()]);

    // The padded child still pins its parent.
    let err = delete(&db, "parents", &vec![Value::Bytes(vec![2])]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ParentViolation);
    assert_eq!(db.rows("parents").unwrap(), vec![vec![Value::Bytes(vec![2])]]);
    assert_eq!(db.rows("children").unwrap(), vec![child]);
}

#[test]
fn test_update_cascade_rejects_keys_too_wide_for_the_child() {
    let db = test_db();
    db.create_table("codes", Schema::new(vec![col("code", "varchar(10)").primary_key()]))
        .unwrap();
    db.create_table(
        "labels",
        Schema::new(vec![col("id", "int").primary_key(), col("code", "char(3)")]),
    )
    .unwrap();
    add_fk(
        &db,
        ForeignKeyConstraint::new("labels", &["code"], "codes", &["code"])
            .with_on_update(ReferentialAction::Cascade),
    )
    .unwrap();
    db.insert_tokens("codes", &["abc"]).unwrap();
    db.insert_tokens("labels", &["1", "abc"]).unwrap();

    let err = update(&db, "codes", &vec![Value::text("abc")], &vec![Value::text("abcdef")])
        .unwrap_err();
    assert!(matches!(err, FkError::ChildViolation { ref name, ref key, .. }
        if name == "labels_ibfk_1" && key == "[abcdef]"));
    assert_eq!(db.rows("labels").unwrap(), vec![vec![Value::Int(1), Value::text("abc")]]);
}

#[test]
fn test_update_of_unmapped_column_skips_restrict() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Restrict);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();
    db.insert("orders", ints(&[100, 1])).unwrap();

    update(
        &db,
        "customers",
        &vec![Value::Int(1), Value::text("ann")],
        &vec![Value::Int(1), Value::text("anna")],
    )
    .unwrap();

    let err = update(
        &db,
        "customers",
        &vec![Value::Int(1), Value::text("anna")],
        &vec![Value::Int(2), Value::text("anna")],
    )
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ParentViolation);
    assert_eq!(db.rows("customers").unwrap(), vec![vec![Value::Int(1), Value::text("anna")]]);
}

#[test]
fn test_update_set_null_on_parent_key_change() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::SetNull);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();
    db.insert("orders", ints(&[100, 1])).unwrap();

    update(
        &db,
        "customers",
        &vec![Value::Int(1), Value::text("ann")],
        &vec![Value::Int(2), Value::text("ann")],
    )
    .unwrap();

    assert_eq!(db.rows("orders").unwrap(), vec![vec![Value::Int(100), Value::Null]]);
}

#[test]
fn test_child_update_rechecks_changed_reference() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Restrict);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();
    db.insert("orders", ints(&[100, 1])).unwrap();

    let err = update(&db, "orders", &ints(&[100, 1]), &ints(&[100, 2])).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ChildViolation);

    // Only the order id changes, so the parent is not looked up again.
    let before = db.reference_check_count("customers").unwrap();
    update(&db, "orders", &ints(&[100, 1]), &ints(&[200, 1])).unwrap();
    assert_eq!(db.reference_check_count("customers").unwrap(), before);
    assert_eq!(db.rows("orders").unwrap(), vec![ints(&[200, 1])]);
}

#[test]
fn test_cascade_walks_a_multi_level_chain() {
    let db = test_db();
    for name in ["a", "b", "c"] {
        db.create_table(
            name,
            Schema::new(vec![col("id", "int").primary_key(), col("parent", "int")]),
        )
        .unwrap();
    }
    add_fk(
        &db,
        ForeignKeyConstraint::new("b", &["parent"], "a", &["id"])
            .with_on_delete(ReferentialAction::Cascade),
    )
    .unwrap();
    add_fk(
        &db,
        ForeignKeyConstraint::new("c", &["parent"], "b", &["id"])
            .with_on_delete(ReferentialAction::Cascade),
    )
    .unwrap();
    db.insert("a", vec![Value::Int(1), Value::Null]).unwrap();
    db.insert("b", ints(&[10, 1])).unwrap();
    db.insert("b", ints(&[11, 1])).unwrap();
    db.insert("c", ints(&[100, 10])).unwrap();
    db.insert("c", ints(&[101, 11])).unwrap();
    db.insert("c", ints(&[102, 12])).unwrap();

    delete(&db, "a", &vec![Value::Int(1), Value::Null]).unwrap();

    assert!(db.rows("b").unwrap().is_empty());
    assert_eq!(db.rows("c").unwrap(), vec![ints(&[102, 12])]);
}

#[test]
fn test_cascade_stops_at_a_restrict_further_down() {
    let db = test_db();
    for name in ["a", "b", "c"] {
        db.create_table(
            name,
            Schema::new(vec![col("id", "int").primary_key(), col("parent", "int")]),
        )
        .unwrap();
    }
    add_fk(
        &db,
        ForeignKeyConstraint::new("b", &["parent"], "a", &["id"])
            .with_on_delete(ReferentialAction::Cascade),
    )
    .unwrap();
    add_fk(&db, ForeignKeyConstraint::new("c", &["parent"], "b", &["id"])).unwrap();
    db.insert("a", vec![Value::Int(1), Value::Null]).unwrap();
    db.insert("b", ints(&[10, 1])).unwrap();
    db.insert("c", ints(&[100, 10])).unwrap();

    let err = delete(&db, "a", &vec![Value::Int(1), Value::Null]).unwrap_err();
    assert!(matches!(err, FkError::ParentViolation { ref table, .. } if table == "c"));
    assert_eq!(db.rows("c").unwrap().len(), 1);
}

#[test]
fn test_self_referential_cascade_deletes_subtree() {
    let db = test_db();
    db.create_table(
        "nodes",
        Schema::new(vec![col("id", "int").primary_key(), col("parent_id", "int")]),
    )
    .unwrap();
    add_fk(
        &db,
        ForeignKeyConstraint::new("nodes", &["parent_id"], "nodes", &["id"])
            .with_on_delete(ReferentialAction::Cascade),
    )
    .unwrap();
    db.insert("nodes", vec![Value::Int(1), Value::Null]).unwrap();
    db.insert("nodes", ints(&[2, 1])).unwrap();
    db.insert("nodes", ints(&[3, 2])).unwrap();
    db.insert("nodes", ints(&[4, 1])).unwrap();
    db.insert("nodes", vec![Value::Int(5), Value::Null]).unwrap();

    delete(&db, "nodes", &vec![Value::Int(1), Value::Null]).unwrap();

    assert_eq!(db.rows("nodes").unwrap(), vec![vec![Value::Int(5), Value::Null]]);
}

#[test]
fn test_insert_check_uses_root_references() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Restrict, ReferentialAction::Restrict);
    db.insert_tokens("customers", &["1", "ann"]).unwrap();

    insert_checked(&db, "orders", ints(&[1, 1])).unwrap();
    insert_checked(&db, "orders", vec![Value::Int(2), Value::Null]).unwrap();
    let err = insert_checked(&db, "orders", ints(&[3, 9])).unwrap_err();
    assert!(matches!(err, FkError::ChildViolation { ref key, .. } if key == "[9]"));
    assert_eq!(db.rows("orders").unwrap().len(), 2);
}

#[test]
fn test_editor_close_reaches_every_table_handle() {
    let db = test_db();
    seed_customers_orders(&db, ReferentialAction::Cascade, ReferentialAction::Cascade);

    let editor = build_foreign_key_editor(&db, DB, "orders", &ForeignKeyConfig::default()).unwrap();
    assert!(editor.is_initialized());
    editor.close().unwrap();

    // orders is edited, customers is only read for reference checks.
    assert_eq!(db.close_count("orders").unwrap(), 1);
    assert_eq!(db.close_count("customers").unwrap(), 1);
}
