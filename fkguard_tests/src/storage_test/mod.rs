use std::rc::Rc;

use fkguard_core::storage::{
    Column, ForeignKeyTable, Index, IndexDef, IndexLookup, IndexRange, MemDatabase,
    RangeColumnExpr, Schema, TableResolver,
};
use fkguard_core::types::datatype::{DataType, parse_datatype};
use fkguard_core::{ErrorCode, FkError, ForeignKeyConstraint, Row, Value};

fn test_db() -> MemDatabase {
    let db = MemDatabase::new("mydb");
    db.create_table(
        "people",
        Schema::new(vec![
            Column::new("id", DataType::Int).primary_key(),
            Column::new("team", DataType::Int),
            Column::new("email", parse_datatype("varchar(64)").unwrap()),
        ]),
    )
    .unwrap();
    db
}

fn person(id: i64, team: i64, email: &str) -> Row {
    vec![Value::Int(id), Value::Int(team), Value::text(email)]
}

fn index(db: &MemDatabase, table: &str, id: &str) -> Rc<dyn Index> {
    db.table(table)
        .unwrap()
        .indexes()
        .unwrap()
        .into_iter()
        .find(|i| i.id() == id)
        .unwrap()
}

fn int_point(n: i64) -> RangeColumnExpr {
    RangeColumnExpr::point(Value::Int(n), DataType::Int)
}
