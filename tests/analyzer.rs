use std::collections::HashSet;

use proptest::prelude::*;
use sheet2sql::{
    analyzer::{CancelFlag, SchemaAnalyzer, column_names, detect_type},
    error::ImportError,
    logger::Logger,
    schema::DataType,
};

fn analyzer() -> SchemaAnalyzer {
    SchemaAnalyzer::new(Logger::global("sheet2sql::analyzer"))
}

fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

fn types(rows: &[Vec<String>]) -> Vec<DataType> {
    analyzer()
        .analyze("t", rows, &CancelFlag::new())
        .expect("analyze")
        .columns
        .into_iter()
        .map(|column| column.data_type)
        .collect()
}

#[test]
fn non_numeric_value_widens_age_to_string() {
    let rows = grid(&[&["name", "age"], &["Ana", "30"], &["Bo", "thirty"]]);
    assert_eq!(types(&rows), vec![DataType::String, DataType::String]);
}

#[test]
fn later_float_widens_integer_column() {
    let rows = grid(&[&["x"], &["1"], &["2.5"]]);
    assert_eq!(types(&rows), vec![DataType::Float]);
}

#[test]
fn mixed_columns_from_realistic_export() {
    let rows = grid(&[
        &["Order ID", "Paid", "Total", "", "Order ID"],
        &["1001", "TRUE", "19.99", "", "A-1"],
        &["1002", "false", "5", "  ", "A-2"],
        &["1003", "", "1e3", "", ""],
    ]);
    let schema = analyzer()
        .analyze("orders", &rows, &CancelFlag::new())
        .expect("analyze");
    let names = schema.column_names().collect::<Vec<_>>();
    assert_eq!(names, vec!["Order ID", "Paid", "Total", "col_4", "Order ID_1"]);
    let types = schema.columns.iter().map(|c| c.data_type).collect::<Vec<_>>();
    assert_eq!(
        types,
        vec![
            DataType::Integer,
            DataType::Boolean,
            DataType::Float,
            DataType::String,
            DataType::String,
        ]
    );
}

#[test]
fn empty_inputs_are_rejected_with_distinct_errors() {
    let err = analyzer()
        .analyze("t", &[], &CancelFlag::new())
        .expect_err("no rows");
    assert!(matches!(err, ImportError::EmptyData));

    let err = analyzer()
        .analyze("t", &[Vec::new()], &CancelFlag::new())
        .expect_err("no columns");
    assert!(matches!(err, ImportError::NoColumns));
}

#[test]
fn cancellation_is_observed_on_long_inputs() {
    let mut rows = grid(&[&["n"]]);
    rows.extend((0..100).map(|i| vec![i.to_string()]));
    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = analyzer()
        .analyze("t", &rows, &cancel)
        .expect_err("canceled");
    assert!(matches!(err, ImportError::Canceled { op: "analyzer.analyze" }));
}

fn cell_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (-1_000_000i64..1_000_000).prop_map(|n| n.to_string()),
        (-1.0e6f64..1.0e6).prop_map(|f| f.to_string()),
        prop_oneof![Just("true"), Just("FALSE"), Just("True")].prop_map(str::to_string),
        "[a-z]{1,6}",
    ]
}

fn grid_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    (1usize..6).prop_flat_map(|width| {
        let header = proptest::collection::vec("[a-c_1 ]{0,3}", width);
        let row = proptest::collection::vec(cell_strategy(), 0..=width + 1);
        let data = proptest::collection::vec(row, 0..20);
        (header, data).prop_map(|(header, data)| {
            let mut rows = vec![header];
            rows.extend(data);
            rows
        })
    })
}

proptest! {
    #[test]
    fn column_names_are_distinct_and_complete(
        headers in proptest::collection::vec("[a-c_1-3 ]{0,4}", 1..10)
    ) {
        let names = column_names(&headers);
        prop_assert_eq!(names.len(), headers.len());
        let unique = names.iter().collect::<HashSet<_>>();
        prop_assert_eq!(unique.len(), names.len());
        prop_assert!(names.iter().all(|name| !name.trim().is_empty()));
    }

    #[test]
    fn analysis_is_deterministic(rows in grid_strategy()) {
        let first = analyzer().analyze("t", &rows, &CancelFlag::new()).expect("first");
        let second = analyzer().analyze("t", &rows, &CancelFlag::new()).expect("second");
        prop_assert_eq!(first.column_count(), rows[0].len());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn header_only_grids_are_all_text(
        header in proptest::collection::vec("[a-z]{0,5}", 1..8)
    ) {
        let schema = analyzer().analyze("t", &[header], &CancelFlag::new()).expect("analyze");
        prop_assert!(schema.columns.iter().all(|c| c.data_type == DataType::String));
    }

    #[test]
    fn detected_types_only_widen(values in proptest::collection::vec(cell_strategy(), 0..30)) {
        let mut current = DataType::Unknown;
        for value in &values {
            let next = detect_type(value, current);
            prop_assert!(next.subsumes(current), "{current} -> {next} on {value:?}");
            current = next;
        }
    }
}
