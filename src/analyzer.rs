//! Schema inference over a decoded grid.
//!
//! Row 0 supplies column names; every later row is evidence for the column
//! types. A column's type starts at [`DataType::Unknown`] and is widened cell
//! by cell, never narrowed. Columns that saw no evidence end up as
//! [`DataType::String`].

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    error::ImportError,
    logger::Logger,
    schema::{Column, DataType, TableSchema},
};

/// Number of data rows processed between two cancellation checks.
pub const CANCEL_CHECK_INTERVAL: usize = 15;

const OP_ANALYZE: &str = "analyzer.analyze";

/// Cooperative cancellation signal shared between the caller and a running
/// import.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SchemaAnalyzer {
    log: Logger,
}

impl SchemaAnalyzer {
    pub fn new(log: Logger) -> Self {
        Self { log }
    }

    pub fn analyze(
        &self,
        table_name: &str,
        rows: &[Vec<String>],
        cancel: &CancelFlag,
    ) -> Result<TableSchema, ImportError> {
        let Some((headers, data)) = rows.split_first() else {
            return Err(ImportError::EmptyData);
        };
        if headers.is_empty() {
            return Err(ImportError::NoColumns);
        }

        let mut columns = column_names(headers)
            .into_iter()
            .map(|name| Column::new(name, DataType::Unknown))
            .collect::<Vec<_>>();

        if data.is_empty() {
            for column in &mut columns {
                column.data_type = DataType::String;
            }
            self.log.debug(format_args!(
                "{OP_ANALYZE}: table '{table_name}' has only a header row, all columns are String"
            ));
            return Ok(TableSchema::new(table_name, columns));
        }

        for (row_idx, row) in data.iter().enumerate() {
            if row_idx % CANCEL_CHECK_INTERVAL == 0 && cancel.is_canceled() {
                self.log.debug(format_args!(
                    "{OP_ANALYZE}: canceled before data row {}",
                    row_idx + 1
                ));
                return Err(ImportError::Canceled { op: OP_ANALYZE });
            }
            for (column, value) in columns.iter_mut().zip(row.iter()) {
                if column.data_type == DataType::String {
                    continue;
                }
                column.data_type = detect_type(value, column.data_type);
            }
        }

        for column in &mut columns {
            if column.data_type == DataType::Unknown {
                column.data_type = DataType::String;
            }
        }

        self.log.debug(format_args!(
            "{OP_ANALYZE}: inferred {} column(s) for '{table_name}' from {} data row(s)",
            columns.len(),
            data.len()
        ));
        Ok(TableSchema::new(table_name, columns))
    }
}

/// Derive unique column names from the header cells.
///
/// Blank headers become `col_<n>` (1-based). Repeated names get `_<k>`
/// suffixes from a per-name counter; a suffixed candidate that is already
/// taken, or that a later header spells out literally, is skipped so the
/// result stays collision-free.
pub fn column_names(headers: &[String]) -> Vec<String> {
    let base_names = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let trimmed = header.trim();
            if trimmed.is_empty() {
                format!("col_{}", idx + 1)
            } else {
                trimmed.to_string()
            }
        })
        .collect::<Vec<_>>();

    let mut reserved = base_names.iter().cloned().collect::<HashSet<_>>();
    let mut assigned = HashSet::with_capacity(base_names.len());
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut names = Vec::with_capacity(base_names.len());

    for base in &base_names {
        let name = if assigned.contains(base) {
            let counter = occurrences.entry(base.as_str()).or_insert(1);
            loop {
                let candidate = format!("{base}_{counter}");
                *counter += 1;
                if !reserved.contains(&candidate) && !assigned.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            occurrences.entry(base.as_str()).or_insert(1);
            base.clone()
        };
        reserved.insert(name.clone());
        assigned.insert(name.clone());
        names.push(name);
    }
    names
}

/// One refinement step: the type a column moves to after observing `value`.
pub fn detect_type(value: &str, current: DataType) -> DataType {
    if current == DataType::String {
        return DataType::String;
    }
    let value = value.trim();
    if value.is_empty() {
        return current;
    }

    let is_bool = value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false");
    let is_int = value.parse::<i64>().is_ok();
    let is_float = is_int || value.parse::<f64>().is_ok();

    match current {
        DataType::Unknown if is_bool => DataType::Boolean,
        DataType::Unknown if is_int => DataType::Integer,
        DataType::Unknown if is_float => DataType::Float,
        DataType::Boolean if is_bool => DataType::Boolean,
        DataType::Integer if is_int => DataType::Integer,
        DataType::Integer | DataType::Float if is_float => DataType::Float,
        _ => DataType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn analyzer() -> SchemaAnalyzer {
        SchemaAnalyzer::new(Logger::global("sheet2sql::analyzer"))
    }

    #[test]
    fn detect_type_walks_transition_table() {
        use DataType::{Boolean, Float, Integer, String, Unknown};

        assert_eq!(detect_type("TRUE", Unknown), Boolean);
        assert_eq!(detect_type("42", Unknown), Integer);
        assert_eq!(detect_type("-4.2e3", Unknown), Float);
        assert_eq!(detect_type("abc", Unknown), String);

        assert_eq!(detect_type("false", Boolean), Boolean);
        assert_eq!(detect_type("1", Boolean), String);

        assert_eq!(detect_type("7", Integer), Integer);
        assert_eq!(detect_type("7.5", Integer), Float);
        assert_eq!(detect_type("true", Integer), String);

        assert_eq!(detect_type("7", Float), Float);
        assert_eq!(detect_type("n/a", Float), String);

        assert_eq!(detect_type("1", String), String);
    }

    #[test]
    fn detect_type_ignores_blank_values() {
        assert_eq!(detect_type("   ", DataType::Integer), DataType::Integer);
        assert_eq!(detect_type("", DataType::Unknown), DataType::Unknown);
    }

    #[test]
    fn detect_type_trims_before_classifying() {
        assert_eq!(detect_type("  12 ", DataType::Unknown), DataType::Integer);
        assert_eq!(detect_type(" True\t", DataType::Unknown), DataType::Boolean);
    }

    #[test]
    fn detect_type_rejects_integers_outside_i64() {
        assert_eq!(
            detect_type("9223372036854775808", DataType::Unknown),
            DataType::Float
        );
    }

    #[test]
    fn column_names_fill_blanks_and_deduplicate() {
        let headers = vec![
            " id ".to_string(),
            "".to_string(),
            "id".to_string(),
            "id".to_string(),
        ];
        assert_eq!(column_names(&headers), vec!["id", "col_2", "id_1", "id_2"]);
    }

    #[test]
    fn column_names_skip_suffixes_claimed_by_later_headers() {
        let headers = vec!["a".to_string(), "a".to_string(), "a_1".to_string()];
        assert_eq!(column_names(&headers), vec!["a", "a_2", "a_1"]);
    }

    #[test]
    fn column_names_skip_suffixes_claimed_by_earlier_headers() {
        let headers = vec!["a_1".to_string(), "a".to_string(), "a".to_string()];
        assert_eq!(column_names(&headers), vec!["a_1", "a", "a_2"]);
    }

    #[test]
    fn synthesized_names_can_collide_with_literal_headers() {
        let headers = vec!["col_2".to_string(), " ".to_string()];
        assert_eq!(column_names(&headers), vec!["col_2", "col_2_1"]);
    }

    #[test]
    fn analyze_rejects_empty_input() {
        let err = analyzer()
            .analyze("t", &[], &CancelFlag::new())
            .expect_err("empty grid");
        assert!(matches!(err, ImportError::EmptyData));
    }

    #[test]
    fn analyze_rejects_empty_header() {
        let err = analyzer()
            .analyze("t", &[Vec::new()], &CancelFlag::new())
            .expect_err("empty header");
        assert!(matches!(err, ImportError::NoColumns));
    }

    #[test]
    fn header_only_input_yields_string_columns() {
        let schema = analyzer()
            .analyze("t", &grid(&[&["a", "b"]]), &CancelFlag::new())
            .expect("analyze");
        assert!(schema.columns.iter().all(|c| c.data_type == DataType::String));
    }

    #[test]
    fn ragged_rows_are_tolerated() {
        let rows = grid(&[&["a", "b"], &["1"], &["2", "x", "extra", "more"]]);
        let schema = analyzer()
            .analyze("t", &rows, &CancelFlag::new())
            .expect("analyze");
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[0].data_type, DataType::Integer);
        assert_eq!(schema.columns[1].data_type, DataType::String);
    }

    #[test]
    fn all_empty_column_resolves_to_string() {
        let rows = grid(&[&["a", "b"], &["1", ""], &["2", "  "]]);
        let schema = analyzer()
            .analyze("t", &rows, &CancelFlag::new())
            .expect("analyze");
        assert_eq!(schema.columns[1].data_type, DataType::String);
    }

    #[test]
    fn canceled_flag_stops_analysis() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let rows = grid(&[&["a"], &["1"]]);
        let err = analyzer()
            .analyze("t", &rows, &cancel)
            .expect_err("canceled");
        assert!(matches!(err, ImportError::Canceled { op: OP_ANALYZE }));
        assert!(err.to_string().starts_with("analyzer.analyze: "));
    }

    #[test]
    fn header_only_input_ignores_cancellation() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let schema = analyzer()
            .analyze("t", &grid(&[&["a"]]), &cancel)
            .expect("no data rows to scan");
        assert_eq!(schema.columns[0].data_type, DataType::String);
    }
}
