#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use luga_data::{DataSet, SortOrder};
use serde_json::json;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert(Vec<(i16, bool)>),
    DeleteOdd,
    DeleteAll,
    Sort(bool),
    SetCursor(u8),
    FilterFlag(bool),
    ClearFilter,
}

fuzz_target!(|ops: Vec<Op>| {
    let ds = DataSet::new("fuzz");
    for op in ops {
        match op {
            Op::Insert(rows) => {
                let records: Vec<_> = rows
                    .into_iter()
                    .map(|(score, flag)| json!({"score": score, "flag": flag}))
                    .collect();
                let _ = ds.insert_value(serde_json::Value::Array(records));
            }
            Op::DeleteOdd => ds.delete_where(|_, row, _| {
                row["score"]
                    .as_i64()
                    .filter(|s| s % 2 != 0)
                    .map(|_| row.clone())
            }),
            Op::DeleteAll => ds.delete(),
            Op::Sort(ascending) => {
                let order = if ascending {
                    SortOrder::Ascending
                } else {
                    SortOrder::Descending
                };
                let _ = ds.sort(&["score".to_owned()], order);
            }
            Op::SetCursor(index) => {
                let _ = ds.set_current_row_index(usize::from(index));
            }
            Op::FilterFlag(flag) => {
                ds.set_filter(move |_, row, _| (row["flag"] == flag).then(|| row.clone()));
            }
            Op::ClearFilter => ds.delete_filter(),
        }
        if let Some(id) = ds.current_row_id() {
            assert!(ds.row_by_id(id).is_some());
        }
        assert_eq!(ds.select().len(), ds.records_count());
    }
});
