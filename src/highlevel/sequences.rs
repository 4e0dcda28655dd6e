//! Entity sequences: grouping flat rows into per-entity time series.
//!
//! Input rows are row-major records holding entity key columns, context
//! columns and sequence columns side by side. [`assemble_sequences`] groups
//! them by entity key (in order of first appearance) and turns each group
//! into a [`Sequence`]: the entity's context values plus its sequence
//! columns in column-major form, ready for the encoder.

use crate::error::{Result, SeqTensorError};
use crate::kernel::CellValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One entity's time series and its static context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Context values, one per context column.
    pub context: Vec<CellValue>,
    /// Sequence values, column-major: `data[column][step]`.
    pub data: Vec<Vec<CellValue>>,
}

impl Sequence {
    pub fn new(context: Vec<CellValue>, data: Vec<Vec<CellValue>>) -> Self {
        Self { context, data }
    }

    /// Number of steps (length of the first column).
    pub fn len(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_columns(&self) -> usize {
        self.data.len()
    }

    /// Values of one step across all sequence columns.
    pub fn step(&self, step: usize) -> Option<Vec<&CellValue>> {
        self.data.iter().map(|column| column.get(step)).collect()
    }
}

/// Group row-major records into per-entity sequences.
///
/// # Arguments
/// * `rows` - records, each indexable by column position
/// * `entity_columns` - columns that together identify an entity
/// * `context_columns` - columns constant within an entity
/// * `sequence_columns` - time-varying columns, in output column order
///
/// Rows keep their input order within an entity.
///
/// # Errors
/// - [`SeqTensorError::ColumnOutOfRange`] if a row is narrower than a requested column
/// - [`SeqTensorError::InconsistentContext`] if a context value changes within an entity
pub fn assemble_sequences<R: AsRef<[CellValue]>>(
    rows: &[R],
    entity_columns: &[usize],
    context_columns: &[usize],
    sequence_columns: &[usize],
) -> Result<Vec<Sequence>> {
    let mut groups: IndexMap<Vec<CellValue>, Sequence> = IndexMap::new();

    for row in rows {
        let row = row.as_ref();
        let key = pick(row, entity_columns)?;
        let context = pick(row, context_columns)?;
        let values = pick(row, sequence_columns)?;

        let sequence = groups.entry(key.clone()).or_insert_with(|| {
            Sequence::new(context.clone(), vec![Vec::new(); sequence_columns.len()])
        });

        if let Some(position) = sequence
            .context
            .iter()
            .zip(&context)
            .position(|(a, b)| a.canonical() != b.canonical())
        {
            let entity = key
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SeqTensorError::InconsistentContext {
                entity,
                column: context_columns[position],
            });
        }

        for (column, value) in sequence.data.iter_mut().zip(values) {
            column.push(value);
        }
    }

    Ok(groups.into_values().collect())
}

fn pick(row: &[CellValue], columns: &[usize]) -> Result<Vec<CellValue>> {
    columns
        .iter()
        .map(|&index| {
            row.get(index)
                .cloned()
                .ok_or(SeqTensorError::ColumnOutOfRange {
                    index,
                    width: row.len(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entity: &str, age: i64, time: i64, kind: &str) -> Vec<CellValue> {
        vec![entity.into(), age.into(), time.into(), kind.into()]
    }

    #[test]
    fn test_groups_by_entity_in_first_seen_order() {
        let rows = vec![
            row("b", 40, 1, "x"),
            row("a", 30, 1, "y"),
            row("b", 40, 2, "z"),
            row("a", 30, 2, "x"),
            row("a", 30, 3, "x"),
        ];
        let sequences = assemble_sequences(&rows, &[0], &[1], &[2, 3]).unwrap();

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].context, vec![CellValue::Int(40)]);
        assert_eq!(sequences[0].len(), 2);
        assert_eq!(
            sequences[0].data[1],
            vec![CellValue::from("x"), CellValue::from("z")]
        );
        assert_eq!(sequences[1].context, vec![CellValue::Int(30)]);
        assert_eq!(sequences[1].len(), 3);
        assert_eq!(
            sequences[1].data[0],
            vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)]
        );
    }

    #[test]
    fn test_step_view() {
        let rows = vec![row("a", 1, 10, "x"), row("a", 1, 11, "y")];
        let sequences = assemble_sequences(&rows, &[0], &[], &[2, 3]).unwrap();

        let step = sequences[0].step(1).unwrap();
        assert_eq!(step, vec![&CellValue::Int(11), &CellValue::from("y")]);
        assert!(sequences[0].step(2).is_none());
    }

    #[test]
    fn test_inconsistent_context() {
        let rows = vec![row("a", 30, 1, "x"), row("a", 31, 2, "x")];
        let err = assemble_sequences(&rows, &[0], &[1], &[2]).unwrap_err();
        assert!(matches!(
            err,
            SeqTensorError::InconsistentContext { ref entity, column: 1 } if entity == "\"a\""
        ));
    }

    #[test]
    fn test_missing_context_is_consistent_with_itself() {
        let rows = vec![
            vec![CellValue::from("a"), CellValue::Float(f64::NAN), CellValue::Int(1)],
            vec![CellValue::from("a"), CellValue::Null, CellValue::Int(2)],
        ];
        let sequences = assemble_sequences(&rows, &[0], &[1], &[2]).unwrap();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].len(), 2);
    }

    #[test]
    fn test_column_out_of_range() {
        let rows = vec![row("a", 30, 1, "x")];
        let err = assemble_sequences(&rows, &[0], &[1], &[7]).unwrap_err();
        assert!(matches!(
            err,
            SeqTensorError::ColumnOutOfRange { index: 7, width: 4 }
        ));
    }
}
