use std::collections::HashMap;

/// One result row as column name → value text.
pub type RowRecord = HashMap<String, String>;

/// Converts one raw result row into a [`RowRecord`].
///
/// This is the only piece a concrete DAO has to provide. It is passed to
/// each listing and lookup call and invoked once per row.
pub trait RowMapper<R>: Send + Sync {
    fn map_row(&self, row: &R) -> Result<RowRecord, sqlx::Error>;
}

impl<R, F> RowMapper<R> for F
where
    F: Fn(&R) -> Result<RowRecord, sqlx::Error> + Send + Sync,
{
    fn map_row(&self, row: &R) -> Result<RowRecord, sqlx::Error> {
        self(row)
    }
}

/// Maps every non-NULL column to its text form, keyed by column name.
///
/// Text, integer, floating point, boolean, date/time, UUID and JSON columns
/// are supported. NULL columns are left out of the record.
///
/// # Unsupported columns
///
/// NUMERIC/DECIMAL and binary (BYTEA, BLOB) columns have no text decoding
/// here and fail the whole row with the driver's decode error. Cast them to
/// text in the query or supply a [`RowMapper`] that handles them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextColumns;

/// Decodes column `$index` of `$row` as the first listed type the driver
/// accepts and renders it with `to_string`.
macro_rules! column_text {
    ($row:expr, $index:expr; $first:ty $(, $rest:ty)*) => {{
        let mut text: Result<Option<String>, sqlx::Error> =
            sqlx::Row::try_get::<Option<$first>, _>($row, $index)
                .map(|value| value.map(|value| value.to_string()));
        $(
            if text.is_err() {
                text = sqlx::Row::try_get::<Option<$rest>, _>($row, $index)
                    .map(|value| value.map(|value| value.to_string()));
            }
        )*
        text
    }};
}
