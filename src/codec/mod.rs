/// Positional table decoding shared by the `show stat` and
/// `show servers state` decoders
///
/// Both responses are line-oriented tables: `#` starts a comment line, each
/// remaining line is one record whose columns are identified purely by
/// position. Fields may be double-quoted, with `""` escaping a quote.
use crate::error::{RuntimeError, RuntimeResult};
use std::borrow::Cow;

/// Iterate the data lines of a table body.
///
/// Yields `(line_number, line)` pairs where `line_number` counts from
/// `first_line`. Comment lines and blank lines are skipped and a trailing
/// carriage return is stripped.
pub(crate) fn data_lines(body: &[u8], first_line: usize) -> impl Iterator<Item = (usize, &[u8])> {
    body.split(|b| *b == b'\n')
        .enumerate()
        .map(move |(i, line)| (first_line + i, line.strip_suffix(b"\r").unwrap_or(line)))
        .filter(|(_, line)| !line.is_empty() && line[0] != b'#')
}

/// Split one line into fields on `separator`
pub(crate) fn split_fields(line: &[u8], separator: u8) -> Result<Vec<Cow<'_, [u8]>>, String> {
    let mut fields = Vec::new();
    let mut rest = line;

    loop {
        if rest.first() == Some(&b'"') {
            let (field, consumed) = quoted_field(&rest[1..])?;
            fields.push(Cow::Owned(field));
            rest = &rest[1 + consumed..];
            match rest.first() {
                None => return Ok(fields),
                Some(b) if *b == separator => rest = &rest[1..],
                Some(b) => {
                    return Err(format!(
                        "unexpected {:?} after closing quote",
                        *b as char
                    ))
                }
            }
        } else {
            match rest.iter().position(|b| *b == separator) {
                Some(end) => {
                    fields.push(Cow::Borrowed(&rest[..end]));
                    rest = &rest[end + 1..];
                }
                None => {
                    fields.push(Cow::Borrowed(rest));
                    return Ok(fields);
                }
            }
        }
    }
}

/// Decode a quoted field body; `input` starts just after the opening quote.
/// Returns the unescaped bytes and how many input bytes were consumed,
/// closing quote included.
fn quoted_field(input: &[u8]) -> Result<(Vec<u8>, usize), String> {
    let mut field = Vec::new();
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'"' {
            if input.get(i + 1) == Some(&b'"') {
                field.push(b'"');
                i += 2;
                continue;
            }
            return Ok((field, i + 1));
        }
        field.push(input[i]);
        i += 1;
    }
    Err("unterminated quoted field".to_string())
}

/// One split table row
pub(crate) struct Row<'a> {
    line: usize,
    fields: Vec<Cow<'a, [u8]>>,
}

impl<'a> Row<'a> {
    pub(crate) fn parse(line_number: usize, line: &'a [u8], separator: u8) -> RuntimeResult<Self> {
        let fields = split_fields(line, separator).map_err(|reason| RuntimeError::MalformedRow {
            line: line_number,
            reason,
        })?;
        Ok(Self {
            line: line_number,
            fields,
        })
    }

    pub(crate) fn expect_columns(&self, expected: usize) -> RuntimeResult<()> {
        if self.fields.len() < expected {
            return Err(RuntimeError::MissingColumns {
                line: self.line,
                expected,
                found: self.fields.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn decode<T: FieldValue>(&self, column: usize, name: &'static str) -> RuntimeResult<T> {
        let raw: &[u8] = self.fields.get(column).map(|f| &f[..]).unwrap_or_default();
        T::decode(raw).map_err(|reason| RuntimeError::FieldParse {
            line: self.line,
            column,
            name,
            value: String::from_utf8_lossy(raw).into_owned(),
            reason,
        })
    }
}

/// A value that can live in one positional column.
///
/// Empty input decodes to the type's zero value.
pub trait FieldValue: Sized {
    fn decode(raw: &[u8]) -> Result<Self, String>;

    /// Render the value as a column, quoting if needed for `separator`.
    ///
    /// Rows are split on line feeds before fields are, so a value holding a
    /// line feed cannot be represented and is written as is.
    fn encode(&self, separator: u8) -> String;
}

impl FieldValue for String {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        std::str::from_utf8(raw)
            .map(str::to_string)
            .map_err(|e| e.to_string())
    }

    fn encode(&self, separator: u8) -> String {
        if self.bytes().any(|b| b == separator || b == b'"') {
            format!("\"{}\"", self.replace('"', "\"\""))
        } else {
            self.clone()
        }
    }
}

macro_rules! unsigned_field {
    ($($ty:ty),+) => {
        $(
            impl FieldValue for $ty {
                fn decode(raw: &[u8]) -> Result<Self, String> {
                    if raw.is_empty() {
                        return Ok(0);
                    }
                    btoi::btou(raw).map_err(|e| e.to_string())
                }

                fn encode(&self, _separator: u8) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

unsigned_field!(u8, u32, u64);

impl FieldValue for i64 {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        if raw.is_empty() {
            return Ok(0);
        }
        btoi::btoi(raw).map_err(|e| e.to_string())
    }

    fn encode(&self, _separator: u8) -> String {
        self.to_string()
    }
}

/// Flag columns: any non-zero integer is true
impl FieldValue for bool {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        i64::decode(raw).map(|v| v != 0)
    }

    fn encode(&self, _separator: u8) -> String {
        (if *self { "1" } else { "0" }).to_string()
    }
}

/// Define a record type decoded from a positional table row.
///
/// Generates the struct, a constant holding the column names in wire order,
/// `from_row` and `to_row`.
macro_rules! positional_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident (separator = $sep:literal, columns = $columns:ident) {
            $(
                $(#[$doc:meta])*
                $idx:literal $column:literal => $field:ident: $ty:ty,
            )+
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $(
                $(#[$doc])*
                pub $field: $ty,
            )+
        }

        /// Column names in wire order
        pub const $columns: &[&str] = &[$($column),+];

        impl $name {
            pub(crate) fn from_row(row: &$crate::codec::Row<'_>) -> $crate::error::RuntimeResult<Self> {
                row.expect_columns($columns.len())?;
                Ok(Self {
                    $($field: row.decode($idx, $column)?,)+
                })
            }

            /// Re-encode the record as one table row, columns in wire order.
            ///
            /// Values round-trip; formatting may differ from the remote
            /// (empty numeric columns come back as `0`).
            pub fn to_row(&self) -> String {
                let columns: Vec<String> = vec![
                    $($crate::codec::FieldValue::encode(&self.$field, $sep),)+
                ];
                columns.join(&($sep as char).to_string())
            }
        }
    };
}

pub(crate) use positional_record;
