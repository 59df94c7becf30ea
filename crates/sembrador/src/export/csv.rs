use std::borrow::Cow;

use tracing::warn;

/// Media type declared for every export.
pub const CSV_MEDIA_TYPE: &str = "text/csv;charset=utf-8;";

/// Spreadsheet applications need the byte-order mark to detect UTF-8.
pub const UTF8_BOM: char = '\u{feff}';

const FORMULA_TRIGGERS: [char; 4] = ['=', '+', '-', '@'];
const FIELD_SEPARATOR: char = ',';
const LINE_SEPARATOR: char = '\n';

/// Rendered CSV document ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPayload {
    text: String,
}

impl CsvPayload {
    /// Render `headers` followed by `rows`. Rows are written as given; a row whose
    /// width differs from the header is logged, not rejected.
    pub fn render<H, C>(headers: &[H], rows: &[Vec<C>]) -> Self
    where
        H: AsRef<str>,
        C: AsRef<str>,
    {
        let columns = headers.len();
        let mut text = String::new();
        text.push(UTF8_BOM);
        push_line(&mut text, headers);

        for (index, row) in rows.iter().enumerate() {
            let cells = row.as_slice();
            if cells.len() != columns {
                warn!(
                    row = index + 1,
                    cells = cells.len(),
                    columns,
                    "export row width differs from header"
                );
            }
            text.push(LINE_SEPARATOR);
            push_line(&mut text, cells);
        }

        Self { text }
    }

    pub fn media_type(&self) -> &'static str {
        CSV_MEDIA_TYPE
    }

    /// Full text including the leading byte-order mark.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.text.into_bytes()
    }
}

fn push_line<C: AsRef<str>>(text: &mut String, cells: &[C]) {
    for (position, cell) in cells.iter().enumerate() {
        if position > 0 {
            text.push(FIELD_SEPARATOR);
        }
        text.push_str(&escape_field(cell.as_ref()));
    }
}

/// Neutralize formula triggers, then quote when the cell needs it.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    quote_if_needed(neutralize_formula(field))
}

fn neutralize_formula(field: &str) -> Cow<'_, str> {
    match field.chars().next() {
        Some(first) if FORMULA_TRIGGERS.contains(&first) => Cow::Owned(format!("'{field}")),
        _ => Cow::Borrowed(field),
    }
}

fn quote_if_needed(field: Cow<'_, str>) -> Cow<'_, str> {
    if field.contains([FIELD_SEPARATOR, '"', LINE_SEPARATOR]) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        field
    }
}
