use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

use crate::TransferError;

/// Re-serializes CSV text with minimal quoting.
///
/// Rows keep their field counts (ragged rows are allowed), are separated by
/// `\n`, and the output has no trailing newline.
pub fn normalize_csv(raw: &[u8]) -> Result<Vec<u8>, TransferError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw);
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(raw.len()));

    for record in reader.byte_records() {
        writer.write_byte_record(&record?)?;
    }

    let mut out = writer.into_inner().map_err(|e| e.into_error())?;
    if out.last() == Some(&b'\n') {
        out.pop();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        String::from_utf8(normalize_csv(s.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn drops_needless_quotes() {
        assert_eq!(norm("\"a\",\"b\"\r\n\"1\",\"2\"\r\n"), "a,b\n1,2");
    }

    #[test]
    fn keeps_needed_quotes() {
        assert_eq!(
            norm("name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\n"),
            "name,note\n\"Smith, J\",\"said \"\"hi\"\"\""
        );
    }

    #[test]
    fn embedded_newline_stays_quoted() {
        assert_eq!(norm("a,\"line1\nline2\"\n"), "a,\"line1\nline2\"");
    }

    #[test]
    fn ragged_rows_allowed() {
        assert_eq!(norm("a,b,c\n1\n2,3\n"), "a,b,c\n1\n2,3");
    }

    #[test]
    fn no_trailing_newline_without_input_newline() {
        assert_eq!(norm("x,y"), "x,y");
    }

    #[test]
    fn empty_input() {
        assert_eq!(norm(""), "");
    }
}
