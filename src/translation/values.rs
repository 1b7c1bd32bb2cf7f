use crate::error::SpannerDbError;
use crate::schema::ColumnType;
use crate::types::RowValues;

/// Convert a raw INSERT value token (as produced by the classifier) into a typed value for
/// the column it is written to.
///
/// # Errors
/// Returns `SpannerDbError::ParameterError` if the token is not a literal of the column's type.
pub fn decode_token(token: &str, column_type: &ColumnType) -> Result<RowValues, SpannerDbError> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("NULL") {
        return Ok(RowValues::Null);
    }

    let mismatch = || {
        SpannerDbError::ParameterError(format!("{token} is not a valid {column_type} literal"))
    };

    match column_type {
        ColumnType::Int64 => token.parse().map(RowValues::Int).map_err(|_| mismatch()),
        ColumnType::Bool => {
            if token.eq_ignore_ascii_case("true") {
                Ok(RowValues::Bool(true))
            } else if token.eq_ignore_ascii_case("false") {
                Ok(RowValues::Bool(false))
            } else {
                Err(mismatch())
            }
        }
        ColumnType::String { .. } => unquote(token)
            .map(|s| RowValues::Text(s.to_string()))
            .ok_or_else(mismatch),
        ColumnType::Bytes { .. } => unquote(token)
            .map(|s| RowValues::Blob(s.as_bytes().to_vec()))
            .ok_or_else(mismatch),
    }
}

/// Strip one pair of matching single or double quotes.
pub(crate) fn unquote(token: &str) -> Option<&str> {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return Some(&token[1..token.len() - 1]);
        }
    }
    None
}
