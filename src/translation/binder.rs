use std::borrow::Cow;

use crate::error::SpannerDbError;
use crate::types::RowValues;

/// Turns a statement with positional `?` placeholders plus parameters into the text the
/// classifier sees.
pub trait ParamBinder: Send + Sync {
    /// # Errors
    /// Returns `SpannerDbError::ParameterError` if the parameters cannot be bound.
    fn bind<'a>(&self, sql: &'a str, params: &[RowValues]) -> Result<Cow<'a, str>, SpannerDbError>;
}

/// Inlines parameters into the SQL text, left to right.
///
/// Text is wrapped in double quotes with no escaping, so a value containing `"` changes the
/// statement. Every `?` is replaced, including ones inside quoted literals. Both are known,
/// intentional limitations of this binder; callers needing safe binding should supply their
/// own `ParamBinder`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualBinder;

impl ParamBinder for TextualBinder {
    fn bind<'a>(&self, sql: &'a str, params: &[RowValues]) -> Result<Cow<'a, str>, SpannerDbError> {
        let placeholders = sql.matches('?').count();
        if placeholders != params.len() {
            return Err(SpannerDbError::ParameterError(format!(
                "statement has {placeholders} placeholders but {} parameters were given",
                params.len()
            )));
        }
        if placeholders == 0 {
            return Ok(Cow::Borrowed(sql));
        }

        let mut out = String::with_capacity(sql.len() + params.len() * 8);
        let mut params = params.iter();
        for (idx, piece) in sql.split('?').enumerate() {
            if idx > 0 {
                // counts were checked above
                if let Some(p) = params.next() {
                    render(p, &mut out)?;
                }
            }
            out.push_str(piece);
        }
        Ok(Cow::Owned(out))
    }
}

fn render(value: &RowValues, out: &mut String) -> Result<(), SpannerDbError> {
    match value {
        RowValues::Text(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        RowValues::Int(i) => out.push_str(&i.to_string()),
        RowValues::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        RowValues::Null => out.push_str("NULL"),
        RowValues::Blob(_) => {
            return Err(SpannerDbError::ParameterError(
                "byte parameters can not be inlined into SQL text".to_string(),
            ));
        }
    }
    Ok(())
}
