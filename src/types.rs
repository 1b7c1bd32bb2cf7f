/// Values that can be bound as statement parameters, stored in backend rows, or used as keys.
///
/// The same enum travels through every layer so the cursor never has to branch on
/// backend-specific value types:
/// ```rust
/// use spanner_middleware::prelude::*;
///
/// let params = vec![
///     RowValues::Int(297),
///     RowValues::Text("events.out.tfevents.1.host".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
///
/// The derived ordering is only meaningful between values of the same kind, plus `Null`
/// sorting before everything else (it is declared first). Primary-key columns are
/// homogeneous, so that is all key ordering needs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowValues {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Text/string value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short name of the value kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RowValues::Null => "NULL",
            RowValues::Bool(_) => "BOOL",
            RowValues::Int(_) => "INT64",
            RowValues::Text(_) => "STRING",
            RowValues::Blob(_) => "BYTES",
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_first() {
        let mut values = vec![RowValues::Int(3), RowValues::Null, RowValues::Int(-1)];
        values.sort();
        assert_eq!(
            values,
            vec![RowValues::Null, RowValues::Int(-1), RowValues::Int(3)]
        );
    }

    #[test]
    fn accessors_match_variant_only() {
        let v = RowValues::from("abc");
        assert_eq!(v.as_text(), Some("abc"));
        assert!(v.as_int().is_none());
        assert_eq!(RowValues::from(7).as_int(), Some(&7));
        assert_eq!(RowValues::from(false).as_bool(), Some(&false));
        assert!(RowValues::Null.is_null());
        assert_eq!(RowValues::from(vec![1u8, 2]).kind(), "BYTES");
    }
}
