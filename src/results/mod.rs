mod result_set;
mod row;

pub use result_set::{ColumnDescription, ResultSet};
pub use row::SpannerRow;
