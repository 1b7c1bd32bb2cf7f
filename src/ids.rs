//! Fixed-width unsigned identifiers and the bit-packed `rowid` keys built from them.
//!
//! Every `rowid` column in the registry packs a "global" id in the high bits over a "local" id
//! in the low bits, so rows belonging to the same parent sort next to each other.

use rand::Rng;

use crate::error::SpannerDbError;

/// An unsigned id that must fit in `bits` bits and may not be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id {
    pub name: &'static str,
    pub bits: u32,
    pub max: i64,
}

impl Id {
    /// # Panics
    /// If `bits` is not in `2..=63`; for the constants below this fails at compile time.
    #[must_use]
    pub const fn new(name: &'static str, bits: u32) -> Self {
        assert!(bits > 1, "bits must be >1");
        assert!(bits < 64, "bits must be <64");
        Self {
            name,
            bits,
            max: mask(bits),
        }
    }

    /// Returns `x` unchanged if it is in range.
    ///
    /// # Errors
    /// Returns `SpannerDbError::InvalidId` if `x` is zero, negative, or wider than `bits`.
    pub fn check(&self, x: i64) -> Result<i64, SpannerDbError> {
        check_id(x, self.bits, self.name)
    }

    /// A uniformly random id in `1..=max`.
    #[must_use]
    pub fn generate(&self) -> i64 {
        rand::rng().random_range(1..=self.max)
    }
}

/// A primary key packing a global id over a local id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowId {
    pub name: &'static str,
    pub bits: u32,
    global: Id,
    local: Id,
}

impl RowId {
    /// # Panics
    /// If the combined width exceeds 63 bits; for the constants below this fails at compile time.
    #[must_use]
    pub const fn new(name: &'static str, global: Id, local: Id) -> Self {
        let bits = global.bits + local.bits;
        assert!(bits <= 63, "rowid can not exceed 63 bits");
        Self {
            name,
            bits,
            global,
            local,
        }
    }

    /// Returns `rowid` unchanged if both of its halves are valid ids.
    ///
    /// # Errors
    /// Returns `SpannerDbError::InvalidId` otherwise.
    pub fn check(&self, rowid: i64) -> Result<i64, SpannerDbError> {
        self.parse(rowid)?;
        Ok(rowid)
    }

    /// Pack a global and local id.
    ///
    /// # Errors
    /// Returns `SpannerDbError::InvalidId` if either half is out of range.
    pub fn create(&self, high: i64, low: i64) -> Result<i64, SpannerDbError> {
        self.global.check(high)?;
        self.local.check(low)?;
        Ok((high << self.local.bits) + low)
    }

    /// Split a rowid into its global and local ids.
    ///
    /// # Errors
    /// Returns `SpannerDbError::InvalidId` if the rowid or either half is out of range.
    pub fn parse(&self, rowid: i64) -> Result<(i64, i64), SpannerDbError> {
        check_id(rowid, self.bits, self.name)?;
        Ok((
            self.global.check(rowid >> self.local.bits)?,
            self.local.check(rowid & self.local.max)?,
        ))
    }

    /// Inclusive bounds of every rowid under `high`, for `BETWEEN` scans.
    ///
    /// # Errors
    /// Returns `SpannerDbError::InvalidId` if `high` is out of range.
    pub fn range(&self, high: i64) -> Result<(i64, i64), SpannerDbError> {
        Ok((self.create(high, 1)?, self.create(high, self.local.max)?))
    }
}

fn check_id(id: i64, bits: u32, name: &str) -> Result<i64, SpannerDbError> {
    if id == 0 {
        return Err(SpannerDbError::InvalidId(format!("{name} can not be zero")));
    }
    if id < 0 {
        return Err(SpannerDbError::InvalidId(format!(
            "{name} can not be a negative number: {id}"
        )));
    }
    if id > mask(bits) {
        return Err(SpannerDbError::InvalidId(format!(
            "{name} must be a {bits}-bit number: {id}"
        )));
    }
    Ok(id)
}

/// Highest value representable in `bits` unsigned bits.
const fn mask(bits: u32) -> i64 {
    if bits >= 63 {
        i64::MAX
    } else {
        (1 << bits) - 1
    }
}

pub const EXPERIMENT_ID: Id = Id::new("experiment_id", 28);
pub const RUN_ID: Id = Id::new("run_id", 29);
pub const TAG_ID: Id = Id::new("tag_id", 31);
pub const TAG_PLUGIN_ID: Id = Id::new("tag_plugin_id", 35);
pub const STEP_ID: Id = Id::new("step", 32);
pub const EVENT_LOG_ID: Id = Id::new("event_log_id", 29);

pub const RUN_ROWID: RowId = RowId::new("Runs.rowid", EXPERIMENT_ID, RUN_ID);
pub const TAG_ROWID: RowId = RowId::new("Tags.rowid", EXPERIMENT_ID, TAG_ID);
pub const TENSOR_ROWID: RowId = RowId::new("Tensors.rowid", TAG_ID, STEP_ID);
pub const EVENT_LOG_ROWID: RowId = RowId::new("EventLogs.rowid", RUN_ID, EVENT_LOG_ID);
