use crate::app::error::AlignmentError;
use crate::app::types::{ColumnTuple, DetailRecord, Listing, MergedRecord};

/// Column tuple `i` belongs to detail URL `i`. A page where the counts differ
/// cannot be merged without guessing, so it is rejected whole.
pub fn check_alignment(listing: &Listing) -> Result<(), AlignmentError> {
    if listing.columns.len() != listing.detail_urls.len() {
        return Err(AlignmentError::LengthMismatch {
            columns: listing.columns.len(),
            detail_urls: listing.detail_urls.len(),
        });
    }
    Ok(())
}

/// Detail fields override listing fields of the same name; `source` and
/// `collected_at` are stamped last.
pub fn merge_row(
    column: &ColumnTuple,
    detail: &DetailRecord,
    source: &str,
    collected_at: &str,
) -> MergedRecord {
    let mut record = MergedRecord::new();
    for (name, value) in column.fields() {
        record.set(name.as_str(), value.as_str());
    }
    for (name, value) in detail.iter() {
        record.set(name, value);
    }
    record.set("source", source);
    record.set("collected_at", collected_at);
    record
}
