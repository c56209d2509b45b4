use humansize::{format_size, WINDOWS};

/// Human-readable size in base-1024 units, rounded to a whole number.
///
/// Presentation only; callers keep and compare the raw byte count.
pub fn human_size(bytes: u64) -> String {
    format_size(bytes, WINDOWS.decimal_places(0))
}
