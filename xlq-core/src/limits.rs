//! Central numeric policy. Every front-end-supplied count is clamped here
//! before it reaches the streaming or mutation components.

/// Row limit applied when reading a whole sheet without a range
pub const DEFAULT_ROW_LIMIT: usize = 1000;

/// Absolute ceiling on rows returned by a single read
pub const MAX_ROW_LIMIT: usize = 10_000;

/// Default row count for head operations
pub const DEFAULT_HEAD_ROWS: usize = 10;

/// Maximum row count for head operations
pub const MAX_HEAD_ROWS: usize = 5000;

/// Default row count for tail operations
pub const DEFAULT_TAIL_ROWS: usize = 10;

/// Maximum row count for tail operations
pub const MAX_TAIL_ROWS: usize = 5000;

/// Default maximum results for search operations
pub const DEFAULT_SEARCH_RESULTS: usize = 100;

/// Maximum results for search operations
pub const MAX_SEARCH_RESULTS: usize = 1000;

/// Maximum size of a serialised tool-server response (5 MiB)
pub const MAX_RESPONSE_BYTES: usize = 5 * 1024 * 1024;

/// Maximum file size accepted for write operations (50 MiB)
pub const MAX_WRITE_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Maximum rows per append/insert/delete call
pub const MAX_WRITE_ROWS: usize = 1000;

/// Maximum cells per range-write call
pub const MAX_WRITE_RANGE_CELLS: usize = 10_000;

/// Maximum rows when creating a new file
pub const MAX_CREATE_FILE_ROWS: usize = 10_000;

/// Clamp a requested count: zero or negative falls back to the default,
/// oversize is silently reduced to the maximum.
pub fn clamp_count(requested: i64, default: usize, max: usize) -> usize {
    if requested <= 0 {
        default
    } else {
        (requested as usize).min(max)
    }
}

/// Clamp for search result counts, where zero means "unlimited within the
/// cap" rather than "use the default".
pub fn clamp_search_results(requested: i64) -> usize {
    if requested < 0 {
        DEFAULT_SEARCH_RESULTS
    } else if requested == 0 {
        MAX_SEARCH_RESULTS
    } else {
        (requested as usize).min(MAX_SEARCH_RESULTS)
    }
}
