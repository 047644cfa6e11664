//! Defines the endpoints for the HTTP API.

/// The paginated transaction list.
pub const ROOT: &str = "/";

/// Create a single transaction.
pub const ADD_TRANSACTION: &str = "/add-transaction";

/// Partially update a transaction by id.
pub const UPDATE_TRANSACTION: &str = "/update-transaction/{id}";

/// Hard-delete a transaction by id.
pub const DELETE_TRANSACTION: &str = "/delete-transaction/{id}";

/// Soft-delete a transaction by id.
pub const SOFT_DELETE: &str = "/soft-delete/{id}";

/// Restore a soft-deleted transaction by id.
pub const RESTORE: &str = "/restore/{id}";

/// Bulk soft-delete or restore by id list.
pub const DELETE_SELECTED: &str = "/delete-selected";

/// Bulk CSV upload.
pub const UPLOAD_CSV: &str = "/uploadCSV";

/// Search live transactions.
pub const SEARCH: &str = "/search";

/// Yearly summary report.
pub const REPORT: &str = "/report";

/// Download the whole ledger as CSV.
pub const DOWNLOAD: &str = "/download";
