//! The `{ "data": ... }` envelope shared by the catalog, authoring, and
//! playback routes.

use serde::Serialize;

/// Wraps a response payload as `{ "data": T }`.
///
/// Handlers return typed rows and session views through this envelope so the
/// wire shape stays uniform; error responses use the `{ "error", "code",
/// "state_changed" }` shape from [`crate::error::AppError`] instead.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
