//! Shared response envelope for catalog endpoints.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// `POST /generate-video` keeps its own flat shape for browser clients;
/// everything else is wrapped.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
