//! Canonical success envelope.

use pagination::PaginationMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;

/// Reserved key lifted out of handler results into the envelope.
pub const META_KEY: &str = "meta";

/// Shape of every successful API response.
///
/// ## Invariants
/// - `meta` is either absent or a well-formed [`PaginationMeta`].
/// - `data` never contains a well-formed `meta` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope {
    /// HTTP status of the response.
    #[schema(example = 200)]
    pub status_code: u16,
    /// Handler result with any pagination metadata removed.
    #[schema(value_type = Object, example = "Hello World!")]
    pub data: Value,
    /// Pagination metadata lifted from the handler result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl SuccessEnvelope {
    /// Wrap a handler result produced with `status_code`.
    ///
    /// Only objects can carry metadata: primitives and arrays become `data`
    /// unchanged. A `null` meta is dropped. A meta value that is not a
    /// pagination descriptor is left in `data` and logged.
    ///
    /// # Examples
    /// ```
    /// use microservice::inbound::http::SuccessEnvelope;
    /// use serde_json::json;
    ///
    /// let envelope = SuccessEnvelope::wrap(
    ///     200,
    ///     json!({ "items": [1, 2], "meta": { "page": 1, "pageSize": 2 } }),
    /// );
    /// assert_eq!(envelope.data, json!({ "items": [1, 2] }));
    /// assert_eq!(envelope.meta.and_then(|meta| meta.page), Some(1));
    /// ```
    #[must_use]
    pub fn wrap(status_code: u16, result: Value) -> Self {
        let mut fields = match result {
            Value::Object(fields) => fields,
            other => {
                return Self {
                    status_code,
                    data: other,
                    meta: None,
                };
            }
        };

        let meta = match fields.remove(META_KEY) {
            None | Some(Value::Null) => None,
            Some(raw) => match PaginationMeta::from_value(&raw) {
                Some(meta) => Some(meta),
                None => {
                    warn!(meta = %raw, "Leaving malformed pagination metadata in response data");
                    fields.insert(META_KEY.to_owned(), raw);
                    None
                }
            },
        };

        Self {
            status_code,
            data: Value::Object(fields),
            meta,
        }
    }
}
