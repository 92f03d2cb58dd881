//! Pagination metadata shared by response envelopes.
//!
//! Handlers that return a page of results attach a `meta` object to their
//! payload. The response boundary lifts that object into the envelope's
//! top-level `meta` field, so its shape is fixed here: every field is
//! optional and serialised in camelCase, and unknown keys are rejected.
//!
//! ```
//! use pagination::PaginationMeta;
//!
//! let meta = PaginationMeta::for_page(2, 10, 45).expect("page size is non-zero");
//! assert_eq!(meta.total_pages, Some(5));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors raised while deriving pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// A page size of zero cannot partition any result set.
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    /// Pages are numbered from one.
    #[error("page numbers start at 1, got {page}")]
    ZeroPage {
        /// The rejected page number.
        page: u64,
    },
}

/// Pagination descriptor carried in the `meta` field of a success envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaginationMeta {
    /// One-based page number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Number of results per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 10)]
    pub page_size: Option<u64>,
    /// Total number of pages available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 5)]
    pub total_pages: Option<u64>,
    /// Total number of results across all pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 50)]
    pub total_results: Option<u64>,
}

impl PaginationMeta {
    /// Describe `page` of a result set holding `total_results` items split
    /// into pages of `page_size`.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::ZeroPageSize`] when `page_size` is zero and
    /// [`PaginationError::ZeroPage`] when `page` is zero.
    pub fn for_page(
        page: u64,
        page_size: u64,
        total_results: u64,
    ) -> Result<Self, PaginationError> {
        if page_size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }
        if page == 0 {
            return Err(PaginationError::ZeroPage { page });
        }
        Ok(Self {
            page: Some(page),
            page_size: Some(page_size),
            total_pages: Some(total_results.div_ceil(page_size)),
            total_results: Some(total_results),
        })
    }

    /// Interpret an arbitrary JSON value as pagination metadata.
    ///
    /// Returns `None` when the value is not a well-formed descriptor, for
    /// example when it carries unknown keys or non-integer counts.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Zero-based offset of the first item on the described page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        match (self.page, self.page_size) {
            (Some(page), Some(size)) => page.saturating_sub(1).saturating_mul(size),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(1, 10, 0, 0)]
    #[case(1, 10, 10, 1)]
    #[case(3, 10, 21, 3)]
    #[case(1, 7, 50, 8)]
    fn total_pages_rounds_up(
        #[case] page: u64,
        #[case] size: u64,
        #[case] total: u64,
        #[case] expected: u64,
    ) {
        let meta = PaginationMeta::for_page(page, size, total).expect("valid page");
        assert_eq!(meta.total_pages, Some(expected));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert_eq!(
            PaginationMeta::for_page(1, 0, 10),
            Err(PaginationError::ZeroPageSize)
        );
    }

    #[test]
    fn zero_page_is_rejected() {
        assert_eq!(
            PaginationMeta::for_page(0, 10, 10),
            Err(PaginationError::ZeroPage { page: 0 })
        );
    }

    #[test]
    fn serialises_only_present_fields_in_camel_case() {
        let meta = PaginationMeta {
            page: Some(1),
            page_size: Some(10),
            ..PaginationMeta::default()
        };
        assert_eq!(
            serde_json::to_value(meta).expect("serialise"),
            json!({ "page": 1, "pageSize": 10 })
        );
    }

    #[rstest]
    #[case::unknown_key(json!({ "page": 1, "cursor": "abc" }))]
    #[case::negative(json!({ "page": -1 }))]
    #[case::fractional(json!({ "pageSize": 2.5 }))]
    #[case::not_an_object(json!("page 1"))]
    fn malformed_values_are_not_metadata(#[case] value: Value) {
        assert!(PaginationMeta::from_value(&value).is_none());
    }

    #[test]
    fn offset_counts_items_before_the_page() {
        let meta = PaginationMeta::for_page(3, 20, 100).expect("valid page");
        assert_eq!(meta.offset(), 40);
        assert_eq!(PaginationMeta::default().offset(), 0);
    }
}
