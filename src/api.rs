//! Access to the issue tracker and test plan services.
//!
//! The loaders consume [`IssueApi`]; [`RestClient`] implements it over HTTP.
//! Every call answers `None` on any transport, authentication or status
//! failure, leaving the caller to skip the affected record.

use serde_json::Value;

use crate::domain::Level;

/// HTTP client and transport.
pub mod client;
pub use client::{ClientError, HttpTransport, RestClient, Transport};

/// Mapping of responses onto domain records.
pub mod record;
pub use record::RecordError;

#[cfg(test)]
pub(crate) mod mock;

/// The service calls the loaders depend on.
pub trait IssueApi {
    /// Searches for the root SF by keyword.
    fn search_sf(&mut self, keyword: &str) -> Option<Value>;

    /// Fetches the detail record of an issue at the given level.
    fn issue_detail(&mut self, level: Level, id: &str) -> Option<Value>;

    /// Fetches one page of the test case listing.
    fn list_test_cases(&mut self, offset: usize, limit: usize) -> Option<Value>;

    /// Fetches the detail record of a test case by number.
    fn test_case_detail(&mut self, number: &str) -> Option<Value>;
}
