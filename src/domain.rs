//! Domain models for requirement traceability.
//!
//! This module contains the requirement tree, its identifiers, the test
//! suite linked to it and the run configuration.

mod config;
pub use config::{Config, DEFAULT_FILE_NAME as DEFAULT_CONFIG_FILE, PASSWORD_ENV};

/// Node records shared by every requirement level.
pub mod node;
pub use node::{
    Ar, ArKey, Detail, Ir, IrKey, Level, Node, NodeFiles, NodeRef, Root, Sf, Sr, SrKey,
    TestCaseKey,
};

mod hierarchy;
pub use hierarchy::{Derived, Hierarchy};

mod registry;
pub use registry::Registry;

/// Requirement identifier tokens and sort keys.
pub mod req_id;
pub use req_id::{Error as ReqIdError, LlrToken, SortKey};

/// Test cases and test suites.
pub mod test_case;
pub use test_case::{ArLink, TestCase, TestCaseDetail, TestSuite};
