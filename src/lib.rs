//! Requirement Traceability Reports
//!
//! Fetches an SF → IR → SR → AR requirement hierarchy and its test cases from
//! an issue tracking service and renders them as a static, cross-linked HTML
//! report.
//!
//! The hierarchy is rebuilt from flat detail responses: each level's detail
//! lists the ids of the next level down, and requirement identifiers
//! (`HLR_OS_01`, `HLR_OS_01_02`, `LLR_OS_01_02_03`) are derived from the
//! tokens embedded in AR titles. See [`pipeline::run`] for the full run.

pub mod domain;
pub use domain::{Config, Hierarchy, Level, NodeRef, Registry, TestCase, TestSuite};

pub mod api;
pub use api::{IssueApi, RestClient};

/// Filesystem placement of the generated report.
pub mod storage;
pub use storage::{Layout, relative_path};

pub mod loader;
pub use loader::{LevelSummary, LoadError, Loader};

pub mod render;
pub use render::{RenderSummary, render_all};

pub mod pipeline;
pub use pipeline::Report;
