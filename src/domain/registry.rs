//! Run-scoped lookup tables from identifiers to node handles.

use std::collections::HashMap;

use crate::domain::node::{ArKey, IrKey, SrKey, TestCaseKey};

/// Lookup tables populated while the hierarchy and test suite load.
///
/// The tables are independent: registering an AR by its API id does not
/// register it by requirement identifier, and vice versa. A later
/// registration under an existing identifier replaces the earlier one.
#[derive(Debug, Default)]
pub struct Registry {
    ir_by_req_id: HashMap<String, IrKey>,
    sr_by_req_id: HashMap<String, SrKey>,
    ar_by_id: HashMap<String, ArKey>,
    ar_by_req_id: HashMap<String, ArKey>,
    test_case_by_number: HashMap<String, TestCaseKey>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an IR under its requirement identifier.
    pub fn register_ir(&mut self, req_id: &str, key: IrKey) {
        insert(&mut self.ir_by_req_id, req_id, key);
    }

    /// Registers an SR under its requirement identifier.
    pub fn register_sr(&mut self, req_id: &str, key: SrKey) {
        insert(&mut self.sr_by_req_id, req_id, key);
    }

    /// Registers an AR under its API id and, if non-empty, its requirement
    /// identifier.
    pub fn register_ar(&mut self, id: &str, req_id: &str, key: ArKey) {
        insert(&mut self.ar_by_id, id, key);
        insert(&mut self.ar_by_req_id, req_id, key);
    }

    /// Registers a test case under its number.
    pub fn register_test_case(&mut self, number: &str, key: TestCaseKey) {
        insert(&mut self.test_case_by_number, number, key);
    }

    /// Looks up an IR by requirement identifier.
    #[must_use]
    pub fn ir(&self, req_id: &str) -> Option<IrKey> {
        self.ir_by_req_id.get(req_id).copied()
    }

    /// Looks up an SR by requirement identifier.
    #[must_use]
    pub fn sr(&self, req_id: &str) -> Option<SrKey> {
        self.sr_by_req_id.get(req_id).copied()
    }

    /// Looks up an AR by API id.
    #[must_use]
    pub fn ar_by_id(&self, id: &str) -> Option<ArKey> {
        self.ar_by_id.get(id).copied()
    }

    /// Looks up an AR by requirement identifier.
    #[must_use]
    pub fn ar(&self, req_id: &str) -> Option<ArKey> {
        self.ar_by_req_id.get(req_id).copied()
    }

    /// Looks up a test case by number.
    #[must_use]
    pub fn test_case(&self, number: &str) -> Option<TestCaseKey> {
        self.test_case_by_number.get(number).copied()
    }

    /// The number of registered ARs, counted by API id.
    #[must_use]
    pub fn ar_count(&self) -> usize {
        self.ar_by_id.len()
    }
}

fn insert<K: Copy + std::fmt::Debug>(map: &mut HashMap<String, K>, id: &str, key: K) {
    if id.is_empty() {
        return;
    }
    if let Some(previous) = map.insert(id.to_string(), key) {
        tracing::debug!("registry entry '{id}' moved from {previous:?} to {key:?}");
    }
}
