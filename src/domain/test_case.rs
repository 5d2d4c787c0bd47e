//! Test cases and the suite that collects them.

use std::{cell::OnceCell, collections::BTreeMap, path::PathBuf};

use crate::domain::node::{ArKey, TestCaseKey};

/// Prefix every accepted test case number starts with.
pub const NUMBER_PREFIX: &str = "tc_OS_";

/// Separator between flattened test steps and expected results.
pub const STEP_SEPARATOR: &str = "<br><br>";

/// Label used in status counts for cases without a status.
pub const UNKNOWN_STATUS: &str = "未知";

/// The full record of a test case, fetched separately from the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCaseDetail {
    /// Test case id.
    pub id: String,
    /// Test case number.
    pub number: String,
    /// Test case name.
    pub name: String,
    /// Author's display name.
    pub author: String,
    /// Preconditions.
    pub preparation: String,
    /// Steps, flattened with [`STEP_SEPARATOR`].
    pub test_steps: String,
    /// Expected results, flattened with [`STEP_SEPARATOR`].
    pub expected_results: String,
    /// Description.
    pub description: String,
    /// Id of the issue the case belongs to.
    pub issue_id: String,
    /// Name of the issue the case belongs to.
    pub issue_name: String,
}

impl TestCaseDetail {
    /// The individual steps.
    #[must_use]
    pub fn steps(&self) -> Vec<&str> {
        split_flattened(&self.test_steps)
    }

    /// The individual expected results.
    #[must_use]
    pub fn results(&self) -> Vec<&str> {
        split_flattened(&self.expected_results)
    }
}

/// Collapses whitespace in each entry, drops empty entries and joins the rest
/// with [`STEP_SEPARATOR`].
pub fn flatten<'a>(entries: impl IntoIterator<Item = &'a str>) -> String {
    entries
        .into_iter()
        .map(|entry| entry.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join(STEP_SEPARATOR)
}

fn split_flattened(text: &str) -> Vec<&str> {
    text.split(STEP_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// The AR a test case is linked to, with the identifiers shown alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArLink {
    /// The linked AR.
    pub ar: ArKey,
    /// The AR's title.
    pub ar_title: String,
    /// The AR's requirement identifier.
    pub ar_req_id: String,
    /// The owning SR's requirement identifier.
    pub sr_req_id: String,
    /// The owning IR's requirement identifier.
    pub ir_req_id: String,
}

/// A test case as listed by the test plan service.
#[derive(Debug, Clone, Default)]
pub struct TestCase {
    /// Test case id.
    pub id: String,
    /// Test case number, always starting with [`NUMBER_PREFIX`].
    pub number: String,
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Status name.
    pub status: String,
    /// Execution type name.
    pub execution_type: String,
    /// Test type name.
    pub test_type: String,
    /// The full record, once fetched.
    pub detail: Option<TestCaseDetail>,
    /// The linked AR, if any.
    pub link: Option<ArLink>,
    page: OnceCell<PathBuf>,
}

impl TestCase {
    /// The output page, once assigned.
    #[must_use]
    pub fn page(&self) -> Option<&PathBuf> {
        self.page.get()
    }

    /// Assigns the output page. Returns `false` if one was already assigned.
    pub fn assign_page(&self, path: PathBuf) -> bool {
        if self.page.set(path).is_err() {
            tracing::warn!("page for test case {} already assigned", self.number);
            return false;
        }
        true
    }
}

/// The numeric groups after [`NUMBER_PREFIX`], padded or cut to four.
///
/// Numbers without the prefix, and groups that are not integers, read as
/// zero.
#[must_use]
pub fn number_groups(number: &str) -> [u64; 4] {
    let mut groups = [0; 4];
    if let Some(rest) = number.strip_prefix(NUMBER_PREFIX) {
        for (slot, part) in groups.iter_mut().zip(rest.split('_')) {
            *slot = part.parse().unwrap_or(0);
        }
    }
    groups
}

/// The test cases of a run.
///
/// Cases are stored once and addressed by [`TestCaseKey`]; sorting reorders
/// the listing without invalidating keys.
#[derive(Debug, Default)]
pub struct TestSuite {
    cases: Vec<TestCase>,
    order: Vec<TestCaseKey>,

    /// The total reported by the service.
    pub total: usize,
}

impl TestSuite {
    /// Creates an empty suite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a case and returns its key.
    pub fn push(&mut self, case: TestCase) -> TestCaseKey {
        let key = TestCaseKey::new(self.cases.len());
        self.cases.push(case);
        self.order.push(key);
        key
    }

    /// Returns the case for `key`.
    #[must_use]
    pub fn get(&self, key: TestCaseKey) -> &TestCase {
        &self.cases[key.index()]
    }

    /// Returns the case for `key`, mutably.
    pub fn get_mut(&mut self, key: TestCaseKey) -> &mut TestCase {
        &mut self.cases[key.index()]
    }

    /// Keys in listing order.
    #[must_use]
    pub fn keys(&self) -> &[TestCaseKey] {
        &self.order
    }

    /// Cases in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.order.iter().map(|key| &self.cases[key.index()])
    }

    /// The number of accepted cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether no case has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// The number of cases linked to an AR.
    #[must_use]
    pub fn linked_count(&self) -> usize {
        self.cases.iter().filter(|c| c.link.is_some()).count()
    }

    /// Sorts the listing by the numeric groups of each case number.
    pub fn sort_by_number(&mut self) {
        let cases = &self.cases;
        self.order
            .sort_by_cached_key(|key| number_groups(&cases[key.index()].number));
    }

    /// How many cases are in each status.
    #[must_use]
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for case in &self.cases {
            let status = if case.status.is_empty() {
                UNKNOWN_STATUS
            } else {
                case.status.as_str()
            };
            *counts.entry(status.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
