//! Loading the requirement tree and the test suite through an [`IssueApi`].
//!
//! The tree is loaded level by level: the root SF by keyword, then the
//! details of every IR, SR and AR in tree order. Each successful detail load
//! attaches the stubs of the next level down and reserves the node's output
//! files. AR loads also derive the requirement identifiers of the AR and its
//! ancestors. Test cases are paged in afterwards and linked to the ARs.

use std::{thread, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::instrument;

use crate::{
    api::{
        IssueApi,
        record::{self, PLACEHOLDER_SR_ID, RecordError},
    },
    domain::{
        ArKey, ArLink, Config, Hierarchy, IrKey, Level, NodeRef, Registry, SrKey, TestCaseDetail,
        TestSuite,
    },
    storage::Layout,
};

const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Errors raised while loading a single record.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The service gave no usable answer.
    #[error("no response for {level} {id}")]
    NoResponse {
        /// Level of the record.
        level: Level,
        /// API id of the record.
        id: String,
    },

    /// The answer could not be mapped.
    #[error("{level} {id}: {source}")]
    Record {
        /// Level of the record.
        level: Level,
        /// API id of the record.
        id: String,
        /// Mapping error.
        #[source]
        source: RecordError,
    },

    /// The keyword search found no SF.
    #[error("no SF found for keyword '{0}'")]
    NoRoot(String),

    /// The first page of the test case listing was unavailable or carried no
    /// total.
    #[error("the test case listing is unavailable")]
    NoListing,

    /// Paging finished without accepting a single test case.
    #[error("no test case was accepted")]
    EmptySuite,

    /// A test case detail could not be loaded.
    #[error("test case {number}: {reason}")]
    TestCase {
        /// Test case number.
        number: String,
        /// What went wrong.
        reason: String,
    },
}

/// Outcome of a level pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSummary {
    /// The level loaded.
    pub level: Level,
    /// Nodes whose detail load was attempted.
    pub attempted: usize,
    /// Nodes whose detail loaded.
    pub succeeded: usize,
}

impl LevelSummary {
    /// A pass succeeds when there was nothing to load or at least one load
    /// succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.attempted == 0 || self.succeeded > 0
    }
}

/// Loads records through an [`IssueApi`] into a [`Hierarchy`] and a
/// [`TestSuite`].
#[derive(Debug)]
pub struct Loader<'a, A> {
    api: &'a mut A,
    layout: &'a Layout,
    registry: &'a mut Registry,
    page_size: usize,
    pacing: Duration,
    progress: bool,
}

impl<'a, A: IssueApi> Loader<'a, A> {
    /// A loader with the default page size and pacing.
    pub fn new(api: &'a mut A, layout: &'a Layout, registry: &'a mut Registry) -> Self {
        Self {
            api,
            layout,
            registry,
            page_size: DEFAULT_PAGE_SIZE,
            pacing: DEFAULT_PACING,
            progress: false,
        }
    }

    /// Takes the page size and pacing from the configuration.
    #[must_use]
    pub fn with_config(mut self, config: &Config) -> Self {
        self.page_size = config.page_size.max(1);
        self.pacing = config.pacing();
        self
    }

    /// Shows a progress bar while test case details load.
    #[must_use]
    pub const fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Finds the root SF by keyword and loads its detail.
    ///
    /// The returned tree holds the SF and stubs for its IRs. The SF's output
    /// files are reserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the search or the detail load fails.
    #[instrument(skip(self))]
    pub fn load_root(&mut self, keyword: &str) -> Result<Hierarchy, LoadError> {
        let response = self
            .api
            .search_sf(keyword)
            .ok_or_else(|| LoadError::NoRoot(keyword.to_string()))?;
        let summary = record::parse_sf_search(&response).map_err(|source| LoadError::Record {
            level: Level::Sf,
            id: keyword.to_string(),
            source,
        })?;
        if summary.id.is_empty() {
            return Err(LoadError::NoRoot(keyword.to_string()));
        }

        let mut tree = Hierarchy::new(summary.id.as_str());
        tree.sf_mut().detail = summary.detail;
        for id in summary.ir_ids {
            tree.attach_ir(id);
        }

        let response = self.fetch(Level::Sf, &summary.id)?;
        let extras = record::parse_sf_detail(&response).map_err(|source| LoadError::Record {
            level: Level::Sf,
            id: summary.id.clone(),
            source,
        })?;
        let sf = &mut tree.sf_mut().detail;
        sf.description = extras.description;
        sf.plan_start_date = extras.plan_start_date;
        sf.plan_end_date = extras.plan_end_date;

        tracing::info!(
            "found SF '{}' with {} IRs",
            tree.sf().detail.title,
            tree.ir_count()
        );
        if let Err(e) = self.layout.create_html_files(&tree, NodeRef::Sf) {
            tracing::warn!("{e}");
        }
        Ok(tree)
    }

    /// Loads an IR's detail and attaches stubs for its SRs.
    ///
    /// # Errors
    ///
    /// Returns an error if the detail cannot be fetched or mapped.
    pub fn load_ir_detail(&mut self, tree: &mut Hierarchy, key: IrKey) -> Result<(), LoadError> {
        let id = tree.ir(key).id().to_string();
        let record = self.fetch_issue(Level::Ir, &id)?;
        tree.ir_mut(key).detail = record.detail;
        for child in record.children {
            if child == PLACEHOLDER_SR_ID {
                tracing::debug!("IR {id}: skipping placeholder SR {child}");
                continue;
            }
            tree.attach_sr(key, child);
        }
        Ok(())
    }

    /// Loads an SR's detail and attaches stubs for its ARs.
    ///
    /// # Errors
    ///
    /// Returns an error if the detail cannot be fetched or mapped.
    pub fn load_sr_detail(&mut self, tree: &mut Hierarchy, key: SrKey) -> Result<(), LoadError> {
        let id = tree.sr(key).id().to_string();
        let record = self.fetch_issue(Level::Sr, &id)?;
        tree.sr_mut(key).detail = record.detail;
        for child in record.children {
            tree.attach_ar(key, child);
        }
        Ok(())
    }

    /// Loads an AR's detail and derives requirement identifiers from its
    /// title.
    ///
    /// A title without a well-formed token is logged; the load still counts
    /// as successful.
    ///
    /// # Errors
    ///
    /// Returns an error if the detail cannot be fetched or mapped.
    pub fn load_ar_detail(&mut self, tree: &mut Hierarchy, key: ArKey) -> Result<(), LoadError> {
        let id = tree.ar(key).id().to_string();
        let record = self.fetch_issue(Level::Ar, &id)?;
        tree.ar_mut(key).detail = record.detail;
        if let Err(e) = tree.derive_req_ids(key, self.registry) {
            tracing::warn!("AR {id}: {e}");
        }
        Ok(())
    }

    /// Loads the detail of every IR.
    #[instrument(skip_all)]
    pub fn update_all_irs(&mut self, tree: &mut Hierarchy) -> LevelSummary {
        let keys = tree.ir_keys();
        self.run_level(tree, Level::Ir, keys, Self::load_ir_detail)
    }

    /// Loads the detail of every SR.
    #[instrument(skip_all)]
    pub fn update_all_srs(&mut self, tree: &mut Hierarchy) -> LevelSummary {
        let keys = tree.sr_keys();
        self.run_level(tree, Level::Sr, keys, Self::load_sr_detail)
    }

    /// Loads the detail of every AR, then sorts the whole tree.
    #[instrument(skip_all)]
    pub fn update_all_ars(&mut self, tree: &mut Hierarchy) -> LevelSummary {
        let keys = tree.ar_keys();
        let summary = self.run_level(tree, Level::Ar, keys, Self::load_ar_detail);
        tree.sort_all();
        summary
    }

    fn run_level<K: Copy + Into<NodeRef>>(
        &mut self,
        tree: &mut Hierarchy,
        level: Level,
        keys: Vec<K>,
        mut load: impl FnMut(&mut Self, &mut Hierarchy, K) -> Result<(), LoadError>,
    ) -> LevelSummary {
        let mut summary = LevelSummary {
            level,
            attempted: keys.len(),
            succeeded: 0,
        };
        if keys.is_empty() {
            tracing::info!("no {level} to load");
            return summary;
        }

        tracing::info!("loading {} {level} details", keys.len());
        for key in keys {
            match load(self, tree, key) {
                Ok(()) => {
                    summary.succeeded += 1;
                    if let Err(e) = self.layout.create_html_files(tree, key.into()) {
                        tracing::warn!("{e}");
                    }
                }
                Err(e) => tracing::warn!("{e}"),
            }
        }

        tracing::info!(
            "{level} details loaded: {}/{}",
            summary.succeeded,
            summary.attempted
        );
        summary
    }

    /// Pages through the test case listing, links cases to ARs and loads
    /// every case's detail.
    ///
    /// Pages that fail or yield nothing are skipped. Detail failures are
    /// logged. The suite comes back sorted by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the first page is unavailable, or if no case was
    /// accepted.
    #[instrument(skip_all)]
    pub fn load_test_suite(&mut self, tree: &mut Hierarchy) -> Result<TestSuite, LoadError> {
        let mut suite = TestSuite::new();

        let first = self
            .api
            .list_test_cases(0, self.page_size)
            .map(|response| record::parse_test_case_page(&response))
            .ok_or(LoadError::NoListing)?;
        suite.total = first.total.unwrap_or_else(|| {
            tracing::warn!("test case listing reports no total, reading the first page only");
            0
        });

        let pages = suite.total.div_ceil(self.page_size);
        tracing::info!("{} test cases in {pages} pages", suite.total);
        self.accept_page(tree, &mut suite, 1, &first.values);

        for page in 1..pages {
            let offset = page * self.page_size;
            match self.api.list_test_cases(offset, self.page_size) {
                Some(response) => {
                    let values = record::parse_test_case_page(&response).values;
                    self.accept_page(tree, &mut suite, page + 1, &values);
                }
                None => tracing::warn!("test case page {} unavailable, skipping", page + 1),
            }
        }

        if suite.is_empty() {
            return Err(LoadError::EmptySuite);
        }
        tracing::info!(
            "accepted {} test cases, {} linked to ARs",
            suite.len(),
            suite.linked_count()
        );

        self.load_test_case_details(&mut suite);
        suite.sort_by_number();
        Ok(suite)
    }

    fn accept_page(
        &mut self,
        tree: &mut Hierarchy,
        suite: &mut TestSuite,
        page: usize,
        values: &[serde_json::Value],
    ) -> usize {
        let mut accepted = 0;
        for value in values {
            let listed = match record::parse_listed_test_case(value) {
                Ok(listed) => listed,
                Err(e) => {
                    tracing::warn!("skipping test case: {e}");
                    continue;
                }
            };

            let mut case = listed.case;
            let ar = listed
                .ar_id
                .as_deref()
                .and_then(|id| self.registry.ar_by_id(id));
            match (ar, listed.ar_id.as_deref()) {
                (Some(ar), _) => case.link = Some(ar_link(tree, ar)),
                (None, Some(ar_id)) => {
                    tracing::info!("test case {}: AR {ar_id} not found", case.number);
                }
                (None, None) => tracing::debug!("test case {} has no AR", case.number),
            }

            let number = case.number.clone();
            let link = case.link.as_ref().map(|link| link.ar);
            let key = suite.push(case);
            if let Some(ar) = link {
                tree.link_test_case(ar, key);
            }
            self.registry.register_test_case(&number, key);
            accepted += 1;
        }

        if accepted == 0 {
            tracing::warn!("test case page {page} yielded no accepted cases");
        } else {
            tracing::debug!("test case page {page}: {accepted}/{} accepted", values.len());
        }
        accepted
    }

    /// Loads every case's detail in listing order, pausing between requests.
    /// Returns the number of details loaded.
    fn load_test_case_details(&mut self, suite: &mut TestSuite) -> usize {
        let keys = suite.keys().to_vec();
        let bar = if self.progress {
            progress_bar(keys.len())
        } else {
            ProgressBar::hidden()
        };

        let mut loaded = 0;
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
            let number = suite.get(key).number.clone();
            bar.set_message(number.clone());
            match self.fetch_test_case_detail(&number) {
                Ok(detail) => {
                    suite.get_mut(key).detail = Some(detail);
                    loaded += 1;
                }
                Err(e) => tracing::warn!("{e}"),
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        tracing::info!("test case details loaded: {loaded}/{}", suite.len());
        loaded
    }

    fn fetch_test_case_detail(
        &mut self,
        number: &str,
    ) -> Result<TestCaseDetail, LoadError> {
        let response =
            self.api
                .test_case_detail(number)
                .ok_or_else(|| LoadError::TestCase {
                    number: number.to_string(),
                    reason: "no response".to_string(),
                })?;
        record::parse_test_case_detail(&response).map_err(|e| LoadError::TestCase {
            number: number.to_string(),
            reason: e.to_string(),
        })
    }

    fn fetch(&mut self, level: Level, id: &str) -> Result<serde_json::Value, LoadError> {
        self.api
            .issue_detail(level, id)
            .ok_or_else(|| LoadError::NoResponse {
                level,
                id: id.to_string(),
            })
    }

    fn fetch_issue(&mut self, level: Level, id: &str) -> Result<record::IssueRecord, LoadError> {
        let response = self.fetch(level, id)?;
        record::parse_issue_detail(&response).map_err(|source| LoadError::Record {
            level,
            id: id.to_string(),
            source,
        })
    }
}

fn ar_link(tree: &Hierarchy, ar: ArKey) -> ArLink {
    let (sr, ir) = tree.ancestry(ar);
    let node = tree.ar(ar);
    ArLink {
        ar,
        ar_title: node.detail.title.clone(),
        ar_req_id: node.req_id.clone(),
        sr_req_id: tree.sr(sr).req_id.clone(),
        ir_req_id: tree.ir(ir).req_id.clone(),
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    match ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        Ok(style) => bar.set_style(style),
        Err(e) => tracing::debug!("progress style rejected: {e}"),
    }
    bar
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::mock::{MockApi, listed_case};

    fn api() -> MockApi {
        MockApi::new()
            .with_sf("sf", "uCOS-III", &["ir1"])
            .with_issue(Level::Ir, "ir1", "任务管理", &["sr1", PLACEHOLDER_SR_ID])
            .with_issue(Level::Sr, "sr1", "任务创建", &["ar2", "ar1"])
            .with_issue(Level::Ar, "ar1", "LLR_OS_01_02_01创建任务", &[])
            .with_issue(Level::Ar, "ar2", "LLR_OS_01_02_02删除任务", &[])
    }

    fn quiet(config: &mut Config) {
        config.set_pacing(Duration::ZERO);
        config.page_size = 2;
    }

    fn load_tree(api: &mut MockApi, layout: &Layout, registry: &mut Registry) -> Hierarchy {
        let mut config = Config::default();
        quiet(&mut config);
        let mut loader = Loader::new(api, layout, registry).with_config(&config);
        let mut tree = loader.load_root("uCOS-III").unwrap();
        assert!(loader.update_all_irs(&mut tree).is_success());
        assert!(loader.update_all_srs(&mut tree).is_success());
        assert!(loader.update_all_ars(&mut tree).is_success());
        tree
    }

    #[test]
    fn levels_load_in_order_and_derive_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let mut registry = Registry::new();
        let mut api = api();

        let tree = load_tree(&mut api, &layout, &mut registry);

        assert_eq!(tree.ir_count(), 1);
        assert_eq!(tree.sr_count(), 1, "placeholder SR is skipped");
        let ir = tree.ir_keys()[0];
        let sr = tree.sr_keys()[0];
        assert_eq!(tree.ir(ir).req_id, "HLR_OS_01");
        assert_eq!(tree.sr(sr).req_id, "HLR_OS_01_02");
        let ordered: Vec<_> = tree
            .ar_keys()
            .into_iter()
            .map(|ar| tree.ar(ar).req_id.clone())
            .collect();
        assert_eq!(ordered, ["LLR_OS_01_02_01", "LLR_OS_01_02_02"]);
        assert!(tree.sf().files().is_some());
        assert!(tree.ar_keys().iter().all(|ar| tree.ar(*ar).files().is_some()));
        assert_eq!(api.calls_to("detail"), 5);
    }

    #[test]
    fn failed_detail_leaves_subtree_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let mut registry = Registry::new();
        let mut api = MockApi::new()
            .with_sf("sf", "uCOS-III", &["ir1", "missing"])
            .with_issue(Level::Ir, "ir1", "任务管理", &[]);
        let mut loader = Loader::new(&mut api, &layout, &mut registry);

        let mut tree = loader.load_root("uCOS-III").unwrap();
        let irs = loader.update_all_irs(&mut tree);
        let srs = loader.update_all_srs(&mut tree);

        assert_eq!(irs.attempted, 2);
        assert_eq!(irs.succeeded, 1);
        assert!(irs.is_success());
        assert_eq!(srs.attempted, 0);
        assert!(srs.is_success());
        let missing = tree.ir_keys()[1];
        assert!(tree.ir(missing).files().is_none());
    }

    #[test]
    fn level_with_only_failures_is_not_a_success() {
        let summary = LevelSummary {
            level: Level::Ar,
            attempted: 3,
            succeeded: 0,
        };
        assert!(!summary.is_success());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let mut registry = Registry::new();
        let mut api = MockApi::new();

        let result = Loader::new(&mut api, &layout, &mut registry).load_root("nothing");
        assert!(matches!(result, Err(LoadError::NoRoot(_))));
    }

    #[test]
    fn test_suite_pages_link_and_skip() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let mut registry = Registry::new();
        let mut api = api()
            .with_page(
                0,
                5,
                vec![
                    listed_case("tc_OS_01_02_01_02", Some("ar1")),
                    listed_case("tc_NET_01", Some("ar1")),
                ],
            )
            .with_page(
                4,
                5,
                vec![
                    listed_case("tc_OS_01_02_01_01", Some("ar1")),
                    listed_case("tc_OS_09_01_01_01", Some("unknown")),
                ],
            )
            .with_test_case_detail("tc_OS_01_02_01_01", &[("step", "ok")]);
        let mut tree = load_tree(&mut api, &layout, &mut registry);

        let mut config = Config::default();
        quiet(&mut config);
        let suite = Loader::new(&mut api, &layout, &mut registry)
            .with_config(&config)
            .load_test_suite(&mut tree)
            .unwrap();

        assert_eq!(suite.total, 5);
        assert_eq!(suite.len(), 3);
        assert_eq!(suite.linked_count(), 2);
        let numbers: Vec<_> = suite.iter().map(|c| c.number.as_str()).collect();
        assert_eq!(
            numbers,
            ["tc_OS_01_02_01_01", "tc_OS_01_02_01_02", "tc_OS_09_01_01_01"]
        );

        let ar1 = registry.ar_by_id("ar1").unwrap();
        assert_eq!(tree.ar(ar1).children().len(), 2);
        let first = suite.get(suite.keys()[0]);
        let link = first.link.as_ref().unwrap();
        assert_eq!(link.ar_req_id, "LLR_OS_01_02_01");
        assert_eq!(link.sr_req_id, "HLR_OS_01_02");
        assert_eq!(link.ir_req_id, "HLR_OS_01");
        assert_eq!(first.detail.as_ref().unwrap().steps(), ["step"]);
        assert!(suite.get(suite.keys()[1]).detail.is_none());
        assert!(registry.test_case("tc_OS_09_01_01_01").is_some());
        assert_eq!(api.calls_to("list"), 3);
        assert_eq!(api.calls_to("tc "), 3);
    }

    #[test]
    fn suite_without_accepted_cases_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let mut registry = Registry::new();
        let mut api =
            MockApi::new().with_page(0, 1, vec![json!({ "number": "tc_NET_01" })]);
        let mut tree = Hierarchy::new("sf");

        let result = Loader::new(&mut api, &layout, &mut registry).load_test_suite(&mut tree);
        assert!(matches!(result, Err(LoadError::EmptySuite)));
    }

    #[test]
    fn unavailable_listing_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let mut registry = Registry::new();
        let mut api = MockApi::new();
        let mut tree = Hierarchy::new("sf");

        let result = Loader::new(&mut api, &layout, &mut registry).load_test_suite(&mut tree);
        assert!(matches!(result, Err(LoadError::NoListing)));
    }

    #[test]
    fn listing_without_total_keeps_the_first_page() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let mut registry = Registry::new();
        let mut api = MockApi::new().with_raw_page(
            0,
            json!({ "values": [listed_case("tc_OS_01_01_01_01", None)] }),
        );
        let mut tree = Hierarchy::new("sf");
        let mut config = Config::default();
        quiet(&mut config);

        let suite = Loader::new(&mut api, &layout, &mut registry)
            .with_config(&config)
            .load_test_suite(&mut tree)
            .unwrap();

        assert_eq!(suite.total, 0);
        assert_eq!(suite.len(), 1);
        assert_eq!(api.calls_to("list"), 1);
    }

    #[test]
    fn later_page_rescues_a_rejected_first_page() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let mut registry = Registry::new();
        let mut api = MockApi::new()
            .with_page(0, 2, vec![listed_case("tc_NET_01", None)])
            .with_page(1, 2, vec![listed_case("tc_OS_01_01_01_01", None)]);
        let mut tree = Hierarchy::new("sf");
        let mut config = Config::default();
        config.set_pacing(Duration::ZERO);
        config.page_size = 1;

        let suite = Loader::new(&mut api, &layout, &mut registry)
            .with_config(&config)
            .load_test_suite(&mut tree)
            .unwrap();

        assert_eq!(suite.len(), 1);
        assert_eq!(suite.get(suite.keys()[0]).number, "tc_OS_01_01_01_01");
        assert_eq!(api.calls_to("list"), 2);
    }
}
