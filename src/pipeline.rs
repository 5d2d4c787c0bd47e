//! The end-to-end run: load the tree and the test suite, place every page,
//! render.

use std::fmt;

use tracing::instrument;

use crate::{
    api::IssueApi,
    domain::{Config, Hierarchy, Registry, TestSuite},
    loader::{LevelSummary, LoadError, Loader},
    render::{self, RenderSummary},
    storage::Layout,
};

/// Everything a run produced.
#[derive(Debug)]
pub struct Report {
    /// The loaded, sorted tree.
    pub tree: Hierarchy,
    /// The loaded test cases; empty if the listing failed.
    pub suite: TestSuite,
    /// One summary per level pass, IR first.
    pub levels: Vec<LevelSummary>,
    /// Files written by the render pass.
    pub render: RenderSummary,
}

impl Report {
    /// Whether every level pass succeeded and every file was written.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.levels.iter().all(LevelSummary::is_success) && self.render.failed == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SF: {}", self.tree.sf().detail.title)?;
        for level in &self.levels {
            writeln!(
                f,
                "{}: {}/{} loaded",
                level.level, level.succeeded, level.attempted
            )?;
        }
        writeln!(
            f,
            "Test cases: {} accepted of {} listed, {} linked to ARs",
            self.suite.len(),
            self.suite.total,
            self.suite.linked_count()
        )?;
        for (status, count) in self.suite.status_counts() {
            writeln!(f, "  {status}: {count}")?;
        }
        write!(
            f,
            "Files: {} written, {} failed",
            self.render.written, self.render.failed
        )
    }
}

/// Runs the whole pipeline against `api`.
///
/// Level passes and the test suite may fail partially or completely; what
/// was loaded is still rendered.
///
/// # Errors
///
/// Returns an error only if the root SF cannot be loaded.
#[instrument(skip_all, fields(keyword = %config.sf_keyword))]
pub fn run<A: IssueApi>(
    api: &mut A,
    config: &Config,
    progress: bool,
) -> Result<Report, LoadError> {
    let layout = Layout::from_config(config);
    let mut registry = Registry::new();
    let mut loader = Loader::new(api, &layout, &mut registry)
        .with_config(config)
        .with_progress(progress);

    let mut tree = loader.load_root(&config.sf_keyword)?;
    let levels = vec![
        loader.update_all_irs(&mut tree),
        loader.update_all_srs(&mut tree),
        loader.update_all_ars(&mut tree),
    ];
    for level in levels.iter().filter(|level| !level.is_success()) {
        tracing::error!(
            "none of {} {} details could be loaded",
            level.attempted,
            level.level
        );
    }

    let suite = loader.load_test_suite(&mut tree).unwrap_or_else(|e| {
        tracing::error!("test cases not loaded: {e}");
        TestSuite::new()
    });

    for &key in suite.keys() {
        if let Err(e) = layout.assign_test_case_page(&tree, &suite, key) {
            tracing::debug!("{e}");
        }
    }

    let render = render::render_all(&tree, &suite);
    Ok(Report {
        tree,
        suite,
        levels,
        render,
    })
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::*;
    use crate::{
        api::mock::{MockApi, listed_case},
        domain::{Level, NodeRef},
    };

    fn config(base: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.base_dir = base.to_path_buf();
        config.set_pacing(Duration::ZERO);
        config
    }

    fn api() -> MockApi {
        MockApi::new()
            .with_sf("sf", "uCOS-III", &["ir"])
            .with_issue(Level::Ir, "ir", "任务管理", &["sr"])
            .with_issue(Level::Sr, "sr", "任务创建", &["ar2", "ar1"])
            .with_issue(Level::Ar, "ar1", "LLR_OS_01_02_01创建任务", &[])
            .with_issue(Level::Ar, "ar2", "LLR_OS_01_02_02删除任务", &[])
    }

    #[test]
    fn end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let mut api = api()
            .with_page(
                0,
                2,
                vec![
                    listed_case("tc_OS_01_02_02_01", Some("ar2")),
                    listed_case("tc_OS_01_02_01_01", Some("ar1")),
                ],
            )
            .with_test_case_detail("tc_OS_01_02_01_01", &[("创建", "成功")]);

        let report = run(&mut api, &config(tmp.path()), false).unwrap();

        let tree = &report.tree;
        let ir = tree.ir_keys()[0];
        let sr = tree.sr_keys()[0];
        assert_eq!(tree.ir(ir).req_id, "HLR_OS_01");
        assert_eq!(tree.sr(sr).req_id, "HLR_OS_01_02");
        let ars: Vec<_> = tree
            .ar_keys()
            .into_iter()
            .map(|ar| tree.ar(ar).req_id.as_str())
            .collect();
        assert_eq!(ars, ["LLR_OS_01_02_01", "LLR_OS_01_02_02"]);

        assert!(report.is_clean());
        assert_eq!(report.suite.linked_count(), 2);
        assert!(report.suite.iter().all(|case| case.page().is_some()));

        let table = tree.files(sr.into()).unwrap().table.clone().unwrap();
        let table = fs::read_to_string(table).unwrap();
        let first = table.find("LLR_OS_01_02_01").unwrap();
        let second = table.find("LLR_OS_01_02_02").unwrap();
        assert!(first < second);

        let sf = tree.files(NodeRef::Sf).unwrap();
        assert!(sf.page.starts_with(tmp.path().join("requirement")));
        assert!(fs::read_to_string(&sf.page).unwrap().contains("任务管理/任务管理.html"));

        let summary = report.to_string();
        assert!(summary.contains("AR: 2/2 loaded"));
        assert!(summary.contains("Test cases: 2 accepted of 2 listed, 2 linked to ARs"));
        assert!(summary.contains("通过: 2"));
    }

    #[test]
    fn missing_root_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let mut api = MockApi::new();

        let result = run(&mut api, &config(tmp.path()), false);

        assert!(matches!(result, Err(LoadError::NoRoot(_))));
        assert_eq!(api.calls, ["search uCOS-III"]);
    }

    #[test]
    fn renders_without_test_cases() {
        let tmp = tempfile::tempdir().unwrap();
        let mut api = api();

        let report = run(&mut api, &config(tmp.path()), false).unwrap();

        assert!(report.suite.is_empty());
        assert_eq!(report.render.failed, 0);
        assert!(report.render.written > 0);
        let ar = report.tree.ar_keys()[0];
        let page = &report.tree.ar(ar).files().unwrap().page;
        assert!(fs::read_to_string(page).unwrap().contains("暂无关联测试用例"));
    }
}
