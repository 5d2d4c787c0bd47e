//! HTML report rendering.
//!
//! Every page links to its neighbours by paths relative to itself, so the
//! report can be browsed straight from disk. Rendering only reads the paths
//! assigned by [`Layout`](crate::storage::Layout); a node or test case
//! without assigned paths gets no pages, and links to it render as `#`.

mod navigation;
mod pages;
mod style;
mod tables;

use std::{fs, path::Path};

use tracing::instrument;

use self::{
    navigation::NavNode,
    pages::{NodePage, RecordKind, Related},
    tables::{Row, TablePage},
};
use crate::{
    domain::{Hierarchy, NodeFiles, NodeRef, TestCaseKey, TestSuite},
    storage::relative_path,
};

/// Shown in place of a missing value or link label.
const NONE_LABEL: &str = "无";

/// Shown in tables for a child without a title.
const UNTITLED: &str = "无名称";

/// What a render pass wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Files written.
    pub written: usize,
    /// Files that could not be written.
    pub failed: usize,
}

/// Renders every page of the tree and every placed test case.
///
/// Must run after all paths are assigned and the tree is sorted. Write
/// failures are logged and counted.
#[instrument(skip_all)]
pub fn render_all(tree: &Hierarchy, suite: &TestSuite) -> RenderSummary {
    let mut output = Output::default();

    for node in tree.node_refs() {
        match tree.files(node) {
            Some(files) => render_node(tree, suite, node, files, &mut output),
            None => tracing::debug!(
                "{} '{}' has no files, skipping",
                node.level(),
                tree.title(node).unwrap_or_default()
            ),
        }
    }

    for &key in suite.keys() {
        render_test_case(tree, suite, key, &mut output);
    }

    tracing::info!(
        "rendered {} files ({} failed)",
        output.summary.written,
        output.summary.failed
    );
    output.summary
}

fn render_node(
    tree: &Hierarchy,
    suite: &TestSuite,
    node: NodeRef,
    files: &NodeFiles,
    output: &mut Output,
) {
    let page = files.page.as_path();
    let detail = tree.detail(node);
    let req_id = tree.req_id(node);

    let mut back = Vec::new();
    let mut related = Vec::new();
    if let Some(parent) = tree.parent_of(node) {
        let parent_link = node_link(tree, page, parent);
        back.push(Link::new("返回父需求", parent_link.href.clone()));
        if let NodeRef::Ar(_) = node {
            if let Some(root) = tree.parent_of(parent) {
                back.push(Link::new("返回根需求", node_link(tree, page, root).href));
            }
        }
        related.push(Related {
            heading: format!("上一层级需求({}级)", parent.level()),
            links: vec![parent_link],
            empty: NONE_LABEL.to_string(),
        });
    }
    match node {
        NodeRef::Ar(ar) => related.push(Related {
            heading: "关联测试用例".to_string(),
            links: tree
                .ar(ar)
                .children()
                .iter()
                .map(|key| test_case_link(suite, page, *key))
                .collect(),
            empty: "暂无关联测试用例".to_string(),
        }),
        _ => {
            if let Some(child) = node.level().child() {
                related.push(Related {
                    heading: format!("下一层级需求({child}级)"),
                    links: tree
                        .children_of(node)
                        .into_iter()
                        .map(|c| node_link(tree, page, c))
                        .collect(),
                    empty: format!("暂无{child}级需求"),
                });
            }
        }
    }

    let html = pages::node_page(&NodePage {
        level: node.level(),
        req_id,
        detail,
        description: href(page, Some(files.description.as_path())),
        review: href(page, Some(files.review.as_path())),
        history: href(page, Some(files.history.as_path())),
        back,
        related,
    });
    output.write(page, &html);

    output.write(
        &files.description,
        &pages::description_page(
            &detail.title,
            &href(&files.description, Some(page)),
            &detail.description,
        ),
    );
    for (kind, path) in [
        (RecordKind::Review, &files.review),
        (RecordKind::History, &files.history),
    ] {
        output.write(
            path,
            &pages::record_page(kind, &detail.title, req_id, &href(path, Some(page))),
        );
    }

    if let Some(table) = &files.table {
        if let Some(html) = table_page(tree, node, table, page) {
            output.write(table, &html);
        }
    }
    if let Some(nav) = &files.navigation {
        output.write(nav, &navigation::navigation_page(&nav_node(tree, node, nav)));
    }
}

fn table_page(tree: &Hierarchy, node: NodeRef, table: &Path, page: &Path) -> Option<String> {
    let child = node.level().child()?;
    let rows = tree
        .children_of(node)
        .into_iter()
        .filter(|c| !tree.req_id(*c).is_empty())
        .map(|c| Row {
            req_id: tree.req_id(c).to_string(),
            title: tree.title(c).unwrap_or(UNTITLED).to_string(),
            href: href(table, tree.files(c).map(|f| f.page.as_path())),
        })
        .collect();

    Some(tables::table_page(&TablePage {
        owner: node.level(),
        child,
        title: &tree.detail(node).title,
        owner_href: href(table, Some(page)),
        rows,
    }))
}

/// The navigation subtree under `node`. Children without a title or without
/// files are left out.
fn nav_node(tree: &Hierarchy, node: NodeRef, from: &Path) -> NavNode {
    NavNode {
        level: node.level(),
        title: tree.detail(node).title.clone(),
        href: href(from, tree.files(node).map(|f| f.page.as_path())),
        children: tree
            .children_of(node)
            .into_iter()
            .filter(|c| tree.title(*c).is_some() && tree.files(*c).is_some())
            .map(|c| nav_node(tree, c, from))
            .collect(),
    }
}

fn render_test_case(
    tree: &Hierarchy,
    suite: &TestSuite,
    key: TestCaseKey,
    output: &mut Output,
) {
    let case = suite.get(key);
    let (Some(page), Some(link)) = (case.page(), case.link.as_ref()) else {
        return;
    };
    let back = node_link(tree, page, NodeRef::Ar(link.ar));
    output.write(page, &pages::test_case_page(case, &back));
}

fn node_link(tree: &Hierarchy, from: &Path, target: NodeRef) -> Link {
    Link::new(
        tree.title(target).unwrap_or(NONE_LABEL),
        href(from, tree.files(target).map(|f| f.page.as_path())),
    )
}

fn test_case_link(suite: &TestSuite, from: &Path, key: TestCaseKey) -> Link {
    let case = suite.get(key);
    let label = if case.name.is_empty() {
        &case.number
    } else {
        &case.name
    };
    Link::new(label.as_str(), href(from, case.page().map(|p| p.as_path())))
}

/// The link from `from` to `to`; `#` when there is no target or no path.
fn href(from: &Path, to: Option<&Path>) -> String {
    to.map(|to| relative_path(from, to))
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| "#".to_string())
}

/// A labelled hyperlink.
struct Link {
    label: String,
    href: String,
}

impl Link {
    fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

#[derive(Default)]
struct Output {
    summary: RenderSummary,
}

impl Output {
    fn write(&mut self, path: &Path, html: &str) {
        match fs::write(path, html) {
            Ok(()) => {
                tracing::debug!("wrote {}", path.display());
                self.summary.written += 1;
            }
            Err(e) => {
                tracing::warn!("failed to write {}: {e}", path.display());
                self.summary.failed += 1;
            }
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// The escaped value, or [`NONE_LABEL`] when it is empty.
fn or_none(value: &str) -> String {
    if value.is_empty() {
        NONE_LABEL.to_string()
    } else {
        escape(value)
    }
}

/// Wraps `body` in a complete page. `title` must already be escaped.
fn document(title: &str, body: &str, script: Option<&str>) -> String {
    let script = script
        .map(|js| format!("\n    <script>{js}</script>"))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
{body}{script}
</body>
</html>
"#,
        css = style::inline_css(),
    )
}
