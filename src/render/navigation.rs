//! The collapsible tree of every requirement, rendered beside the SF page.

use super::{document, escape, style::navigation_js};
use crate::domain::Level;

pub(super) struct NavNode {
    pub level: Level,
    pub title: String,
    pub href: String,
    pub children: Vec<NavNode>,
}

pub(super) fn navigation_page(root: &NavNode) -> String {
    let title = format!("{} 需求导航", escape(&root.title));
    let tree = render_node(root, 3);

    let legend: String = [Level::Sf, Level::Ir, Level::Sr, Level::Ar]
        .iter()
        .map(|level| {
            format!(
                r#"<span class="level-badge {}">{level}</span>{} "#,
                badge_class(*level),
                level.label()
            )
        })
        .collect();

    let body = format!(
        r#"    <div class="container">
        <h1>{title}</h1>
        <div class="action-buttons">
            <button class="btn btn-expand" id="expandAll">展开全部</button>
            <button class="btn btn-collapse" id="collapseAll">折叠全部</button>
        </div>
        <div class="traceability-tree" id="traceabilityTree">
{tree}        </div>
        <div class="legend">{legend}</div>
    </div>"#
    );
    document(&title, &body, Some(navigation_js()))
}

fn render_node(node: &NavNode, depth: usize) -> String {
    let indent = "    ".repeat(depth);
    let mut out = format!(
        r#"{indent}<div class="node">
{indent}    <div class="node-content"><span class="level-badge {badge}">{level}</span><a href="{href}" class="node-link" target="_blank">{title}</a>"#,
        badge = badge_class(node.level),
        level = node.level,
        href = escape(&node.href),
        title = escape(&node.title),
    );

    if let Some(child) = node.level.child() {
        out.push_str("<div class=\"toggle\">▶</div></div>\n");
        out.push_str(&format!("{indent}    <div class=\"children\">\n"));
        if node.children.is_empty() {
            out.push_str(&format!(
                "{indent}        <div class=\"empty\">暂无{child}级需求</div>\n"
            ));
        }
        for c in &node.children {
            out.push_str(&render_node(c, depth + 2));
        }
        out.push_str(&format!("{indent}    </div>\n"));
    } else {
        out.push_str("</div>\n");
    }
    out.push_str(&format!("{indent}</div>\n"));
    out
}

const fn badge_class(level: Level) -> &'static str {
    match level {
        Level::Sf => "level-sf",
        Level::Ir => "level-ir",
        Level::Sr => "level-sr",
        Level::Ar => "level-ar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(level: Level, title: &str) -> NavNode {
        NavNode {
            level,
            title: title.to_string(),
            href: format!("{title}.html"),
            children: Vec::new(),
        }
    }

    #[test]
    fn nests_levels_and_marks_empty_branches() {
        let mut sr = leaf(Level::Sr, "任务创建");
        sr.children.push(leaf(Level::Ar, "LLR_OS_01_01_01"));
        let mut ir = leaf(Level::Ir, "任务管理");
        ir.children.push(sr);
        let mut sf = leaf(Level::Sf, "uCOS-III");
        sf.children.push(ir);
        sf.children.push(leaf(Level::Ir, "时间管理"));

        let html = navigation_page(&sf);

        assert!(html.contains("uCOS-III 需求导航"));
        assert!(html.contains(r#"<a href="LLR_OS_01_01_01.html" class="node-link" target="_blank">LLR_OS_01_01_01</a></div>"#));
        assert_eq!(html.matches("暂无SR级需求").count(), 1);
        assert_eq!(html.matches(r#"<div class="toggle">"#).count(), 4);
        assert!(html.contains("expandAll"));
    }

    #[test]
    fn children_are_indented_inside_their_parent() {
        let mut sr = leaf(Level::Sr, "任务创建");
        sr.children.push(leaf(Level::Ar, "LLR_OS_01_01_01"));

        let html = render_node(&sr, 0);

        let lines: Vec<_> = html.lines().collect();
        assert_eq!(lines[0], r#"<div class="node">"#);
        assert_eq!(lines[2], r#"    <div class="children">"#);
        assert_eq!(lines[3], r#"        <div class="node">"#);
        assert_eq!(lines.last(), Some(&"</div>"));
        assert_eq!(html.matches(r#"<div class="node">"#).count(), 2);
        assert_eq!(html.matches("</div>").count(), html.matches("<div").count());
    }
}
