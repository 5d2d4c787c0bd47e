//! Cross-reference tables between a node and its children.

use super::{document, escape};
use crate::domain::Level;

pub(super) struct Row {
    pub req_id: String,
    pub title: String,
    pub href: String,
}

pub(super) struct TablePage<'a> {
    pub owner: Level,
    pub child: Level,
    pub title: &'a str,
    pub owner_href: String,
    pub rows: Vec<Row>,
}

/// Renders the table. The owner cell spans every emitted row; a table with
/// no rows shows a single placeholder row instead.
pub(super) fn table_page(page: &TablePage<'_>) -> String {
    let owner = page.owner.issue_type();
    let child = page.child.issue_type();
    let title = format!("{} {owner}-{child}需求表", escape(page.title));
    let owner_cell = |rowspan: usize| {
        format!(
            r#"<td class="owner-cell" rowspan="{rowspan}"><a href="{}" target="_blank">{}</a></td>"#,
            escape(&page.owner_href),
            escape(page.title)
        )
    };

    let rows = if page.rows.is_empty() {
        format!(
            r#"                <tr>{}<td colspan="2" class="empty">暂无{child}级需求</td></tr>"#,
            owner_cell(1)
        )
    } else {
        page.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let lead = if i == 0 {
                    owner_cell(page.rows.len())
                } else {
                    String::new()
                };
                format!(
                    r#"                <tr>{lead}<td>{}</td><td><a href="{}" target="_blank">{}</a></td></tr>"#,
                    escape(&row.req_id),
                    escape(&row.href),
                    escape(&row.title)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let body = format!(
        r#"    <div class="container">
        <h1>{title}</h1>
        <table>
            <thead>
                <tr><th>{owner}</th><th>{child}-需求ID</th><th>{child}-需求名称</th></tr>
            </thead>
            <tbody>
{rows}
            </tbody>
        </table>
    </div>"#
    );
    document(&title, &body, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(req_id: &str) -> Row {
        Row {
            req_id: req_id.to_string(),
            title: format!("title {req_id}"),
            href: format!("{req_id}.html"),
        }
    }

    fn page(rows: Vec<Row>) -> TablePage<'static> {
        TablePage {
            owner: Level::Sr,
            child: Level::Ar,
            title: "任务创建",
            owner_href: "任务创建.html".to_string(),
            rows,
        }
    }

    #[test]
    fn owner_cell_spans_emitted_rows() {
        let html = table_page(&page(vec![row("LLR_OS_01_01_01"), row("LLR_OS_01_01_02")]));

        assert_eq!(html.matches("owner-cell").count(), 2, "style rule and one cell");
        assert!(html.contains(r#"rowspan="2""#));
        assert!(html.contains(r#"<a href="LLR_OS_01_01_02.html" target="_blank">title LLR_OS_01_01_02</a>"#));
        assert!(html.contains("<th>SR</th><th>AR-需求ID</th>"));
        assert!(html.contains("任务创建 SR-AR需求表"));
    }

    #[test]
    fn empty_table_shows_placeholder_row() {
        let html = table_page(&page(Vec::new()));

        assert!(html.contains(r#"rowspan="1""#));
        assert!(html.contains("暂无AR级需求"));
    }
}
