//! Node, description, record and test case pages.

use super::{Link, NONE_LABEL, document, escape, or_none};
use crate::domain::{Detail, Level, TestCase};

/// A titled list of links under the "关联项" section.
pub(super) struct Related {
    pub heading: String,
    pub links: Vec<Link>,
    pub empty: String,
}

pub(super) struct NodePage<'a> {
    pub level: Level,
    pub req_id: &'a str,
    pub detail: &'a Detail,
    pub description: String,
    pub review: String,
    pub history: String,
    pub back: Vec<Link>,
    pub related: Vec<Related>,
}

/// Which of the two record pages to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RecordKind {
    Review,
    History,
}

impl RecordKind {
    const fn title(self) -> &'static str {
        match self {
            Self::Review => "评审记录",
            Self::History => "修改记录",
        }
    }

    const fn columns(self) -> [&'static str; 4] {
        match self {
            Self::Review => ["序号", "评审日期", "评审人", "评审意见"],
            Self::History => ["序号", "修改日期", "修改人", "修改内容"],
        }
    }
}

pub(super) fn node_page(page: &NodePage<'_>) -> String {
    let detail = page.detail;
    let title = escape(&detail.title);

    let mut basic = vec![info_row("需求级别", page.level.label())];
    if page.level != Level::Sf {
        basic.push(info_row("需求ID", &or_none(page.req_id)));
    }
    basic.push(info_row("需求名称", &title));

    let related: String = page
        .related
        .iter()
        .enumerate()
        .map(|(i, related)| related_section(i + 1, related))
        .collect();

    let body = format!(
        r#"{back}
    <div class="container">
        <h1>{title}</h1>
        <div class="section-title">1. 基本信息</div>
        <div class="info-list">
{basic}
        </div>
        <div class="section-title">2. 需求描述</div>
        <div class="requirement-detail">
            <a href="{description}" class="link-item">详细描述</a>
        </div>
        <div class="section-title">3. CM信息</div>
{cm}
        <div class="link-group">
            <a href="{review}" class="link-item">评审记录</a>
            <a href="{history}" class="link-item">修改记录</a>
        </div>
        <div class="section-title">4. 关联项</div>
{related}
    </div>"#,
        back = back_links(&page.back),
        basic = basic.join("\n"),
        description = escape(&page.description),
        cm = cm_info(page.level, detail),
        review = escape(&page.review),
        history = escape(&page.history),
    );
    document(&title, &body, None)
}

fn cm_info(level: Level, detail: &Detail) -> String {
    if level == Level::Sf {
        let rows = [
            info_row("负责人", &or_none(&detail.assignee)),
            info_row("计划工时", &workload(detail.workload)),
            info_row("计划开始时间", &or_none(&detail.plan_start_date)),
            info_row("计划完成时间", &or_none(&detail.plan_end_date)),
        ];
        return format!(
            "        <div class=\"info-list\">\n{}\n        </div>",
            rows.join("\n")
        );
    }

    let left = [
        info_row("提出人", &or_none(&detail.creator)),
        info_row("状态", &or_none(&detail.status)),
        info_row("计划开始时间", &or_none(&detail.plan_start_date)),
        info_row("计划开发结束", &or_none(&detail.plan_dev_end_date)),
        info_row("计划工时", &workload(detail.workload)),
    ];
    let right = [
        info_row("负责人", &or_none(&detail.assignee)),
        info_row("领域", &or_none(&detail.domain)),
        info_row("计划完成时间", &or_none(&detail.plan_end_date)),
        info_row("计划测试结束", &or_none(&detail.plan_test_end_date)),
        info_row("实际工时", &workload(detail.actual_workload)),
    ];
    format!(
        r#"        <div class="cm-info-grid">
            <div class="info-list">
{}
            </div>
            <div class="info-list">
{}
            </div>
        </div>"#,
        left.join("\n"),
        right.join("\n")
    )
}

fn workload(days: f64) -> String {
    format!("{days} 人天")
}

fn related_section(index: usize, related: &Related) -> String {
    let items = if related.links.is_empty() {
        format!(
            r#"            <div class="requirement-item empty">{}</div>"#,
            escape(&related.empty)
        )
    } else {
        related
            .links
            .iter()
            .map(|link| {
                format!(
                    r#"            <div class="requirement-item"><a href="{}" class="requirement-link">{}</a></div>"#,
                    escape(&link.href),
                    escape(&link.label)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"        <div class="subsection-title">4.{index} {heading}：</div>
        <div class="requirement-list">
{items}
        </div>
"#,
        heading = escape(&related.heading),
    )
}

pub(super) fn description_page(owner: &str, back: &str, description: &str) -> String {
    let title = format!("{} 详细描述", escape(owner));
    let content = if description.trim().is_empty() {
        r#"<p class="empty">暂无内容</p>"#.to_string()
    } else {
        description.to_string()
    };
    let body = format!(
        r#"    <a href="{back}" class="back-link">返回</a>
    <div class="container">
        <h1>{title}</h1>
        <div class="content">
{content}
        </div>
    </div>"#,
        back = escape(back),
    );
    document(&title, &body, None)
}

pub(super) fn record_page(kind: RecordKind, owner: &str, req_id: &str, back: &str) -> String {
    let title = format!("{} {}", escape(owner), kind.title());
    let header: String = kind
        .columns()
        .iter()
        .map(|column| format!("<th>{column}</th>"))
        .collect();
    let body = format!(
        r#"    <a href="{back}" class="back-link">返回</a>
    <div class="container">
        <h1>{title}</h1>
        <div class="info-list">
{req_id}
{name}
        </div>
        <table>
            <thead><tr>{header}</tr></thead>
            <tbody>
                <tr><td colspan="4" class="empty">{NONE_LABEL}</td></tr>
            </tbody>
        </table>
    </div>"#,
        back = escape(back),
        req_id = info_row("需求ID", &or_none(req_id)),
        name = info_row("需求名称", &or_none(owner)),
    );
    document(&title, &body, None)
}

pub(super) fn test_case_page(case: &TestCase, back: &Link) -> String {
    let title = escape(if case.name.is_empty() {
        &case.number
    } else {
        &case.name
    });
    let detail = case.detail.as_ref();
    let (ar, ar_req_id, sr_req_id, ir_req_id) = case.link.as_ref().map_or(
        (NONE_LABEL, NONE_LABEL, NONE_LABEL, NONE_LABEL),
        |link| {
            (
                link.ar_title.as_str(),
                link.ar_req_id.as_str(),
                link.sr_req_id.as_str(),
                link.ir_req_id.as_str(),
            )
        },
    );

    let info = [
        info_row("用例编号", &or_none(&case.number)),
        info_row("用例名称", &or_none(&case.name)),
        info_row("状态", &or_none(&case.status)),
        info_row("执行类型", &or_none(&case.execution_type)),
        info_row("测试类型", &or_none(&case.test_type)),
        info_row("作者", &or_none(detail.map_or("", |d| d.author.as_str()))),
        info_row("关联AR", &or_none(ar)),
        info_row(
            "需求追溯",
            &format!(
                "{} / {} / {}",
                or_none(ir_req_id),
                or_none(sr_req_id),
                or_none(ar_req_id)
            ),
        ),
        info_row(
            "预置条件",
            &or_none(detail.map_or("", |d| d.preparation.as_str())),
        ),
    ];

    let steps = detail.map(|d| d.steps()).unwrap_or_default();
    let results = detail.map(|d| d.results()).unwrap_or_default();
    let rows: Vec<String> = (0..steps.len().max(results.len()))
        .map(|i| {
            format!(
                "                <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                i + 1,
                steps.get(i).copied().unwrap_or_default(),
                results.get(i).copied().unwrap_or_default()
            )
        })
        .collect();
    let rows = if rows.is_empty() {
        r#"                <tr><td colspan="3" class="empty">暂无测试步骤</td></tr>"#.to_string()
    } else {
        rows.join("\n")
    };

    let body = format!(
        r#"    <a href="{back}" class="back-link">返回{label}</a>
    <div class="container">
        <h1>{title}</h1>
        <div class="section-title">1. 基本信息</div>
        <div class="info-list">
{info}
        </div>
        <div class="section-title">2. 测试步骤</div>
        <table>
            <thead><tr><th>序号</th><th>测试步骤</th><th>预期结果</th></tr></thead>
            <tbody>
{rows}
            </tbody>
        </table>
    </div>"#,
        back = escape(&back.href),
        label = escape(&back.label),
        info = info.join("\n"),
    );
    document(&title, &body, None)
}

fn back_links(links: &[Link]) -> String {
    links
        .iter()
        .map(|link| {
            format!(
                r#"    <a href="{}" class="back-link">{}</a>"#,
                escape(&link.href),
                escape(&link.label)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `value` is inserted as is and must already be escaped.
fn info_row(label: &str, value: &str) -> String {
    format!(
        r#"            <div class="info-row"><span class="info-label">{label}：</span><span class="info-value">{value}</span></div>"#
    )
}
