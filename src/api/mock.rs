//! In-memory [`IssueApi`] for loader and pipeline tests.

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::{api::IssueApi, domain::Level};

/// Serves canned responses and records every call.
#[derive(Debug, Default)]
pub struct MockApi {
    sf_search: Option<Value>,
    details: HashMap<(Level, String), Value>,
    pages: HashMap<usize, Value>,
    test_case_details: HashMap<String, Value>,
    pub calls: Vec<String>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers the keyword search with a single SF.
    pub fn with_sf(mut self, id: &str, title: &str, ir_ids: &[&str]) -> Self {
        self.sf_search = Some(json!({
            "result": { "issues": [{
                "id": id,
                "number": "SF-1",
                "title": title,
                "status": "Open",
                "assignee": { "name": "owner" },
                "workload": "3",
                "feature2ir": ir_ids.join(","),
            }]}
        }));
        self.details.insert(
            (Level::Sf, id.to_string()),
            json!({ "result": [{
                "description": "<p>root</p>",
                "plan_start_date": "2024-01-01",
                "plan_end_date": "2024-12-31",
            }]}),
        );
        self
    }

    /// Answers the detail request of an IR, SR or AR.
    pub fn with_issue(mut self, level: Level, id: &str, title: &str, children: &[&str]) -> Self {
        self.details.insert(
            (level, id.to_string()),
            json!({ "result": [{
                "number": format!("{level}-{id}"),
                "title": title,
                "status": { "name": "进行中", "code": "1" },
                "workload_man_day": "1.5",
                "assignee": { "nick_name": "dev" },
                "description": format!("<p>{title}</p>"),
                "children": children.join(","),
            }]}),
        );
        self
    }

    /// Answers the listing page starting at `offset`.
    pub fn with_page(mut self, offset: usize, total: usize, values: Vec<Value>) -> Self {
        self.pages
            .insert(offset, json!({ "total": total, "values": values }));
        self
    }

    /// Answers the listing page starting at `offset` with `body` as is.
    pub fn with_raw_page(mut self, offset: usize, body: Value) -> Self {
        self.pages.insert(offset, body);
        self
    }

    /// Answers the detail request of a test case.
    pub fn with_test_case_detail(mut self, number: &str, steps: &[(&str, &str)]) -> Self {
        let steps: Vec<Value> = steps
            .iter()
            .map(|(step, result)| json!({ "test_step": step, "expect_result": result }))
            .collect();
        self.test_case_details.insert(
            number.to_string(),
            json!({
                "testcase_id": format!("id-{number}"),
                "testcase_number": number,
                "name": number,
                "extend_info": {
                    "author": { "name": "tester" },
                    "preparation": "boot the board",
                    "steps": steps,
                }
            }),
        );
        self
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// A listing entry for a test case, optionally associated with an AR id.
pub fn listed_case(number: &str, ar_id: Option<&str>) -> Value {
    let association = ar_id.map_or_else(
        || json!({ "associate": false }),
        |id| json!({ "associate": true, "tracker_name": "AR", "issue_id": id }),
    );
    json!({
        "id": format!("id-{number}"),
        "number": number,
        "name": format!("case {number}"),
        "status": { "name": "通过" },
        "associate_issue_info": association,
    })
}

impl IssueApi for MockApi {
    fn search_sf(&mut self, keyword: &str) -> Option<Value> {
        self.calls.push(format!("search {keyword}"));
        self.sf_search.clone()
    }

    fn issue_detail(&mut self, level: Level, id: &str) -> Option<Value> {
        self.calls.push(format!("detail {level} {id}"));
        self.details.get(&(level, id.to_string())).cloned()
    }

    fn list_test_cases(&mut self, offset: usize, limit: usize) -> Option<Value> {
        self.calls.push(format!("list {offset} {limit}"));
        self.pages.get(&offset).cloned()
    }

    fn test_case_detail(&mut self, number: &str) -> Option<Value> {
        self.calls.push(format!("tc {number}"));
        self.test_case_details.get(number).cloned()
    }
}
