//! Mapping of service responses onto domain records.
//!
//! Responses are loosely typed JSON. Structural problems (no result entry, a
//! record that is not an object, a test case outside the `tc_OS_` namespace)
//! are errors; missing or oddly typed fields fall back to defaults.

use serde_json::{Map, Value};

use crate::domain::{
    Detail, TestCase, TestCaseDetail,
    test_case::{NUMBER_PREFIX, flatten},
};

/// SR id that appears in IR child lists but is not a real requirement.
pub const PLACEHOLDER_SR_ID: &str = "1061206331188977665";

type Object = Map<String, Value>;

/// Errors produced while mapping a response.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    /// The response has no entry at the expected location.
    #[error("response has no entry at '{0}'")]
    MissingResult(&'static str),

    /// The entry is not a JSON object.
    #[error("record at '{0}' is not an object")]
    NotAnObject(&'static str),

    /// The test case number is outside the accepted namespace.
    #[error("test case number '{0}' does not start with tc_OS_")]
    ForeignTestCase(String),
}

/// An IR, SR or AR detail record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueRecord {
    /// Mapped fields.
    pub detail: Detail,
    /// Child ids, in listed order.
    pub children: Vec<String>,
}

/// The SF as found by the keyword search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfSummary {
    /// API id.
    pub id: String,
    /// Mapped fields. Only the fields present in search results are set.
    pub detail: Detail,
    /// The IR ids listed under `feature2ir`.
    pub ir_ids: Vec<String>,
}

/// The fields only available from the SF detail endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfExtras {
    /// Rich-text description.
    pub description: String,
    /// Planned start date.
    pub plan_start_date: String,
    /// Planned end date.
    pub plan_end_date: String,
}

/// One page of the test case listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCasePage {
    /// The total across all pages, if reported.
    pub total: Option<usize>,
    /// The raw listing entries.
    pub values: Vec<Value>,
}

/// A listed test case and the AR it claims to belong to.
#[derive(Debug, Clone, Default)]
pub struct ListedTestCase {
    /// The mapped case, not yet linked.
    pub case: TestCase,
    /// The associated AR's API id, if the association is to an AR.
    pub ar_id: Option<String>,
}

/// Splits a comma-delimited id list, trimming entries and dropping empties.
#[must_use]
pub fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Maps an IR, SR or AR detail response.
///
/// The plan start and end dates are read from each other's keys; the
/// service reports them the wrong way round below the SF.
///
/// # Errors
///
/// Returns an error if `result[0]` is missing or not an object.
pub fn parse_issue_detail(response: &Value) -> Result<IssueRecord, RecordError> {
    let record = first_result(response)?;
    let status = object(record, "status");

    let detail = Detail {
        number: text(record, "number"),
        title: text(record, "title"),
        category: text(record, "category"),
        status: status.map(|s| text(s, "name")).unwrap_or_default(),
        status_value: status.map(|s| text(s, "code")).unwrap_or_default(),
        workload: float(record, "workload_man_day"),
        actual_workload: float(record, "sum_workload_man_day"),
        creator: display_name(record, "created_by"),
        assignee: display_name(record, "assignee"),
        domain: object(record, "business_domain")
            .map(|d| text(d, "display_value"))
            .unwrap_or_default(),
        plan_start_date: text(record, "plan_end_date"),
        plan_end_date: text(record, "plan_start_date"),
        plan_dev_end_date: text(record, "plan_dev_end_date"),
        plan_test_end_date: text(record, "plan_test_end_date"),
        description: text(record, "description"),
    };

    Ok(IssueRecord {
        detail,
        children: split_ids(&text(record, "children")),
    })
}

/// Maps the SF keyword search response, taking the first hit.
///
/// # Errors
///
/// Returns an error if `result.issues[0]` is missing or not an object.
pub fn parse_sf_search(response: &Value) -> Result<SfSummary, RecordError> {
    let issue = response
        .pointer("/result/issues/0")
        .ok_or(RecordError::MissingResult("result.issues"))?
        .as_object()
        .ok_or(RecordError::NotAnObject("result.issues[0]"))?;

    let assignee = match issue.get("assignee") {
        Some(Value::Object(person)) => text(person, "name"),
        _ => text(issue, "assignee"),
    };

    let detail = Detail {
        number: text(issue, "number"),
        title: text(issue, "title"),
        category: text(issue, "category"),
        status: text(issue, "status"),
        assignee,
        workload: float(issue, "workload"),
        ..Detail::default()
    };

    Ok(SfSummary {
        id: text(issue, "id"),
        detail,
        ir_ids: split_ids(&text(issue, "feature2ir")),
    })
}

/// Maps the SF detail response. The plan dates are taken as reported.
///
/// # Errors
///
/// Returns an error if `result[0]` is missing or not an object.
pub fn parse_sf_detail(response: &Value) -> Result<SfExtras, RecordError> {
    let record = first_result(response)?;
    Ok(SfExtras {
        description: text(record, "description"),
        plan_start_date: text(record, "plan_start_date"),
        plan_end_date: text(record, "plan_end_date"),
    })
}

/// Maps one page of the test case listing.
#[must_use]
pub fn parse_test_case_page(response: &Value) -> TestCasePage {
    let total = response.get("total").and_then(|t| match t {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });
    let values = response
        .get("values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    TestCasePage { total, values }
}

/// Maps one entry of the test case listing.
///
/// # Errors
///
/// Returns an error if the entry is not an object or its number does not
/// start with [`NUMBER_PREFIX`].
pub fn parse_listed_test_case(entry: &Value) -> Result<ListedTestCase, RecordError> {
    let entry = entry.as_object().ok_or(RecordError::NotAnObject("values[]"))?;

    let number = text(entry, "number");
    if !number.starts_with(NUMBER_PREFIX) {
        return Err(RecordError::ForeignTestCase(number));
    }

    let mut case = TestCase::default();
    case.id = text(entry, "id");
    case.number = number;
    case.name = text(entry, "name");
    case.description = text(entry, "description");
    case.status = nested_text(entry, "status", "name");
    case.execution_type = nested_text(entry, "execution_type", "name");
    case.test_type = nested_text(entry, "test_type", "name");

    let ar_id = object(entry, "associate_issue_info")
        .filter(|info| info.get("associate").is_some_and(truthy))
        .filter(|info| text(info, "tracker_name") == "AR")
        .map(|info| text(info, "issue_id"))
        .filter(|id| !id.is_empty());

    Ok(ListedTestCase { case, ar_id })
}

/// Maps a test case detail response.
///
/// # Errors
///
/// Returns an error if the response is not an object.
pub fn parse_test_case_detail(response: &Value) -> Result<TestCaseDetail, RecordError> {
    let record = response
        .as_object()
        .ok_or(RecordError::NotAnObject("testcase"))?;
    let empty = Object::new();
    let extend = object(record, "extend_info").unwrap_or(&empty);
    let steps: Vec<&Object> = extend
        .get("steps")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();
    let step_texts: Vec<String> = steps.iter().map(|s| text(s, "test_step")).collect();
    let result_texts: Vec<String> = steps.iter().map(|s| text(s, "expect_result")).collect();

    Ok(TestCaseDetail {
        id: text(record, "testcase_id"),
        number: text(record, "testcase_number"),
        name: text(record, "name"),
        author: nested_text(extend, "author", "name"),
        preparation: text(extend, "preparation"),
        test_steps: flatten(step_texts.iter().map(String::as_str)),
        expected_results: flatten(result_texts.iter().map(String::as_str)),
        description: text(extend, "description"),
        issue_id: nested_text(extend, "issue", "id"),
        issue_name: nested_text(extend, "issue", "name"),
    })
}

fn first_result(response: &Value) -> Result<&Object, RecordError> {
    response
        .get("result")
        .and_then(Value::as_array)
        .and_then(|result| result.first())
        .ok_or(RecordError::MissingResult("result"))?
        .as_object()
        .ok_or(RecordError::NotAnObject("result[0]"))
}

fn object<'a>(record: &'a Object, key: &str) -> Option<&'a Object> {
    record.get(key).and_then(Value::as_object)
}

/// A scalar field as text. Missing, null and structured values read as empty.
fn text(record: &Object, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn nested_text(record: &Object, outer: &str, inner: &str) -> String {
    object(record, outer)
        .map(|o| text(o, inner))
        .unwrap_or_default()
}

/// A numeric field given either as a number or as numeric text.
fn float(record: &Object, key: &str) -> f64 {
    let value = match record.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v: &f64| v.is_finite()).unwrap_or(0.0)
}

fn display_name(record: &Object, key: &str) -> String {
    let Some(person) = object(record, key) else {
        return String::new();
    };
    let nick = text(person, "nick_name");
    if nick.is_empty() {
        text(person, "user_name")
    } else {
        nick
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
