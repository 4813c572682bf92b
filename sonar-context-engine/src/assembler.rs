//! Merges an issue with its resolved source into the output record.

use crate::fetcher::FetchFailure;
use crate::locator::Located;
use crate::model::{EnrichedIssue, Issue, ResolutionStatus, SourceWindow};

/// Keys the enrichment adds; upstream values with the same name are dropped
/// so the serialized object never carries duplicates.
const ENRICHMENT_KEYS: [&str; 2] = ["sourceCode", "resolutionStatus"];

/// Pure, infallible merge.
///
/// `fetched` is ignored when the issue has no position.
pub fn assemble(
    issue: Issue,
    located: &Located,
    fetched: Option<Result<SourceWindow, FetchFailure>>,
) -> EnrichedIssue {
    let (resolution_status, source_code) = match (located, fetched) {
        (Located::NoLineInfo, _) => (ResolutionStatus::NoLineInfo, String::new()),
        (Located::Window(_), Some(Ok(window))) => (ResolutionStatus::Ok, join_lines(&window)),
        (Located::Window(_), Some(Err(FetchFailure::Timeout))) => {
            (ResolutionStatus::FetchTimeout, String::new())
        }
        (Located::Window(_), Some(Err(FetchFailure::Unavailable)) | None) => {
            (ResolutionStatus::SourceUnavailable, String::new())
        }
    };

    let mut fields = issue.into_fields();
    for key in ENRICHMENT_KEYS {
        fields.remove(key);
    }

    EnrichedIssue {
        issue: fields,
        source_code,
        resolution_status,
    }
}

/// Window text in line order, one line per row.
fn join_lines(window: &SourceWindow) -> String {
    window
        .lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::locator::window_bounds;
    use crate::model::SourceLine;

    fn issue(v: Value) -> Issue {
        match v {
            Value::Object(map) => Issue::new(map),
            _ => unreachable!("test issues are objects"),
        }
    }

    fn window() -> SourceWindow {
        SourceWindow {
            component: "p:a.py".into(),
            from_line: 1,
            to_line: 3,
            lines: vec![
                SourceLine::new(1, "import os"),
                SourceLine::new(2, ""),
                SourceLine::new(3, "print(os.name)"),
            ],
        }
    }

    #[test]
    fn success_joins_lines_in_order() {
        let located = Located::Window(window_bounds("p:a.py", 3, 25));
        let out = assemble(
            issue(json!({"key": "AX1", "component": "p:a.py", "line": 3})),
            &located,
            Some(Ok(window())),
        );
        assert_eq!(out.resolution_status, ResolutionStatus::Ok);
        assert_eq!(out.source_code, "import os\n\nprint(os.name)");
        assert_eq!(out.issue.get("key"), Some(&json!("AX1")));
    }

    #[test]
    fn failures_map_to_their_status() {
        let located = Located::Window(window_bounds("p:a.py", 3, 25));
        let timeout = assemble(issue(json!({})), &located, Some(Err(FetchFailure::Timeout)));
        let gone = assemble(issue(json!({})), &located, Some(Err(FetchFailure::Unavailable)));
        assert_eq!(timeout.resolution_status, ResolutionStatus::FetchTimeout);
        assert_eq!(gone.resolution_status, ResolutionStatus::SourceUnavailable);
        assert!(timeout.source_code.is_empty() && gone.source_code.is_empty());
    }

    #[test]
    fn no_line_info_wins_and_serializes_flat() {
        let out = assemble(
            issue(json!({"key": "AX2", "sourceCode": "stale"})),
            &Located::NoLineInfo,
            None,
        );
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(
            v,
            json!({"key": "AX2", "sourceCode": "", "resolutionStatus": "noLineInfo"})
        );
    }
}
