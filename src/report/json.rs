use crate::types::report::FleetSummary;

pub fn to_json(summary: &FleetSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::report::{RepoOutcome, RepoStatus};

    #[test]
    fn json_summary_uses_snake_case_status_keys() {
        let mut summary = FleetSummary {
            generated_at: "2026-01-01T00:00:00+00:00".to_string(),
            requested: 2,
            timed_out: 1,
            ..FleetSummary::default()
        };
        summary.record(RepoOutcome {
            status: RepoStatus::NoTestsFound,
            file_count: 0,
            test_count: 0,
        });

        let rendered = to_json(&summary).expect("json should serialize");
        let value: serde_json::Value =
            serde_json::from_str(&rendered).expect("rendered json should parse");
        assert_eq!(value["statuses"]["no_tests_found"], 1);
        assert_eq!(value["timed_out"], 1);
        assert_eq!(value["requested"], 2);
    }
}
