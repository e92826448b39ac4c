//! Assessment report rendering
//!
//! Projects region assessments into fixed-column rows. Rows come out in the
//! order the assessments go in; nothing is filtered or re-sorted here.

use serde::Serialize;
use tabled::{Table, Tabled};

use super::assessment::RegionAssessment;

/// One (region, model request) line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct ReportRow {
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "Deployment")]
    pub deployment: String,
    #[tabled(rename = "Model")]
    pub model: String,
    #[tabled(rename = "Type")]
    pub deployment_type: String,
    #[tabled(rename = "Required")]
    pub required: u32,
    #[tabled(rename = "Limit")]
    pub limit: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Available")]
    pub available: String,
    #[tabled(rename = "Sufficient")]
    pub sufficient: String,
    #[tabled(rename = "Recommended")]
    pub recommended: String,
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

/// Project assessments into report rows, one per request
pub fn rows<'a>(assessments: impl IntoIterator<Item = &'a RegionAssessment>) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for assessment in assessments {
        for item in &assessment.requests {
            let (limit, used, available, sufficient, recommended) = match item.observation.usage() {
                Some(usage) => (
                    usage.limit.to_string(),
                    usage.used.to_string(),
                    usage.available().to_string(),
                    yes_no(item.sufficient),
                    yes_no(item.recommended),
                ),
                None => (
                    "-".to_string(),
                    "-".to_string(),
                    "-".to_string(),
                    "n/a".to_string(),
                    "n/a".to_string(),
                ),
            };

            rows.push(ReportRow {
                region: assessment.region.clone(),
                deployment: item.request.name.clone(),
                model: item.request.model.clone(),
                deployment_type: item.request.deployment_type.clone(),
                required: item.request.capacity,
                limit,
                used,
                available,
                sufficient,
                recommended,
            });
        }
    }
    rows
}

/// Render rows as a text table
pub fn render_table(rows: &[ReportRow]) -> String {
    if rows.is_empty() {
        return "No regions to show.".to_string();
    }
    Table::new(rows).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelRequest;
    use crate::services::assessment::RequestAssessment;
    use crate::services::quota::{Observation, RECOMMENDED_THRESHOLD};

    fn assessment(region: &str, observation: Observation) -> RegionAssessment {
        let req = ModelRequest::new("chat", "gpt-4o", "GlobalStandard", 10).unwrap();
        RegionAssessment::from_requests(
            region,
            vec![RequestAssessment::evaluate(req, observation, RECOMMENDED_THRESHOLD)],
        )
    }

    #[test]
    fn test_rows_carry_raw_numbers() {
        let a = assessment("westus3", Observation::Present { limit: 100, used: 10 });
        let rows = rows([&a]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].region, "westus3");
        assert_eq!(rows[0].deployment, "chat");
        assert_eq!(rows[0].limit, "100");
        assert_eq!(rows[0].used, "10");
        assert_eq!(rows[0].available, "90");
        assert_eq!(rows[0].sufficient, "yes");
        assert_eq!(rows[0].recommended, "no");
    }

    #[test]
    fn test_rows_keep_insufficient_and_missing_regions() {
        let short = assessment("eastus", Observation::Present { limit: 100, used: 95 });
        let missing = assessment("uksouth", Observation::Absent);
        let rows = rows([&short, &missing]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].region, "eastus");
        assert_eq!(rows[0].sufficient, "no");
        assert_eq!(rows[1].region, "uksouth");
        assert_eq!(rows[1].available, "-");
        assert_eq!(rows[1].sufficient, "n/a");
    }

    #[test]
    fn test_render_table_has_headers() {
        let a = assessment("westus3", Observation::Present { limit: 300, used: 10 });
        let table = render_table(&rows([&a]));
        assert!(table.contains("Region"));
        assert!(table.contains("Available"));
        assert!(table.contains("westus3"));
        assert!(table.contains("290"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_table(&[]), "No regions to show.");
    }
}
