//! Parsing of pasted or uploaded credential batches.
//!
//! Format: one record per line, `username,password[,packageId][,description]`. A first line
//! naming both `username` and `password` is a header. Bad lines are reported individually and
//! never abort the batch.
use serde::Serialize;

use crate::models::credential::NewCredential;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineError {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub line: usize,
    pub credential: NewCredential,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportPlan {
    pub records: Vec<ImportRecord>,
    pub errors: Vec<LineError>,
}

fn is_header(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("username") && lower.contains("password")
}

fn non_empty(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn parse_credential_lines(text: &str, default_package_id: &str) -> ImportPlan {
    let mut plan = ImportPlan::default();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if index == 0 && is_header(line) {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            plan.errors.push(LineError {
                line: line_no,
                reason: "expected at least username and password".to_string(),
            });
            continue;
        }

        let (username, password) = (fields[0], fields[1]);
        if username.is_empty() || password.is_empty() {
            plan.errors.push(LineError {
                line: line_no,
                reason: "username and password must not be empty".to_string(),
            });
            continue;
        }

        let package_id = non_empty(fields.get(2).copied())
            .unwrap_or_else(|| default_package_id.to_string());
        // Descriptions may themselves contain commas.
        let description = if fields.len() > 3 {
            non_empty(Some(&fields[3..].join(",")))
        } else {
            None
        };

        plan.records.push(ImportRecord {
            line: line_no,
            credential: NewCredential {
                package_id,
                username: username.to_string(),
                password: password.to_string(),
                description,
            },
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_batch_keeps_good_lines() {
        let plan = parse_credential_lines("alice,pw1\nbob,pw2,gold-3w\n,missing", "bronze-1w");

        assert_eq!(plan.records.len(), 2);
        assert_eq!(plan.records[0].credential.username, "alice");
        assert_eq!(plan.records[0].credential.password, "pw1");
        assert_eq!(plan.records[0].credential.package_id, "bronze-1w");
        assert_eq!(plan.records[1].credential.username, "bob");
        assert_eq!(plan.records[1].credential.package_id, "gold-3w");
        assert_eq!(plan.errors.len(), 1);
        assert_eq!(plan.errors[0].line, 3);
    }

    #[test]
    fn header_row_is_skipped_case_insensitively() {
        let plan = parse_credential_lines("Username,PASSWORD,packageId\nu1,p1,vip-1m", "bronze-1w");
        assert_eq!(plan.records.len(), 1);
        assert!(plan.errors.is_empty());
        assert_eq!(plan.records[0].line, 2);
    }

    #[test]
    fn header_only_counts_on_first_line() {
        let plan = parse_credential_lines("u1,p1\nusername,password", "bronze-1w");
        assert_eq!(plan.records.len(), 2);
    }

    #[test]
    fn single_field_line_is_rejected() {
        let plan = parse_credential_lines("onlyuser\r\nu2,p2,,fast plan, 2 devices", "silver-2w");
        assert_eq!(plan.errors, vec![LineError {
            line: 1,
            reason: "expected at least username and password".to_string(),
        }]);
        let record = &plan.records[0].credential;
        assert_eq!(record.package_id, "silver-2w");
        assert_eq!(record.description.as_deref(), Some("fast plan,2 devices"));
    }
}
