use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{
    BillingProjectSlotsDocument, BillingProjectSlotsEntry, BillingProjectSlotsRun, SlotsTopQuery,
    SlotsTopQueryRow, UserSlotsDocument, UserSlotsEntry, UserSlotsRun,
};

/// Reservation slot usage per user, with each user's heaviest jobs.
pub(super) fn user_slots(run: &UserSlotsRun, now: DateTime<Utc>) -> UserSlotsDocument {
    let mut doc = UserSlotsDocument::new();

    for row in &run.slots {
        user_entry(&mut doc, &row.user_id, now).slots += row.slots;
    }
    for row in &run.top_queries {
        user_entry(&mut doc, &row.user_id, now)
            .top_queries
            .insert(row.job_id.clone(), top_query(row));
    }

    doc
}

/// Reservation slot usage per billing project, with its heaviest jobs and
/// users.
pub(super) fn billing_project_slots(
    run: &BillingProjectSlotsRun,
    now: DateTime<Utc>,
) -> BillingProjectSlotsDocument {
    let mut doc = BillingProjectSlotsDocument::new();

    for row in &run.slots {
        billing_project_entry(&mut doc, &row.billing_project_id, now).slots += row.slots;
    }
    for row in &run.top_queries {
        billing_project_entry(&mut doc, &row.billing_project_id, now)
            .top_queries
            .insert(row.job_id.clone(), top_query(row));
    }
    for row in &run.top_users {
        *billing_project_entry(&mut doc, &row.billing_project_id, now)
            .top_users
            .entry(row.user_email.clone())
            .or_default() += row.slots;
    }

    doc
}

fn user_entry<'a>(
    doc: &'a mut UserSlotsDocument,
    user: &str,
    now: DateTime<Utc>,
) -> &'a mut UserSlotsEntry {
    doc.entry(user.to_string()).or_insert_with(|| UserSlotsEntry {
        user_id: user.to_string(),
        slots: 0.0,
        top_queries: BTreeMap::new(),
        last_update: now,
    })
}

fn billing_project_entry<'a>(
    doc: &'a mut BillingProjectSlotsDocument,
    billing_project: &str,
    now: DateTime<Utc>,
) -> &'a mut BillingProjectSlotsEntry {
    doc.entry(billing_project.to_string())
        .or_insert_with(|| BillingProjectSlotsEntry {
            billing_project_id: billing_project.to_string(),
            slots: 0.0,
            top_queries: BTreeMap::new(),
            top_users: BTreeMap::new(),
            last_update: now,
        })
}

fn top_query(row: &SlotsTopQueryRow) -> SlotsTopQuery {
    SlotsTopQuery {
        billing_project_id: row.billing_project_id.clone(),
        user_id: row.user_id.clone(),
        location: row.location.clone(),
        executed_queries: row.executed_queries,
        avg_execution_time_sec: row.avg_execution_time_sec,
        total_execution_time_sec: row.total_execution_time_sec,
        avg_slots: row.avg_slots,
        avg_scan_tb: row.avg_scan_tb,
        total_scan_tb: row.total_scan_tb,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::{BillingProjectSlotsRow, BillingProjectSlotsTopUserRow, UserSlotsRow};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 18, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_user_slots_attach_top_queries() {
        let run = UserSlotsRun {
            slots: vec![UserSlotsRow {
                user_id: "a@example.com".into(),
                slots: 12.0,
            }],
            top_queries: vec![
                SlotsTopQueryRow {
                    user_id: "a@example.com".into(),
                    job_id: "job-1".into(),
                    executed_queries: 4,
                    ..Default::default()
                },
                SlotsTopQueryRow {
                    user_id: "b@example.com".into(),
                    job_id: "job-2".into(),
                    executed_queries: 1,
                    ..Default::default()
                },
            ],
        };

        let doc = user_slots(&run, now());
        assert_eq!(doc["a@example.com"].slots, 12.0);
        assert_eq!(doc["a@example.com"].top_queries["job-1"].executed_queries, 4);
        // A user only seen among the top queries still gets an entry.
        assert_eq!(doc["b@example.com"].slots, 0.0);
        assert_eq!(doc["b@example.com"].last_update, now());
    }

    #[test]
    fn test_billing_project_slots_merge_users() {
        let run = BillingProjectSlotsRun {
            slots: vec![BillingProjectSlotsRow {
                billing_project_id: "bp".into(),
                slots: 3.0,
            }],
            top_queries: vec![],
            top_users: vec![
                BillingProjectSlotsTopUserRow {
                    billing_project_id: "bp".into(),
                    user_email: "a@example.com".into(),
                    slots: 1.0,
                },
                BillingProjectSlotsTopUserRow {
                    billing_project_id: "bp".into(),
                    user_email: "a@example.com".into(),
                    slots: 0.5,
                },
            ],
        };

        let doc = billing_project_slots(&run, now());
        assert_eq!(doc.len(), 1);
        assert_eq!(doc["bp"].top_users["a@example.com"], 1.5);
    }

    #[test]
    fn test_empty_runs_give_empty_documents() {
        assert!(user_slots(&UserSlotsRun::default(), now()).is_empty());
        assert!(billing_project_slots(&BillingProjectSlotsRun::default(), now()).is_empty());
    }
}
