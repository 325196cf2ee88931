use std::fmt::Write;

use jiff::{Timestamp, Zoned, civil::Date, tz::TimeZone};

use crate::models::activity::{Activity, Duration};

/// Time given to one organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationTotal {
    pub organization: String,
    pub total_minutes: u64,
    pub activity_count: usize,
}

impl OrganizationTotal {
    pub fn duration(&self) -> Duration {
        Duration::from_minutes(self.total_minutes)
    }
}

/// "45 min", "3 hr" or "3 hr 45 min"
pub fn format_duration(hours: u64, minutes: u64) -> String {
    if hours == 0 {
        format!("{minutes} min")
    } else if minutes == 0 {
        format!("{hours} hr")
    } else {
        format!("{hours} hr {minutes} min")
    }
}

/// Groups activities by organization, in the order organizations first appear
pub fn organization_breakdown(activities: &[Activity]) -> Vec<OrganizationTotal> {
    let mut totals: Vec<OrganizationTotal> = Vec::new();

    for activity in activities {
        match totals
            .iter_mut()
            .find(|t| t.organization == activity.organization)
        {
            Some(total) => {
                total.total_minutes += activity.total_minutes();
                total.activity_count += 1;
            }
            None => totals.push(OrganizationTotal {
                organization: activity.organization.clone(),
                total_minutes: activity.total_minutes(),
                activity_count: 1,
            }),
        }
    }

    totals
}

fn format_long_date(date: Date) -> String {
    date.strftime("%B %-d, %Y").to_string()
}

fn local_date(timestamp: Timestamp, tz: &TimeZone) -> Date {
    Zoned::new(timestamp, tz.clone()).date()
}

/// Markdown summary of every activity, in list order
pub fn generate_report(
    activities: &[Activity],
    total: Duration,
    generated_on: Date,
    tz: &TimeZone,
) -> String {
    let mut report = String::from("# Volunteer Activity Summary\n\n");

    // Writing into a String cannot fail
    let _ = write!(
        report,
        "Generated on: {}\n\n## Total Hours: {} hours and {} minutes\n\n## Activities ({}):\n\n",
        format_long_date(generated_on),
        total.hours,
        total.minutes,
        activities.len()
    );

    for (index, activity) in activities.iter().enumerate() {
        let name = if activity.name.is_empty() {
            "Unnamed Activity"
        } else {
            &activity.name
        };
        let _ = write!(
            report,
            "### {}. {} - {}\nDate: {}\nDuration: {} hours and {} minutes\nDescription: {}\n\n",
            index + 1,
            name,
            activity.organization,
            format_long_date(local_date(activity.date, tz)),
            activity.hours,
            activity.minutes,
            activity.description
        );
    }

    report
}

pub fn report_file_name(date: Date) -> String {
    format!("volunteer-summary-{}.md", date.strftime("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityDraft;
    use jiff::civil::date;
    use uuid::Uuid;

    fn activity(name: &str, organization: &str, hours: u32, minutes: u32) -> Activity {
        Activity::from_draft(
            Uuid::new_v4(),
            ActivityDraft {
                name: name.to_string(),
                organization: organization.to_string(),
                description: String::from("Helped out"),
                date: "2025-03-01T15:00:00Z".parse().unwrap(),
                hours,
                minutes,
            },
        )
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0, 45), "45 min");
        assert_eq!(format_duration(3, 0), "3 hr");
        assert_eq!(format_duration(3, 45), "3 hr 45 min");
        assert_eq!(format_duration(0, 0), "0 min");
    }

    #[test]
    fn test_organization_breakdown_groups_in_first_seen_order() {
        let activities = vec![
            activity("Sort cans", "Food Bank", 1, 30),
            activity("Trail work", "Parks Dept", 2, 0),
            activity("Deliveries", "Food Bank", 0, 45),
        ];

        let breakdown = organization_breakdown(&activities);

        assert_eq!(
            breakdown,
            vec![
                OrganizationTotal {
                    organization: String::from("Food Bank"),
                    total_minutes: 135,
                    activity_count: 2,
                },
                OrganizationTotal {
                    organization: String::from("Parks Dept"),
                    total_minutes: 120,
                    activity_count: 1,
                },
            ]
        );
        assert_eq!(
            breakdown[0].duration(),
            Duration {
                hours: 2,
                minutes: 15
            }
        );
    }

    #[test]
    fn test_generate_report() {
        let activities = vec![
            activity("Trail Cleanup", "Parks Dept", 2, 30),
            activity("", "Food Bank", 0, 45),
        ];
        let total = Duration {
            hours: 3,
            minutes: 15,
        };

        let report = generate_report(&activities, total, date(2025, 3, 5), &TimeZone::UTC);

        let expected = "# Volunteer Activity Summary\n\n\
            Generated on: March 5, 2025\n\n\
            ## Total Hours: 3 hours and 15 minutes\n\n\
            ## Activities (2):\n\n\
            ### 1. Trail Cleanup - Parks Dept\n\
            Date: March 1, 2025\n\
            Duration: 2 hours and 30 minutes\n\
            Description: Helped out\n\n\
            ### 2. Unnamed Activity - Food Bank\n\
            Date: March 1, 2025\n\
            Duration: 0 hours and 45 minutes\n\
            Description: Helped out\n\n";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name(date(2025, 1, 9)),
            "volunteer-summary-2025-01-09.md"
        );
    }
}
