use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// UUID to identify the activity, assigned once on creation
    pub id: Uuid,
    /// Name of the activity, may be empty
    pub name: String,
    /// Organization the time was given to
    pub organization: String,
    /// Free-text description
    pub description: String,
    /// When the activity took place
    pub date: Timestamp,
    /// Whole hours spent
    pub hours: u32,
    /// Remaining minutes spent
    pub minutes: u32,
}

impl Activity {
    pub fn from_draft(id: Uuid, draft: ActivityDraft) -> Self {
        Self {
            id,
            name: draft.name,
            organization: draft.organization,
            description: draft.description,
            date: draft.date,
            hours: draft.hours,
            minutes: draft.minutes,
        }
    }

    pub fn total_minutes(&self) -> u64 {
        u64::from(self.hours) * 60 + u64::from(self.minutes)
    }

    /// Label used in messages: the name, or the organization when unnamed
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.organization
        } else {
            &self.name
        }
    }
}

/// An activity that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDraft {
    pub name: String,
    pub organization: String,
    pub description: String,
    pub date: Timestamp,
    pub hours: u32,
    pub minutes: u32,
}

impl Default for ActivityDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            organization: String::new(),
            description: String::new(),
            date: Timestamp::UNIX_EPOCH,
            hours: 0,
            minutes: 0,
        }
    }
}

impl From<Activity> for ActivityDraft {
    fn from(activity: Activity) -> Self {
        Self {
            name: activity.name,
            organization: activity.organization,
            description: activity.description,
            date: activity.date,
            hours: activity.hours,
            minutes: activity.minutes,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ActivityInputError {
    #[error("Activity name is required")]
    MissingName,

    #[error("Organization name is required")]
    MissingOrganization,

    #[error("Description is required")]
    MissingDescription,

    #[error("Minutes must be less than 60 (got {0})")]
    MinutesOutOfRange(u32),

    #[error("Duration must be greater than 0")]
    ZeroDuration,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate(String),
}

impl ActivityDraft {
    /// Builds a draft from raw command arguments and validates it
    pub fn from_command_args(
        name: String,
        organization: String,
        description: String,
        date: Option<String>,
        hours: u32,
        minutes: u32,
    ) -> Result<ActivityDraft, ActivityInputError> {
        let date = match date {
            Some(raw) => parse_activity_date(&raw)?,
            None => Timestamp::now(),
        };

        let draft = ActivityDraft {
            name,
            organization,
            description,
            date,
            hours,
            minutes,
        };
        draft.validate()?;

        Ok(draft)
    }

    /// Form rules. The store accepts any draft, these are enforced by callers.
    pub fn validate(&self) -> Result<(), ActivityInputError> {
        if self.name.trim().is_empty() {
            return Err(ActivityInputError::MissingName);
        }
        if self.organization.trim().is_empty() {
            return Err(ActivityInputError::MissingOrganization);
        }
        if self.description.trim().is_empty() {
            return Err(ActivityInputError::MissingDescription);
        }
        if self.minutes > 59 {
            return Err(ActivityInputError::MinutesOutOfRange(self.minutes));
        }
        if self.hours == 0 && self.minutes == 0 {
            return Err(ActivityInputError::ZeroDuration);
        }
        Ok(())
    }
}

/// Accepts a civil date (midnight in the system time zone) or a full timestamp
pub fn parse_activity_date(raw: &str) -> Result<Timestamp, ActivityInputError> {
    let trimmed = raw.trim();

    if let Ok(timestamp) = trimmed.parse::<Timestamp>() {
        return Ok(timestamp);
    }

    trimmed
        .parse::<Date>()
        .ok()
        .and_then(|date| date.to_zoned(TimeZone::system()).ok())
        .map(|zoned| zoned.timestamp())
        .ok_or_else(|| ActivityInputError::InvalidDate(raw.to_string()))
}

/// A length of time split into hours and minutes, with minutes below 60
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Duration {
    pub hours: u64,
    pub minutes: u64,
}

impl Duration {
    pub fn from_minutes(total_minutes: u64) -> Self {
        Self {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> ActivityDraft {
        ActivityDraft {
            name: String::from("Trail Cleanup"),
            organization: String::from("Parks Dept"),
            description: String::from("Picked up litter"),
            hours: 2,
            minutes: 30,
            ..ActivityDraft::default()
        }
    }

    #[test]
    fn test_validate_accepts_complete_draft() {
        assert_eq!(valid_draft().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let draft = ActivityDraft {
            name: String::from("   "),
            ..valid_draft()
        };
        assert_eq!(draft.validate(), Err(ActivityInputError::MissingName));

        let draft = ActivityDraft {
            organization: String::new(),
            ..valid_draft()
        };
        assert_eq!(draft.validate(), Err(ActivityInputError::MissingOrganization));

        let draft = ActivityDraft {
            description: String::new(),
            ..valid_draft()
        };
        assert_eq!(draft.validate(), Err(ActivityInputError::MissingDescription));
    }

    #[test]
    fn test_validate_rejects_bad_durations() {
        let draft = ActivityDraft {
            hours: 0,
            minutes: 0,
            ..valid_draft()
        };
        assert_eq!(draft.validate(), Err(ActivityInputError::ZeroDuration));

        let draft = ActivityDraft {
            minutes: 60,
            ..valid_draft()
        };
        assert_eq!(draft.validate(), Err(ActivityInputError::MinutesOutOfRange(60)));

        let draft = ActivityDraft {
            hours: 0,
            minutes: 15,
            ..valid_draft()
        };
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn test_parse_activity_date_accepts_timestamps() {
        let parsed = parse_activity_date("2024-03-01T00:00:00.000Z").unwrap();
        assert_eq!(parsed, "2024-03-01T00:00:00Z".parse::<Timestamp>().unwrap());
    }

    #[test]
    fn test_parse_activity_date_accepts_civil_dates() {
        let parsed = parse_activity_date("2024-03-01").unwrap();
        let zoned = jiff::Zoned::new(parsed, TimeZone::system());
        assert_eq!(zoned.date(), jiff::civil::date(2024, 3, 1));
    }

    #[test]
    fn test_parse_activity_date_rejects_garbage() {
        assert_eq!(
            parse_activity_date("next tuesday"),
            Err(ActivityInputError::InvalidDate(String::from("next tuesday")))
        );
    }

    #[test]
    fn test_from_command_args_validates() {
        let result = ActivityDraft::from_command_args(
            String::from("Food bank"),
            String::from("Community Pantry"),
            String::from("Sorted cans"),
            Some(String::from("2025-01-10")),
            0,
            0,
        );
        assert_eq!(result, Err(ActivityInputError::ZeroDuration));
    }

    #[test]
    fn test_duration_from_minutes() {
        assert_eq!(
            Duration::from_minutes(150),
            Duration {
                hours: 2,
                minutes: 30
            }
        );
        assert_eq!(
            Duration::from_minutes(59),
            Duration {
                hours: 0,
                minutes: 59
            }
        );
    }

    #[test]
    fn test_activity_json_shape() {
        let activity = Activity::from_draft(
            Uuid::nil(),
            ActivityDraft {
                date: "2024-03-01T00:00:00Z".parse().unwrap(),
                ..valid_draft()
            },
        );
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["organization"], "Parks Dept");
        assert_eq!(value["date"], "2024-03-01T00:00:00Z");
        assert_eq!(value["hours"], 2);
        assert_eq!(value["minutes"], 30);
    }
}
