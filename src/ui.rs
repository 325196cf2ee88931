use std::{cell::Cell, rc::Rc};

use colored::*;
use jiff::{SignedDuration, Timestamp, Zoned, tz::TimeZone};
use uuid::Uuid;

use crate::{
    models::{activity::Activity, store::DeletedActivity},
    notifications::EventKind,
    services::{
        activities::ActivityStore,
        report::{OrganizationTotal, format_duration},
    },
    storage::Storage,
};

/// How long a freshly added or restored row stays highlighted
pub const HIGHLIGHT_DURATION: SignedDuration = SignedDuration::from_secs(3);

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Remembers the last added or restored activity for a short while.
///
/// A newer event replaces the older one, so only one row is ever highlighted.
#[derive(Clone, Default)]
pub struct Highlight {
    current: Rc<Cell<Option<(Uuid, Timestamp)>>>,
}

impl Highlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the store's added and restored events
    pub fn attach<S: Storage>(&self, store: &mut ActivityStore<S>) {
        for kind in [EventKind::Added, EventKind::Restored] {
            let current = Rc::clone(&self.current);
            store.subscribe(kind, move |event| {
                current.set(Some((event.activity_id(), Timestamp::now())));
                Ok(())
            });
        }
    }

    pub fn highlighted_at(&self, now: Timestamp) -> Option<Uuid> {
        match self.current.get() {
            Some((id, since)) if now.duration_since(since) < HIGHLIGHT_DURATION => Some(id),
            _ => None,
        }
    }

    pub fn is_highlighted(&self, id: Uuid, now: Timestamp) -> bool {
        self.highlighted_at(now) == Some(id)
    }
}

/// Get the glyph shown in front of an activity row
pub fn get_row_glyph(highlighted: bool) -> ColoredString {
    if highlighted {
        "●".green().bold()
    } else {
        "○".normal()
    }
}

pub fn format_activity_date(timestamp: Timestamp) -> String {
    Zoned::new(timestamp, TimeZone::system())
        .strftime("%b %d, %Y")
        .to_string()
}

pub fn activity_duration(activity: &Activity) -> String {
    format_duration(u64::from(activity.hours), u64::from(activity.minutes))
}

/// Render one activity with its 1-based position, date, name and right-aligned context
pub fn render_activity_line(position: usize, activity: &Activity, highlighted: bool) {
    let terminal_width = get_terminal_width();

    let position_str = format!("{:>3}", position);
    let glyph = get_row_glyph(highlighted);
    let date = format_activity_date(activity.date);
    let name = if activity.name.is_empty() {
        "-"
    } else {
        activity.name.as_str()
    };

    let left_section = format!("  {}  {}  {}  {}", position_str, glyph, date, name);
    let styled_left = if highlighted {
        left_section.green().bold()
    } else {
        left_section.bold()
    };

    let right_section = format!("{}  ·  {}", activity.organization, activity_duration(activity));

    let left_visible_len =
        format!("  {}  {}  {}  {}", position_str, " ", date, name).chars().count();
    let right_visible_len = right_section.chars().count();
    let total_content = left_visible_len + right_visible_len;

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!(
            "{}{}{}",
            styled_left,
            " ".repeat(padding),
            right_section.dimmed()
        );
    } else {
        // Not enough space for right alignment
        println!("{}  {}", styled_left, right_section.dimmed());
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let activity_word = if count == 1 { "activity" } else { "activities" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, activity_word);
}

pub fn render_activity_list(activities: &[Activity], highlight: &Highlight) {
    if activities.is_empty() {
        println!("No activities logged yet");
        return;
    }

    let now = Timestamp::now();
    render_view_header("Activities", activities.len());
    for (index, activity) in activities.iter().enumerate() {
        render_activity_line(index + 1, activity, highlight.is_highlighted(activity.id, now));
    }
}

pub fn render_summary<S: Storage>(store: &ActivityStore<S>) {
    let total = store.total_duration();

    println!("\n  {}\n", "Volunteer Summary".cyan().bold());
    println!(
        "  {}  {}",
        "Total time:".dimmed(),
        format!("{} hr {} min", total.hours, total.minutes).bold()
    );
    println!(
        "  {}  {}",
        "Activities:".dimmed(),
        store.len().to_string().bold()
    );

    if let Some(DeletedActivity { activity, .. }) = store.pending_deletion() {
        println!(
            "\n  {} \"{}\" can be restored with {}",
            "↺".yellow(),
            activity.label(),
            "vtrack undo".bold()
        );
    }
    println!();
}

pub fn move_out_of_range_message(len: usize, from: usize, to: usize) -> String {
    if len == 0 {
        String::from("No activities to move")
    } else {
        format!(
            "Positions must be between 1 and {} (got {} and {})",
            len, from, to
        )
    }
}

/// Confirmation text for `clear`, naming the restorable deletion it will discard
pub fn clear_confirmation_prompt(count: usize, pending: Option<&DeletedActivity>) -> String {
    let mut prompt = match count {
        0 => String::from("There are no activities left."),
        1 => String::from("Delete 1 activity?"),
        count => format!("Delete all {} activities?", count),
    };
    if let Some(DeletedActivity { activity, .. }) = pending {
        prompt.push_str(&format!(
            " The deleted activity \"{}\" will no longer be restorable.",
            activity.label()
        ));
    }
    prompt.push_str(" This cannot be undone.");
    prompt
}

/// Horizontal bar per organization, scaled to the largest total
pub fn render_distribution_chart(breakdown: &[OrganizationTotal]) {
    if breakdown.is_empty() {
        println!("No activities logged yet");
        return;
    }

    let terminal_width = get_terminal_width();
    let grand_total: u64 = breakdown.iter().map(|t| t.total_minutes).sum();
    let largest = breakdown.iter().map(|t| t.total_minutes).max().unwrap_or(0);
    let label_width = breakdown
        .iter()
        .map(|t| t.organization.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);
    let bar_space = terminal_width.saturating_sub(label_width + 28).max(10);

    println!(
        "\n  {}\n",
        "Volunteer Hours by Organization".cyan().bold()
    );

    for total in breakdown {
        let bar_len = if largest == 0 {
            0
        } else {
            ((total.total_minutes as f64 / largest as f64) * bar_space as f64).round() as usize
        };
        let percent = if grand_total == 0 {
            0.0
        } else {
            total.total_minutes as f64 * 100.0 / grand_total as f64
        };
        let label: String = total.organization.chars().take(label_width).collect();
        let duration = total.duration();

        println!(
            "  {:<width$}  {} {}",
            label,
            "█".repeat(bar_len).green(),
            format!(
                "{} ({:.0}%)",
                format_duration(duration.hours, duration.minutes),
                percent
            )
            .dimmed(),
            width = label_width
        );
    }
    println!();
}
