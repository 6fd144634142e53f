//! Tag filter engine: pure composition of accumulated chat history with the
//! association snapshot and an ephemeral selected-tag set.
//!
//! Everything here is synchronous and side-effect free; consumers re-run it on
//! every relevant state change (accumulated chats, association snapshot, or
//! selection). Recency bucketing takes `now` as a parameter so boundaries are
//! testable.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Chat, Tag};

// =============================================================================
// RECENCY BUCKETS
// =============================================================================

/// Fixed recency buckets for the grouped history view.
///
/// A chat falls into exactly one bucket, evaluated in declaration order
/// (Today first). The week and month windows are strict: a chat exactly
/// 7 days old falls to `LastMonth`, exactly 30 days old to `Older`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyBucket {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    Older,
}

impl RecencyBucket {
    /// Classify a creation timestamp relative to `now`.
    ///
    /// Today/Yesterday compare calendar days (UTC); the week and month
    /// windows compare instants.
    pub fn classify(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let chat_day = created_at.date_naive();

        if chat_day == today {
            Self::Today
        } else if today.pred_opt() == Some(chat_day) {
            Self::Yesterday
        } else if created_at > now - Duration::days(7) {
            Self::LastWeek
        } else if created_at > now - Duration::days(30) {
            Self::LastMonth
        } else {
            Self::Older
        }
    }

    /// Section heading for the history view.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::LastWeek => "Last 7 days",
            Self::LastMonth => "Last 30 days",
            Self::Older => "Older than last month",
        }
    }
}

/// Chats grouped by recency bucket, preserving arrival order within each
/// bucket (newest-first, inherited from feed order).
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupedChats {
    pub today: Vec<Chat>,
    pub yesterday: Vec<Chat>,
    pub last_week: Vec<Chat>,
    pub last_month: Vec<Chat>,
    pub older: Vec<Chat>,
}

impl GroupedChats {
    pub fn is_empty(&self) -> bool {
        self.today.is_empty()
            && self.yesterday.is_empty()
            && self.last_week.is_empty()
            && self.last_month.is_empty()
            && self.older.is_empty()
    }

    pub fn len(&self) -> usize {
        self.today.len()
            + self.yesterday.len()
            + self.last_week.len()
            + self.last_month.len()
            + self.older.len()
    }
}

/// Group chats into recency buckets relative to `now`.
pub fn group_chats_by_date(chats: Vec<Chat>, now: DateTime<Utc>) -> GroupedChats {
    let mut groups = GroupedChats::default();
    for chat in chats {
        match RecencyBucket::classify(chat.created_at, now) {
            RecencyBucket::Today => groups.today.push(chat),
            RecencyBucket::Yesterday => groups.yesterday.push(chat),
            RecencyBucket::LastWeek => groups.last_week.push(chat),
            RecencyBucket::LastMonth => groups.last_month.push(chat),
            RecencyBucket::Older => groups.older.push(chat),
        }
    }
    groups
}

// =============================================================================
// TAG FILTER
// =============================================================================

/// Kept/total counts for the "N of M chats" summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub kept: usize,
    pub total: usize,
}

/// Keep the chats matching the selected-tag set.
///
/// Empty selection passes every chat through. Otherwise a chat is kept iff at
/// least one of its associated tags is selected (OR across selected tags).
/// Chats absent from the association snapshot are treated as untagged.
pub fn filter_by_tags(
    chats: &[Chat],
    selected: &HashSet<Uuid>,
    associations: &HashMap<Uuid, Vec<Tag>>,
) -> Vec<Chat> {
    if selected.is_empty() {
        return chats.to_vec();
    }

    chats
        .iter()
        .filter(|chat| {
            associations
                .get(&chat.id)
                .map(|tags| tags.iter().any(|tag| selected.contains(&tag.id)))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// The fully derived history view: filtered, grouped, with summary counts.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredView {
    pub groups: GroupedChats,
    pub summary: FilterSummary,
}

/// Compose the filter and the grouping in one pass over the accumulated feed.
pub fn filtered_view(
    chats: &[Chat],
    selected: &HashSet<Uuid>,
    associations: &HashMap<Uuid, Vec<Tag>>,
    now: DateTime<Utc>,
) -> FilteredView {
    let kept = filter_by_tags(chats, selected, associations);
    let summary = FilterSummary {
        kept: kept.len(),
        total: chats.len(),
    };
    FilteredView {
        groups: group_chats_by_date(kept, now),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visibility;
    use chrono::TimeZone;

    fn chat(id: Uuid, created_at: DateTime<Utc>) -> Chat {
        Chat {
            id,
            created_at,
            title: "chat".to_string(),
            visibility: Visibility::Private,
        }
    }

    fn tag(id: Uuid) -> Tag {
        Tag {
            id,
            name: format!("tag-{}", id),
            created_at: Utc::now(),
            created_by: "user-1".to_string(),
            usage_count: None,
        }
    }

    // Fixed reference point, mid-day to keep calendar math unsurprising.
    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_selection_passes_all_chats() {
        let now = noon();
        let chats: Vec<Chat> = (0..4).map(|_| chat(Uuid::new_v4(), now)).collect();
        let kept = filter_by_tags(&chats, &HashSet::new(), &HashMap::new());
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn test_or_semantics_across_selected_tags() {
        let now = noon();
        let tag_a = tag(Uuid::new_v4());
        let tag_b = tag(Uuid::new_v4());

        let c1 = chat(Uuid::new_v4(), now); // {A}
        let c2 = chat(Uuid::new_v4(), now); // {B}
        let c3 = chat(Uuid::new_v4(), now); // {A,B}
        let c4 = chat(Uuid::new_v4(), now); // {}

        let mut assoc = HashMap::new();
        assoc.insert(c1.id, vec![tag_a.clone()]);
        assoc.insert(c2.id, vec![tag_b.clone()]);
        assoc.insert(c3.id, vec![tag_a.clone(), tag_b.clone()]);
        assoc.insert(c4.id, vec![]);

        let chats = vec![c1.clone(), c2.clone(), c3.clone(), c4.clone()];

        let select_a: HashSet<Uuid> = [tag_a.id].into_iter().collect();
        let kept: Vec<Uuid> = filter_by_tags(&chats, &select_a, &assoc)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(kept, vec![c1.id, c3.id]);

        let select_ab: HashSet<Uuid> = [tag_a.id, tag_b.id].into_iter().collect();
        let kept: Vec<Uuid> = filter_by_tags(&chats, &select_ab, &assoc)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(kept, vec![c1.id, c2.id, c3.id]);
    }

    #[test]
    fn test_chat_missing_from_snapshot_is_untagged() {
        let now = noon();
        let tag_a = tag(Uuid::new_v4());
        let c1 = chat(Uuid::new_v4(), now);
        let selected: HashSet<Uuid> = [tag_a.id].into_iter().collect();
        let kept = filter_by_tags(std::slice::from_ref(&c1), &selected, &HashMap::new());
        assert!(kept.is_empty());
    }

    #[test]
    fn test_bucket_two_hours_ago_is_today() {
        let now = noon();
        assert_eq!(
            RecencyBucket::classify(now - Duration::hours(2), now),
            RecencyBucket::Today
        );
    }

    #[test]
    fn test_bucket_25_hours_ago_is_yesterday() {
        let now = noon();
        assert_eq!(
            RecencyBucket::classify(now - Duration::hours(25), now),
            RecencyBucket::Yesterday
        );
    }

    #[test]
    fn test_bucket_ten_days_ago_is_last_month() {
        let now = noon();
        assert_eq!(
            RecencyBucket::classify(now - Duration::days(10), now),
            RecencyBucket::LastMonth
        );
    }

    #[test]
    fn test_bucket_three_days_ago_is_last_week() {
        let now = noon();
        assert_eq!(
            RecencyBucket::classify(now - Duration::days(3), now),
            RecencyBucket::LastWeek
        );
    }

    #[test]
    fn test_bucket_exactly_seven_days_falls_to_last_month() {
        // Strict `>` comparison: exactly one week old is not "last 7 days".
        let now = noon();
        assert_eq!(
            RecencyBucket::classify(now - Duration::days(7), now),
            RecencyBucket::LastMonth
        );
    }

    #[test]
    fn test_bucket_exactly_thirty_days_falls_to_older() {
        let now = noon();
        assert_eq!(
            RecencyBucket::classify(now - Duration::days(30), now),
            RecencyBucket::Older
        );
    }

    #[test]
    fn test_grouping_preserves_arrival_order() {
        let now = noon();
        let newer = chat(Uuid::new_v4(), now - Duration::hours(1));
        let older = chat(Uuid::new_v4(), now - Duration::hours(3));
        let groups = group_chats_by_date(vec![newer.clone(), older.clone()], now);
        let ids: Vec<Uuid> = groups.today.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn test_filtered_view_summary_counts() {
        let now = noon();
        let tag_a = tag(Uuid::new_v4());
        let c1 = chat(Uuid::new_v4(), now);
        let c2 = chat(Uuid::new_v4(), now);
        let mut assoc = HashMap::new();
        assoc.insert(c1.id, vec![tag_a.clone()]);

        let selected: HashSet<Uuid> = [tag_a.id].into_iter().collect();
        let view = filtered_view(&[c1, c2], &selected, &assoc, now);
        assert_eq!(view.summary, FilterSummary { kept: 1, total: 2 });
        assert_eq!(view.groups.len(), 1);
    }

    #[test]
    fn test_bucket_labels() {
        assert_eq!(RecencyBucket::Today.label(), "Today");
        assert_eq!(RecencyBucket::Older.label(), "Older than last month");
    }
}
