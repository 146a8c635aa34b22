use crate::domain::card::Card;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for sorting table rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Created,
    Due,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Completion filter for table rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Todo,
    Done,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(SortField::Created),
            "due" => Ok(SortField::Due),
            _ => Err(format!(
                "Invalid sort field '{}'. Valid fields: created, due",
                s
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Ascending),
            "desc" => Ok(SortOrder::Descending),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid orders: asc, desc",
                s
            )),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "todo" => Ok(StatusFilter::Todo),
            "done" => Ok(StatusFilter::Done),
            _ => Err(format!(
                "Invalid status filter '{}'. Valid filters: all, todo, done",
                s
            )),
        }
    }
}

/// Free-text and completion filter applied to table rows
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    pub query: String,
    pub status: StatusFilter,
}

/// Returns the cards matching the filter.
///
/// The query is matched case-insensitively against title and description.
pub fn filter_cards(cards: &[Card], filter: &TableFilter) -> Vec<Card> {
    let query = filter.query.trim().to_lowercase();
    cards
        .iter()
        .filter(|card| match filter.status {
            StatusFilter::All => true,
            StatusFilter::Todo => !card.completed,
            StatusFilter::Done => card.completed,
        })
        .filter(|card| {
            if query.is_empty() {
                return true;
            }
            card.title.to_lowercase().contains(&query)
                || card
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

/// Sorts table rows in place by the given field and order.
pub fn sort_cards(cards: &mut [Card], field: SortField, order: SortOrder) {
    cards.sort_by(|a, b| {
        let cmp = match field {
            SortField::Created => a.created_at.cmp(&b.created_at),
            SortField::Due => compare_option_dates(a.due_date, b.due_date),
        };

        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Compare Option<DateTime> with None sorting after Some
fn compare_option_dates(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a_date), Some(b_date)) => a_date.cmp(&b_date),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn card(title: &str, created_at: DateTime<Utc>, due: Option<DateTime<Utc>>) -> Card {
        Card {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            color_label: None,
            start_date: None,
            due_date: due,
            completed: false,
            completed_at: None,
            order_index: 0,
            created_at,
            updated_at: created_at,
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_filter_by_query_matches_title_and_description() {
        let mut report = card("Write report", base(), None);
        report.description = Some("quarterly numbers".to_string());
        let other = card("Fix login", base(), None);

        let filter = TableFilter {
            query: "QUARTERLY".to_string(),
            ..Default::default()
        };
        let rows = filter_cards(&[report, other], &filter);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Write report");
    }

    #[test]
    fn test_filter_by_completion() {
        let mut done = card("Done", base(), None);
        done.completed = true;
        let todo = card("Todo", base(), None);

        let rows = filter_cards(
            &[done.clone(), todo.clone()],
            &TableFilter {
                status: StatusFilter::Todo,
                ..Default::default()
            },
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Todo");

        let rows = filter_cards(
            &[done, todo],
            &TableFilter {
                status: StatusFilter::Done,
                ..Default::default()
            },
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Done");
    }

    #[test]
    fn test_sort_by_created_descending() {
        let mut rows = vec![
            card("old", base() - Duration::days(2), None),
            card("new", base(), None),
            card("mid", base() - Duration::days(1), None),
        ];

        sort_cards(&mut rows, SortField::Created, SortOrder::Descending);

        let titles: Vec<&str> = rows.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_sort_by_due_puts_missing_dates_last() {
        let mut rows = vec![
            card("no due", base(), None),
            card("soon", base(), Some(base() + Duration::days(1))),
            card("later", base(), Some(base() + Duration::days(5))),
        ];

        sort_cards(&mut rows, SortField::Due, SortOrder::Ascending);

        let titles: Vec<&str> = rows.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["soon", "later", "no due"]);
    }

    #[test]
    fn test_parse_sort_parameters() {
        assert_eq!(SortField::from_str("due").unwrap(), SortField::Due);
        assert_eq!(SortOrder::from_str("DESC").unwrap(), SortOrder::Descending);
        assert_eq!(StatusFilter::from_str("todo").unwrap(), StatusFilter::Todo);
        assert!(SortField::from_str("priority").is_err());
    }
}
