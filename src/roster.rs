//! Searchable, sortable projection of the member roster.
//!
//! The fetched clients are kept as an immutable snapshot; what the table
//! shows is a list of indices into it, rebuilt from scratch whenever the
//! snapshot, the search term or the sort order changes.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::warn;

use crate::expiry::parse_date;
use crate::models::{Client, PlanName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    Email,
    Phone,
    Plan,
    StartDate,
    ExpiryDate,
}

impl SortColumn {
    pub const ALL: [SortColumn; 6] = [
        SortColumn::Name,
        SortColumn::Email,
        SortColumn::Phone,
        SortColumn::Plan,
        SortColumn::StartDate,
        SortColumn::ExpiryDate,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SortColumn::Name => "Member",
            SortColumn::Email => "Email",
            SortColumn::Phone => "Phone",
            SortColumn::Plan => "Plan",
            SortColumn::StartDate => "Start",
            SortColumn::ExpiryDate => "Expiry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    pub column: SortColumn,
    pub direction: SortDirection,
}

#[derive(Debug, Default)]
pub struct RosterView {
    clients: Vec<Client>,
    search: String,
    sort: Option<SortConfig>,
    visible: Vec<usize>,
}

impl RosterView {
    pub fn new(clients: Vec<Client>) -> Self {
        let mut view = Self::default();
        view.replace(clients);
        view
    }

    /// Swap in a freshly fetched roster. Later entries repeating an email
    /// exactly are dropped; emails differing only in case are distinct.
    pub fn replace(&mut self, clients: Vec<Client>) {
        let mut seen = HashSet::new();
        self.clients = clients
            .into_iter()
            .filter(|c| {
                let fresh = seen.insert(c.email.clone());
                if !fresh {
                    warn!(email = %c.email, "duplicate email in roster, keeping first entry");
                }
                fresh
            })
            .collect();
        self.recompute();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.recompute();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Sort by `column`; picking the current column again flips direction.
    pub fn sort_by(&mut self, column: SortColumn) {
        self.sort = Some(match self.sort {
            Some(current) if current.column == column => SortConfig {
                column,
                direction: current.direction.flip(),
            },
            _ => SortConfig {
                column,
                direction: SortDirection::Ascending,
            },
        });
        self.recompute();
    }

    pub fn sort(&self) -> Option<SortConfig> {
        self.sort
    }

    pub fn visible(&self) -> impl Iterator<Item = &Client> + '_ {
        self.visible.iter().map(|&i| &self.clients[i])
    }

    /// The client shown at `row` of the current projection.
    pub fn get(&self, row: usize) -> Option<&Client> {
        self.visible.get(row).and_then(|&i| self.clients.get(i))
    }

    pub fn find(&self, email: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.email == email)
    }

    /// Number of rows currently shown.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Size of the whole roster, ignoring the search.
    pub fn total(&self) -> usize {
        self.clients.len()
    }

    fn recompute(&mut self) {
        let term = self.search.trim().to_lowercase();
        let mut visible: Vec<usize> = (0..self.clients.len())
            .filter(|&i| matches_search(&self.clients[i], &term))
            .collect();

        if let Some(sort) = self.sort {
            let clients = &self.clients;
            visible.sort_by(|&a, &b| {
                let ord = compare(&clients[a], &clients[b], sort.column);
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        self.visible = visible;
    }
}

fn matches_search(client: &Client, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let hit = |field: &str| field.to_lowercase().contains(term);
    hit(&client.name) || hit(&client.email) || client.phone_number.as_deref().is_some_and(hit)
}

/// Ascending order for a column, absent values last.
fn compare(a: &Client, b: &Client, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => nulls_last(Some(&a.name), Some(&b.name), text_cmp),
        SortColumn::Email => nulls_last(Some(&a.email), Some(&b.email), text_cmp),
        SortColumn::Phone => nulls_last(
            non_blank(&a.phone_number),
            non_blank(&b.phone_number),
            text_cmp,
        ),
        SortColumn::Plan => nulls_last(
            a.plan_name.map(PlanName::label),
            b.plan_name.map(PlanName::label),
            text_cmp,
        ),
        SortColumn::StartDate => nulls_last(
            date_of(&a.start_date),
            date_of(&b.start_date),
            NaiveDate::cmp,
        ),
        SortColumn::ExpiryDate => nulls_last(
            date_of(&a.expiry_date),
            date_of(&b.expiry_date),
            NaiveDate::cmp,
        ),
    }
}

fn nulls_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-folded comparison, falling back to byte order so that "ana" and
/// "Ana" still have a fixed relative order.
fn text_cmp<S: AsRef<str>>(a: &S, b: &S) -> Ordering {
    let (a, b) = (a.as_ref(), b.as_ref());
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn non_blank(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.trim().is_empty())
}

fn date_of(value: &Option<String>) -> Option<NaiveDate> {
    value.as_deref().and_then(|raw| parse_date(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(name: &str, email: &str, plan: Option<PlanName>, start: Option<&str>) -> Client {
        Client {
            id: None,
            name: name.to_string(),
            email: email.to_string(),
            phone_number: None,
            plan_name: plan,
            start_date: start.map(str::to_string),
            expiry_date: None,
        }
    }

    fn emails(view: &RosterView) -> Vec<&str> {
        view.visible().map(|c| c.email.as_str()).collect()
    }

    fn sample() -> Vec<Client> {
        let mut carla = client("Carla", "carla@gym.com", Some(PlanName::Yearly), Some("2024-03-01"));
        carla.phone_number = Some("555-0101".to_string());
        vec![
            client("bob", "bob@gym.com", None, None),
            carla,
            client("Alice", "alice@mail.org", Some(PlanName::Monthly), Some("2023-12-31")),
            client("dave", "dave@gym.com", Some(PlanName::Quarterly), Some("2024-01-15T00:00:00Z")),
        ]
    }

    #[test]
    fn empty_search_keeps_original_order() {
        let mut view = RosterView::new(sample());
        view.set_search("   ");
        assert_eq!(
            emails(&view),
            ["bob@gym.com", "carla@gym.com", "alice@mail.org", "dave@gym.com"]
        );
        assert_eq!(view.len(), view.total());
    }

    #[test]
    fn search_is_case_insensitive_over_name_email_phone() {
        let mut view = RosterView::new(sample());

        view.set_search("ALICE");
        assert_eq!(emails(&view), ["alice@mail.org"]);

        view.set_search("GYM.com");
        assert_eq!(emails(&view), ["bob@gym.com", "carla@gym.com", "dave@gym.com"]);

        view.set_search("0101");
        assert_eq!(emails(&view), ["carla@gym.com"]);

        view.set_search("nobody");
        assert!(view.is_empty());
        assert_eq!(view.total(), 4);
    }

    #[test]
    fn same_column_toggles_new_column_resets() {
        let mut view = RosterView::new(sample());

        view.sort_by(SortColumn::Name);
        assert_eq!(view.sort().unwrap().direction, SortDirection::Ascending);
        assert_eq!(
            emails(&view),
            ["alice@mail.org", "bob@gym.com", "carla@gym.com", "dave@gym.com"]
        );

        view.sort_by(SortColumn::Name);
        assert_eq!(view.sort().unwrap().direction, SortDirection::Descending);
        assert_eq!(
            emails(&view),
            ["dave@gym.com", "carla@gym.com", "bob@gym.com", "alice@mail.org"]
        );

        view.sort_by(SortColumn::Email);
        assert_eq!(
            view.sort(),
            Some(SortConfig {
                column: SortColumn::Email,
                direction: SortDirection::Ascending
            })
        );
    }

    #[test]
    fn missing_plan_sorts_last_ascending_first_descending() {
        let mut view = RosterView::new(sample());

        view.sort_by(SortColumn::Plan);
        assert_eq!(
            emails(&view),
            ["alice@mail.org", "dave@gym.com", "carla@gym.com", "bob@gym.com"]
        );

        view.sort_by(SortColumn::Plan);
        assert_eq!(
            emails(&view),
            ["bob@gym.com", "carla@gym.com", "dave@gym.com", "alice@mail.org"]
        );
    }

    #[test]
    fn dates_compare_chronologically_not_lexically() {
        let mut view = RosterView::new(vec![
            client("a", "a@x.com", None, Some("2024-10-01")),
            client("b", "b@x.com", None, Some("2024-09-30")),
            client("c", "c@x.com", None, Some("2024-02-01T10:00:00+05:30")),
            client("d", "d@x.com", None, Some("2023-12-31")),
        ]);

        view.sort_by(SortColumn::StartDate);
        assert_eq!(emails(&view), ["d@x.com", "c@x.com", "b@x.com", "a@x.com"]);
    }

    #[test]
    fn unparseable_dates_count_as_absent() {
        let mut view = RosterView::new(vec![
            client("a", "a@x.com", None, Some("soon")),
            client("b", "b@x.com", None, Some("2024-01-01")),
        ]);
        view.sort_by(SortColumn::StartDate);
        assert_eq!(emails(&view), ["b@x.com", "a@x.com"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut view = RosterView::new(vec![
            client("Zed", "1@x.com", Some(PlanName::Monthly), None),
            client("Amy", "2@x.com", Some(PlanName::Monthly), None),
            client("Kim", "3@x.com", Some(PlanName::Monthly), None),
        ]);

        view.sort_by(SortColumn::Plan);
        assert_eq!(emails(&view), ["1@x.com", "2@x.com", "3@x.com"]);
        view.sort_by(SortColumn::Plan);
        assert_eq!(emails(&view), ["1@x.com", "2@x.com", "3@x.com"]);
    }

    #[test]
    fn filter_and_sort_commute() {
        let mut search_first = RosterView::new(sample());
        search_first.set_search("gym");
        search_first.sort_by(SortColumn::StartDate);

        let mut sort_first = RosterView::new(sample());
        sort_first.sort_by(SortColumn::StartDate);
        sort_first.set_search("gym");

        assert_eq!(emails(&search_first), emails(&sort_first));
        assert_eq!(
            emails(&sort_first),
            ["dave@gym.com", "carla@gym.com", "bob@gym.com"]
        );
    }

    #[test]
    fn replace_is_a_full_swap_and_drops_duplicate_emails() {
        let mut view = RosterView::new(sample());
        view.sort_by(SortColumn::Name);

        view.replace(vec![
            client("Zoe", "zoe@x.com", None, None),
            client("Zoe again", "zoe@x.com", None, None),
            client("Yan", "yan@x.com", None, None),
        ]);

        assert_eq!(view.total(), 2);
        assert_eq!(emails(&view), ["yan@x.com", "zoe@x.com"]);
        assert!(view.find("alice@mail.org").is_none());
        assert_eq!(view.get(1).map(|c| c.name.as_str()), Some("Zoe"));
    }

    #[test]
    fn emails_differing_in_case_are_separate_members() {
        let view = RosterView::new(vec![
            client("Ann", "Ann@x.com", None, None),
            client("ann", "ann@x.com", None, None),
        ]);

        assert_eq!(view.total(), 2);
        assert_eq!(view.find("Ann@x.com").map(|c| c.name.as_str()), Some("Ann"));
        assert_eq!(view.find("ann@x.com").map(|c| c.name.as_str()), Some("ann"));
    }

    #[test]
    fn plan_column_sorts_by_plan_name_text() {
        let mut view = RosterView::new(vec![
            client("a", "m@x.com", Some(PlanName::Monthly), None),
            client("b", "h@x.com", Some(PlanName::HalfYearly), None),
            client("c", "y@x.com", Some(PlanName::Yearly), None),
            client("d", "q@x.com", Some(PlanName::Quarterly), None),
            client("e", "none@x.com", None, None),
        ]);

        view.sort_by(SortColumn::Plan);
        let plans: Vec<&str> = view
            .visible()
            .map(|c| c.plan_name.map_or("-", PlanName::label))
            .collect();
        assert_eq!(plans, ["Half-Yearly", "Monthly", "Quarterly", "Yearly", "-"]);

        view.sort_by(SortColumn::Plan);
        assert_eq!(
            emails(&view),
            ["none@x.com", "y@x.com", "q@x.com", "m@x.com", "h@x.com"]
        );
    }

    #[test]
    fn unassigned_member_sorts_after_assigned() {
        let clients = vec![
            client("A", "a@x.com", None, None),
            client("B", "b@x.com", Some(PlanName::Monthly), Some("2024-01-15")),
        ];
        let mut view = RosterView::new(clients);
        view.sort_by(SortColumn::Plan);
        assert_eq!(emails(&view), ["b@x.com", "a@x.com"]);
    }
}
