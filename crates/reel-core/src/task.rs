use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content ratings offered by the input form, in display order.
pub const RATING_LABELS: [&str; 4] = ["(G)", "(PG)", "(PG-13)", "(R)"];

/// One watch-list entry.
///
/// `runtime` and `rating` are free text; the store never parses them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub runtime: String,
    pub rating: String,
}

impl Task {
    pub fn new(id: Uuid, title: String, runtime: String, rating: String) -> Self {
        Self {
            id,
            title,
            runtime,
            rating,
        }
    }

    /// The right-hand text of a list row, e.g. `125 min. (PG-13)`.
    pub fn card_detail(&self) -> String {
        format!("{}. {}", self.runtime, self.rating)
    }
}

/// Maps user input onto one of [`RATING_LABELS`].
///
/// Matching ignores case and surrounding parentheses. Empty input means no
/// rating was picked and yields `Some("")`.
pub fn normalize_rating(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(String::new());
    }

    let bare = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed)
        .trim();

    RATING_LABELS
        .iter()
        .find(|label| label[1..label.len() - 1].eq_ignore_ascii_case(bare))
        .map(|label| label.to_string())
}
