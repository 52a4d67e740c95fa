pub mod plurality;

pub use plurality::calculate_results;

use serde::Serialize;

// Generic structure for poll results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub tallies: Vec<OptionTally>, // One entry per option, in display order
    pub total_votes: u64,
    pub leader: Option<usize>,     // Index of the leading option, None before any vote
    pub summary: String,           // Formatted lines, highest count first
}

// Vote count and share for one option
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionTally {
    pub index: usize,
    pub text: String,
    pub votes: u64,
    pub percentage: f64,
}

impl OptionTally {
    /// `"Blue: 1 vote (100.0%)"`
    pub fn line(&self) -> String {
        let noun = if self.votes == 1 { "vote" } else { "votes" };
        format!(
            "{}: {} {} ({})",
            self.text,
            self.votes,
            noun,
            format_percentage(self.percentage)
        )
    }
}

/// Share of `votes` in `total`, as a percentage. Zero when nobody voted.
pub fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        votes as f64 / total as f64 * 100.0
    }
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}
