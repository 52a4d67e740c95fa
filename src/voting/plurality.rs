use crate::models::Poll;
use crate::voting::{OptionTally, PollResults, percentage};

pub fn calculate_results(poll: &Poll) -> PollResults {
    let total = poll.total_votes();

    let tallies: Vec<OptionTally> = poll
        .options()
        .iter()
        .enumerate()
        .map(|(index, option)| OptionTally {
            index,
            text: option.text.clone(),
            votes: option.votes(),
            percentage: percentage(option.votes(), total),
        })
        .collect();

    // Sort by vote count; the stable sort keeps display order among ties
    let mut ranked: Vec<&OptionTally> = tallies.iter().collect();
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes));

    let leader = if total == 0 {
        None
    } else {
        ranked.first().map(|tally| tally.index)
    };

    let mut summary = String::new();
    for tally in &ranked {
        summary.push_str(&tally.line());
        summary.push('\n');
    }
    summary.push_str(&format!("\n{} total", vote_count(total)));

    PollResults {
        tallies,
        total_votes: total,
        leader,
        summary,
    }
}

fn vote_count(n: u64) -> String {
    if n == 1 {
        "1 vote".to_string()
    } else {
        format!("{} votes", n)
    }
}
