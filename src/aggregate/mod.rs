//! Pure vote aggregation: raw tally rows in, per-category summaries out.
//! No I/O happens here; the coordinator feeds it rows from the vote store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{CategorySummary, NomineeAttributes, NomineeSummary, VoteRow};

struct NomineeAcc {
    nominee_id: i64,
    nominee_name: String,
    attributes: NomineeAttributes,
    votes: i64,
}

/// Turn raw tally rows into one summary per category present in the input.
///
/// Categories keep their first-seen order (the store emits rows in
/// category-id order). Rows naming the same nominee more than once are
/// summed, so itemized vote rows work as well as pre-aggregated ones.
/// Any negative quantity fails the whole call.
pub fn summarize(
    rows: &[VoteRow],
    computed_at: DateTime<Utc>,
) -> Result<Vec<CategorySummary>, AppError> {
    let mut categories: Vec<(i64, String, Vec<NomineeAcc>)> = Vec::new();
    let mut category_index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        if row.vote_total < 0 {
            return Err(AppError::InvalidVoteQuantity {
                nominee_id: row.nominee_id,
                quantity: row.vote_total,
            });
        }

        let index = *category_index.entry(row.category_id).or_insert_with(|| {
            categories.push((row.category_id, row.category_name.clone(), Vec::new()));
            categories.len() - 1
        });

        let nominees = &mut categories[index].2;
        match nominees.iter_mut().find(|n| n.nominee_id == row.nominee_id) {
            Some(acc) => acc.votes += row.vote_total,
            None => nominees.push(NomineeAcc {
                nominee_id: row.nominee_id,
                nominee_name: row.nominee_name.clone(),
                attributes: row.attributes.clone(),
                votes: row.vote_total,
            }),
        }
    }

    let summaries = categories
        .into_iter()
        .map(|(category_id, category_name, nominees)| {
            build_summary(category_id, category_name, nominees, computed_at)
        })
        .collect();

    Ok(summaries)
}

fn build_summary(
    category_id: i64,
    category_name: String,
    mut nominees: Vec<NomineeAcc>,
    computed_at: DateTime<Utc>,
) -> CategorySummary {
    // Deterministic order: votes descending, names ascending break ties.
    nominees.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.nominee_name.cmp(&b.nominee_name))
    });

    let total_votes: i64 = nominees.iter().map(|n| n.votes).sum();
    let max_votes = nominees.iter().map(|n| n.votes).max().unwrap_or(0);

    let nominees = nominees
        .into_iter()
        .map(|acc| NomineeSummary {
            nominee_id: acc.nominee_id,
            nominee_name: acc.nominee_name,
            attributes: acc.attributes,
            votes: acc.votes,
            percentage: percentage(acc.votes, total_votes),
            is_leader: max_votes > 0 && acc.votes == max_votes,
        })
        .collect();

    CategorySummary {
        category_id,
        category_name,
        total_votes,
        nominees,
        computed_at,
    }
}

/// Share of the category total, rounded half-away-from-zero to two
/// decimals. Defined as 0.00 for an empty total.
fn percentage(votes: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}
