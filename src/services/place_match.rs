use serde::{Deserialize, Serialize};

use crate::models::Business;

/// One result from the external place-search service, offered as a
/// possible match for a business record during duplicate review.
/// Ephemeral: scored per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: String,
    pub formatted_address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: PlaceCandidate,
    pub score: u32,
    pub best_match: bool,
}

/// Heuristic similarity score between a business record and a place
/// candidate, from name and address overlap.
///
/// The score is a relative ranking input, not a probability: overlaps
/// stack and the total can exceed 100. Rules, in evaluation order:
///
/// 1. Name equality (case-insensitive): +50
/// 2. Else substring containment either direction: +30
/// 3. Else +10 per business-name word longer than 3 characters contained
///    in some candidate-name word
/// 4. Candidate's formatted address containing the street: +30,
///    the city: +10, the state: +5, the zip: +10
///
/// Absent or empty fields contribute zero to their rule.
pub fn match_score(business: &Business, candidate: &PlaceCandidate) -> u32 {
    let business_name = business.name.trim().to_lowercase();
    let candidate_name = candidate.name.trim().to_lowercase();

    let mut score = 0u32;

    if !business_name.is_empty() && !candidate_name.is_empty() {
        if business_name == candidate_name {
            score += 50;
        } else if candidate_name.contains(&business_name)
            || business_name.contains(&candidate_name)
        {
            score += 30;
        } else {
            for word in business_name.split_whitespace().filter(|w| w.len() > 3) {
                if candidate_name.split_whitespace().any(|cw| cw.contains(word)) {
                    score += 10;
                }
            }
        }
    }

    let address = candidate
        .formatted_address
        .as_deref()
        .unwrap_or("")
        .to_lowercase();

    score += address_points(&address, &business.address1, 30);
    score += address_points(&address, &business.city, 10);
    score += address_points(&address, &business.state, 5);
    score += address_points(&address, &business.zip, 10);

    score
}

/// Awards `points` when the candidate address contains the field.
/// Empty fields never match; `contains("")` is trivially true.
fn address_points(candidate_address: &str, field: &str, points: u32) -> u32 {
    let needle = field.trim().to_lowercase();
    if !needle.is_empty() && candidate_address.contains(&needle) {
        points
    } else {
        0
    }
}

/// Scores candidates against a business and sorts them best-first.
///
/// The sort is stable, so tied candidates keep their original relative
/// order. The top entry is flagged `best_match` for UI emphasis only;
/// there is no auto-assignment threshold and a human always confirms.
pub fn rank_candidates(business: &Business, candidates: Vec<PlaceCandidate>) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let score = match_score(business, &candidate);
            ScoredCandidate {
                candidate,
                score,
                best_match: false,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));

    if let Some(top) = scored.first_mut() {
        top.best_match = true;
    }

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn business(name: &str, address1: &str, city: &str, state: &str, zip: &str) -> Business {
        Business {
            id: Uuid::new_v4(),
            name: name.to_string(),
            address1: address1.to_string(),
            address2: None,
            city: city.to_string(),
            state: state.to_string(),
            zip: zip.to_string(),
            lat: None,
            lng: None,
            place_id: None,
            chain_id: None,
            is_chain: false,
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn candidate(name: &str, formatted_address: Option<&str>) -> PlaceCandidate {
        PlaceCandidate {
            place_id: "place-1".to_string(),
            name: name.to_string(),
            formatted_address: formatted_address.map(String::from),
            lat: None,
            lng: None,
        }
    }

    #[test]
    fn test_full_overlap_scores_105() {
        let b = business("Joe's Diner", "100 Main St", "Austin", "TX", "78701");
        let c = candidate("Joe's Diner", Some("100 Main St, Austin, TX 78701"));

        // 50 name + 30 street + 10 city + 5 state + 10 zip
        assert_eq!(match_score(&b, &c), 105);
    }

    #[test]
    fn test_exact_name_scores_at_least_50() {
        let b = business("Lone Star BBQ", "1 Elm St", "Dallas", "TX", "75001");
        let c = candidate("lone star bbq", None);

        assert!(match_score(&b, &c) >= 50);
    }

    #[test]
    fn test_substring_name_scores_30() {
        let b = business("Lone Star BBQ", "", "", "", "");
        let c = candidate("Lone Star BBQ and Grill", None);

        assert_eq!(match_score(&b, &c), 30);
    }

    #[test]
    fn test_token_overlap_scores_per_word() {
        let b = business("Riverside Garden Cafe", "", "", "", "");
        // No containment either direction; "riverside" and "garden" each
        // appear in a candidate word, "cafe" is too short to count.
        let c = candidate("Garden Riverside Bistro", None);

        assert_eq!(match_score(&b, &c), 20);
    }

    #[test]
    fn test_zip_only_scores_exactly_10() {
        let b = business("Acme Hardware", "55 Oak Ave", "Tulsa", "OK", "74101");
        let c = candidate("Totally Different", Some("74101"));

        assert_eq!(match_score(&b, &c), 10);
    }

    #[test]
    fn test_missing_formatted_address_contributes_zero() {
        let b = business("Acme Hardware", "55 Oak Ave", "Tulsa", "OK", "74101");
        let c = candidate("Acme Hardware", None);

        assert_eq!(match_score(&b, &c), 50);
    }

    #[test]
    fn test_empty_business_fields_award_nothing() {
        let b = business("Acme", "", "", "", "");
        let c = candidate("Unrelated", Some("100 Main St, Austin, TX 78701"));

        assert_eq!(match_score(&b, &c), 0);
    }

    #[test]
    fn test_ranking_sorts_descending_and_flags_best() {
        let b = business("Joe's Diner", "100 Main St", "Austin", "TX", "78701");
        let candidates = vec![
            candidate("Unrelated Shop", None),
            candidate("Joe's Diner", Some("100 Main St, Austin, TX 78701")),
            candidate("Joe's Diner Express", None),
        ];

        let ranked = rank_candidates(&b, candidates);

        assert_eq!(ranked[0].candidate.name, "Joe's Diner");
        assert!(ranked[0].best_match);
        assert!(ranked.iter().skip(1).all(|c| !c.best_match));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_tied_scores_keep_original_order() {
        let b = business("Acme", "", "", "", "78701");
        let mut first = candidate("First", Some("78701"));
        first.place_id = "a".to_string();
        let mut second = candidate("Second", Some("78701"));
        second.place_id = "b".to_string();

        let ranked = rank_candidates(&b, vec![first, second]);

        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].candidate.place_id, "a");
        assert_eq!(ranked[1].candidate.place_id, "b");
    }
}
