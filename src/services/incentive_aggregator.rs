use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::models::{Business, ChainIncentive, Incentive};

pub const SCOPE_LOCAL: &str = "local";
pub const SCOPE_CHAIN_WIDE: &str = "chain_wide";

/// One entry in the merged incentive view for a business page.
///
/// Chain-wide entries carry a synthesized `chain_`-prefixed identifier so
/// they can never collide with a real location-incentive ID; they are
/// read-only when viewed from a location page.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedIncentive {
    pub id: String,
    pub scope: String, // "local" or "chain_wide"
    pub is_chain_wide: bool,
    pub categories: Vec<String>,
    pub amount: f64,
    pub discount_type: String,
    pub information: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_date: String, // human-readable, e.g. "06/15/2024"
}

fn format_created(created_at: DateTime<Utc>) -> String {
    created_at.format("%m/%d/%Y").to_string()
}

fn from_local(incentive: Incentive) -> AggregatedIncentive {
    AggregatedIncentive {
        id: incentive.id.to_string(),
        scope: SCOPE_LOCAL.to_string(),
        is_chain_wide: false,
        categories: incentive.categories,
        amount: incentive.amount,
        discount_type: incentive.discount_type,
        information: incentive.information,
        is_active: incentive.is_active,
        created_at: incentive.created_at,
        created_date: format_created(incentive.created_at),
    }
}

fn from_chain(incentive: ChainIncentive) -> AggregatedIncentive {
    AggregatedIncentive {
        id: format!("chain_{}", incentive.id),
        scope: SCOPE_CHAIN_WIDE.to_string(),
        is_chain_wide: true,
        categories: incentive.categories,
        amount: incentive.amount,
        discount_type: incentive.discount_type,
        information: incentive.information,
        is_active: incentive.is_active.unwrap_or(true),
        created_at: incentive.created_at,
        created_date: format_created(incentive.created_at),
    }
}

/// Merges location incentives with the chain-wide fetch outcome.
///
/// Chain rows whose active flag is explicitly false are dropped; a failed
/// chain fetch is logged and tolerated, leaving the local results
/// untouched. Local entries come first, though callers must not rely on
/// ordering.
pub fn merge(
    local: Vec<Incentive>,
    chain: Option<Result<Vec<ChainIncentive>, sqlx::Error>>,
) -> Vec<AggregatedIncentive> {
    let mut merged: Vec<AggregatedIncentive> = local.into_iter().map(from_local).collect();

    match chain {
        Some(Ok(rows)) => {
            merged.extend(
                rows.into_iter()
                    .filter(|row| row.is_active != Some(false))
                    .map(from_chain),
            );
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Chain incentive fetch failed, returning local results only");
        }
        None => {}
    }

    merged
}

/// Resolves the full incentive set visible for one business.
///
/// The local and chain fetches are independent reads and run
/// concurrently. A local fetch failure propagates; a chain fetch failure
/// degrades to local-only results.
pub async fn load_for_business(
    pool: &PgPool,
    business: &Business,
) -> Result<Vec<AggregatedIncentive>, sqlx::Error> {
    match business.chain_id {
        Some(chain_id) => {
            let (local, chain) = tokio::join!(
                Incentive::list_for_business(pool, business.id),
                ChainIncentive::list_for_chain(pool, chain_id),
            );
            Ok(merge(local?, Some(chain)))
        }
        None => {
            let local = Incentive::list_for_business(pool, business.id).await?;
            Ok(merge(local, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn local_incentive(information: &str) -> Incentive {
        Incentive {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            categories: vec!["veteran".to_string()],
            amount: 10.0,
            discount_type: "percentage".to_string(),
            information: information.to_string(),
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
        }
    }

    fn chain_incentive(information: &str, is_active: Option<bool>) -> ChainIncentive {
        ChainIncentive {
            id: Uuid::new_v4(),
            chain_id: Uuid::new_v4(),
            categories: vec!["active-duty".to_string()],
            amount: 15.0,
            discount_type: "percentage".to_string(),
            information: information.to_string(),
            is_active,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_standalone_business_has_no_chain_entries() {
        let merged = merge(vec![local_incentive("10% off")], None);

        assert_eq!(merged.len(), 1);
        assert!(merged.iter().all(|i| !i.is_chain_wide));
        assert!(merged.iter().all(|i| i.scope == SCOPE_LOCAL));
    }

    #[test]
    fn test_chain_fetch_failure_keeps_local_results() {
        let local = vec![local_incentive("10% off"), local_incentive("free coffee")];

        let merged = merge(local, Some(Err(sqlx::Error::PoolTimedOut)));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].information, "10% off");
        assert_eq!(merged[1].information, "free coffee");
        assert!(merged.iter().all(|i| !i.is_chain_wide));
    }

    #[test]
    fn test_chain_entries_tagged_and_prefixed() {
        let chain = chain_incentive("15% off chain-wide", Some(true));
        let chain_id = chain.id;

        let merged = merge(vec![local_incentive("10% off")], Some(Ok(vec![chain])));

        assert_eq!(merged.len(), 2);
        let chain_entry = &merged[1];
        assert!(chain_entry.is_chain_wide);
        assert_eq!(chain_entry.scope, SCOPE_CHAIN_WIDE);
        assert_eq!(chain_entry.id, format!("chain_{}", chain_id));
    }

    #[test]
    fn test_explicitly_inactive_chain_rows_dropped() {
        let chain = vec![
            chain_incentive("still on", None),
            chain_incentive("still on too", Some(true)),
            chain_incentive("retired", Some(false)),
        ];

        let merged = merge(Vec::new(), Some(Ok(chain)));

        assert_eq!(merged.len(), 2);
        // A missing flag counts as active
        assert!(merged.iter().all(|i| i.is_active));
    }

    #[test]
    fn test_created_date_is_formatted() {
        let merged = merge(vec![local_incentive("10% off")], None);

        assert_eq!(merged[0].created_date, "06/15/2024");
    }
}
