use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::models::Business;
use crate::services::place_match::PlaceCandidate;

/// Upper bound on lookups in one batch request. Enforced before any
/// network call is made.
pub const MAX_BATCH_LOOKUPS: usize = 10;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(thiserror::Error, Debug)]
pub enum PlaceSearchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Place search API error: {0}")]
    ApiError(String),

    #[error("Place search service is not configured")]
    MissingConfig,

    #[error("Batch exceeds {MAX_BATCH_LOOKUPS} lookups (got {0})")]
    BatchTooLarge(usize),
}

impl PlaceSearchError {
    /// Whether the caller should be offered a retry (upstream trouble)
    /// as opposed to fixing the request first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::ApiError(_))
    }
}

// Wire shape of the places text-search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<SearchResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    place_id: String,
    name: String,
    formatted_address: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Synthesizes the free-text search query for a business record
pub fn build_query(business: &Business) -> String {
    [
        business.name.as_str(),
        business.address1.as_str(),
        business.city.as_str(),
        business.state.as_str(),
        business.zip.as_str(),
    ]
    .iter()
    .map(|part| part.trim())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Queries the place-search service with a free-text query, optionally
/// biased toward known coordinates. Zero results is not an error.
#[tracing::instrument(skip(api_base_url, api_key))]
pub async fn search_places(
    api_base_url: &str,
    api_key: &str,
    query: &str,
    bias: Option<(f64, f64)>,
    timeout: Duration,
) -> Result<Vec<PlaceCandidate>, PlaceSearchError> {
    let client = Client::builder().timeout(timeout).build()?;

    let base = api_base_url.trim_end_matches('/');
    let url = format!("{}/textsearch/json", base);

    let mut params = vec![
        ("query".to_string(), query.to_string()),
        ("key".to_string(), api_key.to_string()),
    ];
    if let Some((lat, lng)) = bias {
        params.push(("location".to_string(), format!("{},{}", lat, lng)));
    }

    tracing::debug!(query = %query, "Searching places");

    let response = client.get(&url).query(&params).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!(status = %status, error = %error_text, "Place search request failed");
        return Err(PlaceSearchError::ApiError(format!(
            "Status {}: {}",
            status, error_text
        )));
    }

    let search_response: SearchResponse = response
        .json()
        .await
        .map_err(|e| PlaceSearchError::ApiError(format!("Failed to parse search response: {}", e)))?;

    match search_response.status.as_str() {
        "OK" | "ZERO_RESULTS" => {}
        other => {
            let detail = search_response
                .error_message
                .unwrap_or_else(|| "no detail".to_string());
            tracing::error!(status = %other, detail = %detail, "Place search returned error status");
            return Err(PlaceSearchError::ApiError(format!("{}: {}", other, detail)));
        }
    }

    let candidates = search_response
        .results
        .into_iter()
        .map(|result| {
            let location = result.geometry.and_then(|g| g.location);
            PlaceCandidate {
                place_id: result.place_id,
                name: result.name,
                formatted_address: result.formatted_address,
                lat: location.as_ref().map(|l| l.lat),
                lng: location.as_ref().map(|l| l.lng),
            }
        })
        .collect();

    Ok(candidates)
}

/// One lookup within a batch request
#[derive(Debug, Clone)]
pub struct BatchLookup {
    pub business_id: Uuid,
    pub query: String,
    pub bias: Option<(f64, f64)>,
}

/// Per-item outcome: batch lookups tolerate individual failures
#[derive(Debug)]
pub struct BatchLookupResult {
    pub business_id: Uuid,
    pub result: Result<Vec<PlaceCandidate>, String>,
}

/// Fans out up to [`MAX_BATCH_LOOKUPS`] searches concurrently.
///
/// An oversized batch is rejected before any network call. Individual
/// lookup failures are captured per item rather than aborting the batch;
/// results come back in the order the lookups were submitted.
pub async fn batch_search(
    api_base_url: &str,
    api_key: &str,
    timeout: Duration,
    lookups: Vec<BatchLookup>,
) -> Result<Vec<BatchLookupResult>, PlaceSearchError> {
    if lookups.len() > MAX_BATCH_LOOKUPS {
        return Err(PlaceSearchError::BatchTooLarge(lookups.len()));
    }

    let ids: Vec<Uuid> = lookups.iter().map(|l| l.business_id).collect();
    let mut set = JoinSet::new();
    let count = lookups.len();

    for (index, lookup) in lookups.into_iter().enumerate() {
        let base = api_base_url.to_string();
        let key = api_key.to_string();
        set.spawn(async move {
            let result = search_places(&base, &key, &lookup.query, lookup.bias, timeout)
                .await
                .map_err(|e| e.to_string());
            (
                index,
                BatchLookupResult {
                    business_id: lookup.business_id,
                    result,
                },
            )
        });
    }

    let mut slots: Vec<Option<BatchLookupResult>> = Vec::new();
    slots.resize_with(count, || None);

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, item)) => slots[index] = Some(item),
            Err(e) => {
                tracing::error!(error = %e, "Batch lookup task failed");
            }
        }
    }

    Ok(fill_missing(slots, &ids))
}

/// Pads slots left empty by a failed task with a per-item error, so the
/// caller always gets one result per submitted lookup.
fn fill_missing(slots: Vec<Option<BatchLookupResult>>, ids: &[Uuid]) -> Vec<BatchLookupResult> {
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| BatchLookupResult {
                business_id: ids[index],
                result: Err("Lookup task failed".to_string()),
            })
        })
        .collect()
}

/// Lightweight availability probe used by the health endpoint
pub async fn check_service_health(
    api_base_url: &str,
    api_key: &str,
) -> Result<(), PlaceSearchError> {
    let timeout = Duration::from_secs(5);
    search_places(api_base_url, api_key, "health check", None, timeout).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_business() -> Business {
        Business {
            id: Uuid::new_v4(),
            name: "Joe's Diner".to_string(),
            address1: "100 Main St".to_string(),
            address2: None,
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip: "78701".to_string(),
            lat: Some(30.2672),
            lng: Some(-97.7431),
            place_id: None,
            chain_id: None,
            is_chain: false,
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_query_skips_empty_fields() {
        let mut business = sample_business();
        business.zip = "  ".to_string();

        assert_eq!(build_query(&business), "Joe's Diner 100 Main St Austin TX");
    }

    #[tokio::test]
    async fn test_search_parses_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .and(query_param("query", "Joe's Diner Austin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "place_id": "abc123",
                    "name": "Joe's Diner",
                    "formatted_address": "100 Main St, Austin, TX 78701",
                    "geometry": { "location": { "lat": 30.2672, "lng": -97.7431 } }
                }]
            })))
            .mount(&server)
            .await;

        let candidates = search_places(
            &server.uri(),
            "test-key",
            "Joe's Diner Austin",
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].place_id, "abc123");
        assert_eq!(
            candidates[0].formatted_address.as_deref(),
            Some("100 Main St, Austin, TX 78701")
        );
        assert_eq!(candidates[0].lat, Some(30.2672));
    }

    #[tokio::test]
    async fn test_zero_results_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ZERO_RESULTS",
                "results": []
            })))
            .mount(&server)
            .await;

        let candidates = search_places(
            &server.uri(),
            "test-key",
            "nowhere",
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_retryable_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = search_places(
            &server.uri(),
            "test-key",
            "anything",
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_before_network() {
        let server = MockServer::start().await;

        // Zero calls expected: the cap check runs first
        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": []
            })))
            .expect(0)
            .mount(&server)
            .await;

        let lookups: Vec<BatchLookup> = (0..11)
            .map(|i| BatchLookup {
                business_id: Uuid::new_v4(),
                query: format!("business {}", i),
                bias: None,
            })
            .collect();

        let err = batch_search(&server.uri(), "test-key", Duration::from_secs(5), lookups)
            .await
            .unwrap_err();

        assert!(matches!(err, PlaceSearchError::BatchTooLarge(11)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_lost_batch_slot_becomes_per_item_error() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let slots = vec![
            Some(BatchLookupResult {
                business_id: ids[0],
                result: Ok(Vec::new()),
            }),
            // A failed task never fills its slot
            None,
        ];

        let results = fill_missing(slots, &ids);

        assert_eq!(results.len(), 2);
        assert!(results[0].result.is_ok());
        assert_eq!(results[1].business_id, ids[1]);
        assert!(results[1].result.is_err());
    }

    #[tokio::test]
    async fn test_batch_captures_per_item_failures() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .and(query_param("query", "good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "place_id": "p1",
                    "name": "Good Result",
                    "formatted_address": "1 First St"
                }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .and(query_param("query", "bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let good_id = Uuid::new_v4();
        let bad_id = Uuid::new_v4();
        let lookups = vec![
            BatchLookup {
                business_id: good_id,
                query: "good".to_string(),
                bias: None,
            },
            BatchLookup {
                business_id: bad_id,
                query: "bad".to_string(),
                bias: None,
            },
        ];

        let results = batch_search(&server.uri(), "test-key", Duration::from_secs(5), lookups)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].business_id, good_id);
        assert!(results[0].result.is_ok());
        assert_eq!(results[1].business_id, bad_id);
        assert!(results[1].result.is_err());
    }
}
