// Services module - Business logic

pub mod incentive_aggregator;
pub mod place_match;
pub mod place_search;
