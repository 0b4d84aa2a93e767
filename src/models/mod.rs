// Models module - Database entity representations

pub mod business;
pub mod category;
pub mod incentive;
pub mod verification_request;

pub use business::Business;
pub use incentive::{ChainIncentive, Incentive};
pub use verification_request::VerificationRequest;
