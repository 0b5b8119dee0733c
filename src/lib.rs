pub mod amount;
pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod estimator;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod selection;
pub mod submission;
pub mod ui;
pub mod wallet;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use amount::LedgerAmount;
pub use catalog::MatchCatalog;
pub use error::GatewayError;
pub use estimator::{
    BetInput,
    WinningsEstimator,
};
pub use gateway::ContractGateway;
pub use model::{
    Match,
    Side,
};
pub use selection::SelectionCoordinator;
pub use submission::BetSubmission;
