pub mod discovery;
pub mod harness;
pub mod ledger;
pub mod points;
pub mod session;

pub use discovery::{discover_datasets, DatasetFile, DiscoveryError};
pub use harness::{parse_result_output, Harness, ProcessHarness, Trial, TrialFailure};
pub use ledger::{CompletionLedger, LedgerEntry};
pub use points::{load_points, parse_points, Point, PointsError};
pub use session::{run_session, SessionOptions, SessionReport};
