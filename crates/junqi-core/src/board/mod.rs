pub mod routes;
mod state;

pub use routes::{LinkType, RouteMap, SPECIAL_PATHS};
pub use state::{Board, MoveError, MoveOutcome};
