//! Routing policy and path computation.

pub mod mode;
pub mod paths;

pub use mode::{ModeParseError, RoutingMode};
pub use paths::{compute_all_pairs, shortest_route, Route, RouteTable};
