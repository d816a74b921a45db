//! Per-pair failure taxonomy.
//!
//! None of these abort a worker: each one demotes the pair to a miss.

use crate::models::MissReason;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommuteError {
    /// The code's region key is missing from the coordinate table, or the
    /// code is too short to carry one.
    #[error("no coordinate table for region '{region}' (code {code})")]
    UnknownRegion { code: String, region: String },

    /// The region exists but does not list this code.
    #[error("code {code} not found in region '{region}'")]
    UnknownCode { code: String, region: String },

    /// Backend unreachable, timed out, or answered with an error status.
    #[error("routing backend unavailable: {0}")]
    RoutingUnavailable(String),

    /// Backend answered but produced no route.
    #[error("routing backend found no route")]
    NoRouteFound,
}

impl CommuteError {
    pub fn reason(&self) -> MissReason {
        match self {
            CommuteError::UnknownRegion { .. } => MissReason::UnknownRegion,
            CommuteError::UnknownCode { .. } => MissReason::UnknownCode,
            CommuteError::RoutingUnavailable(_) => MissReason::RoutingUnavailable,
            CommuteError::NoRouteFound => MissReason::NoRouteFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_mapping() {
        let err = CommuteError::UnknownCode {
            code: "060010002".to_string(),
            region: "06".to_string(),
        };
        assert_eq!(err.reason(), MissReason::UnknownCode);
        assert_eq!(err.to_string(), "code 060010002 not found in region '06'");

        assert_eq!(
            CommuteError::RoutingUnavailable("HTTP 500".into()).reason(),
            MissReason::RoutingUnavailable
        );
        assert_eq!(CommuteError::NoRouteFound.reason(), MissReason::NoRouteFound);
    }
}
