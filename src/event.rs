use crate::market::{Bid, Requirement, Role};
use serde::{Deserialize, Serialize};

/// Everything that happened to the marketplace, in commit order.
///
/// Wrapped per originating service so followers can match on the
/// source without knowing every payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Api(ApiEvent),
    #[cfg(test)]
    Test,
}

/// Domain events appended by the api service, in the same transaction
/// as the mutation they describe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiEvent {
    UserRegistered { clerk_user_id: String, role: Role },
    RequirementPosted(Requirement),
    BidPlaced(Bid),
}
