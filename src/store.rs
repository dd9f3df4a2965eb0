//! Store ports for marketplace entities
//!
//! Each store is generic over the persistence backend. Plain reads go
//! through a connection; anything that must be atomic with other
//! writes goes through a transaction (`*_tr`).
mod in_memory;
pub mod postgres;

pub use self::in_memory::*;

use crate::market::{Bid, NewBid, NewRequirement, Requirement, RequirementId, UserProfile};
use crate::persistence::{ConnectionOf, Persistence, TransactionOf};
use anyhow::Result;
use std::sync::Arc;

pub trait UserStore {
    type Persistence: Persistence;

    fn get(
        &self,
        conn: &mut ConnectionOf<Self::Persistence>,
        clerk_user_id: &str,
    ) -> Result<Option<UserProfile>>;

    /// Register or refresh a profile, keyed by the identity
    /// collaborator's user id.
    fn upsert_tr<'a>(
        &self,
        transaction: &mut TransactionOf<'a, Self::Persistence>,
        profile: &UserProfile,
    ) -> Result<()>;
}

pub trait RequirementStore {
    type Persistence: Persistence;

    fn get(
        &self,
        conn: &mut ConnectionOf<Self::Persistence>,
        id: RequirementId,
    ) -> Result<Option<Requirement>>;

    fn list_by_state(
        &self,
        conn: &mut ConnectionOf<Self::Persistence>,
        state: &str,
    ) -> Result<Vec<Requirement>>;

    /// Insert an open requirement and assign its id.
    fn insert_tr<'a>(
        &self,
        transaction: &mut TransactionOf<'a, Self::Persistence>,
        new: &NewRequirement,
    ) -> Result<Requirement>;
}

pub trait BidStore {
    type Persistence: Persistence;

    fn list_by_state(
        &self,
        conn: &mut ConnectionOf<Self::Persistence>,
        state: &str,
    ) -> Result<Vec<Bid>>;

    /// Current lowest bid for an item within a state, read under the
    /// same transaction that will write the new bid.
    fn lowest_for_item_tr<'a>(
        &self,
        transaction: &mut TransactionOf<'a, Self::Persistence>,
        item: &str,
        state: &str,
    ) -> Result<Option<u64>>;

    /// Create or replace the supplier's active bid for item+state.
    fn upsert_tr<'a>(
        &self,
        transaction: &mut TransactionOf<'a, Self::Persistence>,
        new: &NewBid,
    ) -> Result<Bid>;
}

pub type SharedUserStore<P> = Arc<dyn UserStore<Persistence = P> + Send + Sync + 'static>;
pub type SharedRequirementStore<P> =
    Arc<dyn RequirementStore<Persistence = P> + Send + Sync + 'static>;
pub type SharedBidStore<P> = Arc<dyn BidStore<Persistence = P> + Send + Sync + 'static>;
