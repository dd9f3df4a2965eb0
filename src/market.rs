//! Marketplace domain
//!
//! Pure logic for aggregating vendor demand and validating supplier
//! bids. Nothing in here does I/O; the stores and the api service
//! feed snapshots in and ship the results out.
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ItemId = String;
pub type ItemIdRef<'a> = &'a str;

/// Whole rupees. Negative amounts are unrepresentable by construction.
pub type Amount = u64;
pub type Quantity = u64;
pub type RequirementId = u64;
pub type BidId = u64;

/// Unit of measure for a requirement.
///
/// Units the aggregator doesn't know about are carried through
/// opaquely rather than rejected; the aggregator never interprets
/// them beyond display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    Kg,
    Grams,
    Liters,
    Pieces,
    Bags,
    Meters,
    Sheets,
    Other(String),
}

impl From<String> for Unit {
    fn from(s: String) -> Self {
        match s.as_str() {
            "kg" => Unit::Kg,
            "grams" => Unit::Grams,
            "liters" => Unit::Liters,
            "pieces" => Unit::Pieces,
            "bags" => Unit::Bags,
            "meters" => Unit::Meters,
            "sheets" => Unit::Sheets,
            _ => Unit::Other(s),
        }
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Kg => "kg".to_owned(),
            Unit::Grams => "grams".to_owned(),
            Unit::Liters => "liters".to_owned(),
            Unit::Pieces => "pieces".to_owned(),
            Unit::Bags => "bags".to_owned(),
            Unit::Meters => "meters".to_owned(),
            Unit::Sheets => "sheets".to_owned(),
            Unit::Other(s) => s,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vendor,
    Supplier,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Vendor => "vendor",
            Role::Supplier => "supplier",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementStatus {
    Open,
    Closed,
}

impl RequirementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementStatus::Open => "open",
            RequirementStatus::Closed => "closed",
        }
    }
}

/// A vendor's open request to buy a quantity of an item at an
/// expected price. Immutable once created; status transitions happen
/// elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: RequirementId,
    pub clerk_user_id: String,
    pub item: ItemId,
    pub quantity: Quantity,
    pub unit: Unit,
    pub price: Amount,
    pub pincode: String,
    pub state: String,
    pub status: RequirementStatus,
}

/// A supplier's offered price for the aggregated demand of an item
/// within a state. One active bid per supplier per item+state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: BidId,
    pub item: ItemId,
    pub state: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub price: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequirement {
    pub clerk_user_id: String,
    pub item: ItemId,
    pub quantity: Quantity,
    pub unit: Unit,
    pub price: Amount,
    pub pincode: String,
    pub state: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBid {
    pub clerk_user_id: String,
    pub supplier_name: String,
    pub item: ItemId,
    pub state: String,
    pub price: Amount,
}

/// Profile attributes handed to us by the identity collaborator after
/// a successful phone-OTP flow. We only store and look them up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub clerk_user_id: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub pincode: String,
    pub state: String,
}

impl UserProfile {
    pub fn session(&self) -> Session {
        Session {
            clerk_user_id: self.clerk_user_id.clone(),
            role: self.role,
            pincode: self.pincode.clone(),
            state: self.state.clone(),
        }
    }
}

/// Explicit per-request session context. Resolved once from the user
/// store and passed down; never read ambiently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub clerk_user_id: String,
    pub role: Role,
    pub pincode: String,
    pub state: String,
}

impl Session {
    /// Vendors see their own pincode; suppliers see the whole state.
    pub fn scope(&self) -> Scope {
        match self.role {
            Role::Vendor => Scope::within_pincode(&self.state, &self.pincode),
            Role::Supplier => Scope::state_wide(&self.state),
        }
    }
}

/// Geographic filter for aggregation: always a state, optionally
/// narrowed to one pincode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub state: String,
    pub pincode: Option<String>,
}

impl Scope {
    pub fn state_wide(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            pincode: None,
        }
    }

    pub fn within_pincode(state: impl Into<String>, pincode: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            pincode: Some(pincode.into()),
        }
    }

    fn admits(&self, req: &Requirement) -> bool {
        req.status == RequirementStatus::Open
            && req.state == self.state
            && self
                .pincode
                .as_deref()
                .map_or(true, |pincode| req.pincode == pincode)
    }
}

/// Per-item derived summary over a scope. Never persisted; recomputed
/// from a fresh snapshot whenever the snapshot changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedDemand {
    pub total_quantity: Quantity,
    pub unit: Unit,
    pub vendor_count: u64,
    pub highest_price: Amount,
    pub lowest_bid: Option<Amount>,
}

impl AggregatedDemand {
    fn new(unit: Unit) -> Self {
        Self {
            total_quantity: 0,
            unit,
            vendor_count: 0,
            highest_price: 0,
            lowest_bid: None,
        }
    }
}

/// Item-keyed aggregation result.
///
/// Keys appear in first-occurrence order of the qualifying
/// requirements. That order is only meaningful for display; callers
/// must not rely on it for anything else.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DemandMap {
    entries: Vec<(ItemId, AggregatedDemand)>,
}

impl DemandMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, item: ItemIdRef) -> Option<&AggregatedDemand> {
        self.entries
            .iter()
            .find(|(name, _)| name == item)
            .map(|(_, demand)| demand)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemIdRef, &AggregatedDemand)> {
        self.entries
            .iter()
            .map(|(name, demand)| (name.as_str(), demand))
    }

    fn entry_mut(&mut self, item: ItemIdRef, unit: &Unit) -> &mut AggregatedDemand {
        let pos = match self.entries.iter().position(|(name, _)| name == item) {
            Some(pos) => pos,
            None => {
                self.entries
                    .push((item.to_owned(), AggregatedDemand::new(unit.clone())));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }
}

impl Serialize for DemandMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, demand) in &self.entries {
            map.serialize_entry(name, demand)?;
        }
        map.end()
    }
}

/// Fold a snapshot of requirements and bids into per-item aggregated
/// demand for one scope.
///
/// Only open requirements inside the scope contribute. A vendor
/// posting the same item twice counts twice. The lowest bid is the
/// minimum over bids matching item and state, or `None` when no bid
/// exists.
pub fn aggregate(requirements: &[Requirement], bids: &[Bid], scope: &Scope) -> DemandMap {
    let mut demands = DemandMap::new();

    for req in requirements.iter().filter(|req| scope.admits(req)) {
        let entry = demands.entry_mut(&req.item, &req.unit);
        entry.total_quantity += req.quantity;
        entry.vendor_count += 1;
        entry.highest_price = entry.highest_price.max(req.price);
    }

    for (item, demand) in demands.entries.iter_mut() {
        demand.lowest_bid = bids
            .iter()
            .filter(|bid| bid.item == *item && bid.state == scope.state)
            .map(|bid| bid.price)
            .min();
    }

    demands
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bid of {offered} is not lower than the current lowest bid of {lowest}")]
    BidTooHigh { offered: Amount, lowest: Amount },
    #[error("price must be greater than zero")]
    NonPositivePrice,
    #[error("quantity must be greater than zero")]
    NonPositiveQuantity,
    #[error("item name must not be empty")]
    EmptyItem,
    #[error("phone number must be exactly 10 digits")]
    InvalidPhone,
    #[error("name must not be empty")]
    EmptyName,
}

/// A new bid must undercut the current lowest bid strictly, or be the
/// first bid for its item. Run against the lowest bid read in the
/// same transaction as the write, this is the atomically checked
/// conditional update the marketplace relies on.
pub fn ensure_valid_bid(offered: Amount, current_lowest: Option<Amount>) -> Result<(), ValidationError> {
    if offered == 0 {
        return Err(ValidationError::NonPositivePrice);
    }
    if let Some(lowest) = current_lowest {
        if offered >= lowest {
            return Err(ValidationError::BidTooHigh { offered, lowest });
        }
    }
    Ok(())
}

pub fn ensure_valid_requirement(new: &NewRequirement) -> Result<(), ValidationError> {
    if new.item.trim().is_empty() {
        return Err(ValidationError::EmptyItem);
    }
    if new.quantity == 0 {
        return Err(ValidationError::NonPositiveQuantity);
    }
    if new.price == 0 {
        return Err(ValidationError::NonPositivePrice);
    }
    Ok(())
}

pub fn ensure_valid_profile(profile: &UserProfile) -> Result<(), ValidationError> {
    if profile.phone_number.len() != 10
        || !profile.phone_number.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ValidationError::InvalidPhone);
    }
    if profile.first_name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

/// Role-tagged read model for the two dashboards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    #[serde(rename_all = "camelCase")]
    Vendor { pincode: String, demands: DemandMap },
    #[serde(rename_all = "camelCase")]
    Supplier { state: String, demands: DemandMap },
}

/// Aggregate over the session's scope and wrap the result in the
/// view model for the session's role: vendors get their own pincode
/// with the running lowest bid per item, suppliers get the state-wide
/// demand they can bid on.
pub fn dashboard_for(session: &Session, requirements: &[Requirement], bids: &[Bid]) -> Dashboard {
    let demands = aggregate(requirements, bids, &session.scope());
    match session.role {
        Role::Vendor => Dashboard::Vendor {
            pincode: session.pincode.clone(),
            demands,
        },
        Role::Supplier => Dashboard::Supplier {
            state: session.state.clone(),
            demands,
        },
    }
}
