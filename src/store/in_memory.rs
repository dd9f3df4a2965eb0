use super::*;
use crate::market::RequirementStatus;
use crate::persistence::{InMemoryConnection, InMemoryPersistence, InMemoryTransaction};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct InMemoryUserStore(Mutex<BTreeMap<String, UserProfile>>);

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self(Mutex::new(BTreeMap::new()))
    }

    pub fn new_shared() -> SharedUserStore<InMemoryPersistence> {
        Arc::new(Self::new())
    }
}

impl UserStore for InMemoryUserStore {
    type Persistence = InMemoryPersistence;

    fn get(
        &self,
        _conn: &mut InMemoryConnection,
        clerk_user_id: &str,
    ) -> Result<Option<UserProfile>> {
        Ok(self.0.lock().get(clerk_user_id).cloned())
    }

    fn upsert_tr<'a>(
        &self,
        _transaction: &mut InMemoryTransaction<'a>,
        profile: &UserProfile,
    ) -> Result<()> {
        self.0
            .lock()
            .insert(profile.clerk_user_id.clone(), profile.clone());
        Ok(())
    }
}

pub struct InMemoryRequirementStore {
    next_id: AtomicU64,
    rows: Mutex<Vec<Requirement>>,
}

impl InMemoryRequirementStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn new_shared() -> SharedRequirementStore<InMemoryPersistence> {
        Arc::new(Self::new())
    }
}

impl RequirementStore for InMemoryRequirementStore {
    type Persistence = InMemoryPersistence;

    fn get(&self, _conn: &mut InMemoryConnection, id: RequirementId) -> Result<Option<Requirement>> {
        Ok(self.rows.lock().iter().find(|req| req.id == id).cloned())
    }

    fn list_by_state(
        &self,
        _conn: &mut InMemoryConnection,
        state: &str,
    ) -> Result<Vec<Requirement>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|req| req.state == state)
            .cloned()
            .collect())
    }

    fn insert_tr<'a>(
        &self,
        _transaction: &mut InMemoryTransaction<'a>,
        new: &NewRequirement,
    ) -> Result<Requirement> {
        let req = Requirement {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            clerk_user_id: new.clerk_user_id.clone(),
            item: new.item.clone(),
            quantity: new.quantity,
            unit: new.unit.clone(),
            price: new.price,
            pincode: new.pincode.clone(),
            state: new.state.clone(),
            status: RequirementStatus::Open,
        };
        self.rows.lock().push(req.clone());
        Ok(req)
    }
}

pub struct InMemoryBidStore {
    next_id: AtomicU64,
    rows: Mutex<Vec<Bid>>,
}

impl InMemoryBidStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn new_shared() -> SharedBidStore<InMemoryPersistence> {
        Arc::new(Self::new())
    }
}

impl BidStore for InMemoryBidStore {
    type Persistence = InMemoryPersistence;

    fn list_by_state(&self, _conn: &mut InMemoryConnection, state: &str) -> Result<Vec<Bid>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|bid| bid.state == state)
            .cloned()
            .collect())
    }

    fn lowest_for_item_tr<'a>(
        &self,
        _transaction: &mut InMemoryTransaction<'a>,
        item: &str,
        state: &str,
    ) -> Result<Option<u64>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|bid| bid.item == item && bid.state == state)
            .map(|bid| bid.price)
            .min())
    }

    fn upsert_tr<'a>(&self, _transaction: &mut InMemoryTransaction<'a>, new: &NewBid) -> Result<Bid> {
        let mut rows = self.rows.lock();

        let existing = rows.iter_mut().find(|bid| {
            bid.item == new.item && bid.state == new.state && bid.supplier_id == new.clerk_user_id
        });

        Ok(match existing {
            Some(bid) => {
                bid.price = new.price;
                bid.supplier_name = new.supplier_name.clone();
                bid.clone()
            }
            None => {
                let bid = Bid {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    item: new.item.clone(),
                    state: new.state.clone(),
                    supplier_id: new.clerk_user_id.clone(),
                    supplier_name: new.supplier_name.clone(),
                    price: new.price,
                };
                rows.push(bid.clone());
                bid
            }
        })
    }
}
