//! Postgres adapters for the marketplace stores
//!
//! Tables are created by [`PostgresPersistence::init_schema`]. The
//! bid upsert leans on the `UNIQUE (item, state, supplier_id)`
//! constraint for the one-active-bid-per-supplier rule.
use super::*;
use crate::market::{RequirementStatus, Role, Unit};
use crate::persistence::postgres::{PostgresConnection, PostgresPersistence, PostgresTransaction};
use anyhow::bail;

fn parse_role(s: &str) -> Result<Role> {
    Ok(match s {
        "vendor" => Role::Vendor,
        "supplier" => Role::Supplier,
        other => bail!("unknown role: {other}"),
    })
}

fn parse_status(s: &str) -> Result<RequirementStatus> {
    Ok(match s {
        "open" => RequirementStatus::Open,
        "closed" => RequirementStatus::Closed,
        other => bail!("unknown requirement status: {other}"),
    })
}

fn requirement_from_row(row: &::postgres::Row) -> Result<Requirement> {
    Ok(Requirement {
        id: u64::try_from(row.get::<_, i64>("id"))?,
        clerk_user_id: row.get("clerk_user_id"),
        item: row.get("item"),
        quantity: u64::try_from(row.get::<_, i64>("quantity"))?,
        unit: Unit::from(row.get::<_, String>("unit")),
        price: u64::try_from(row.get::<_, i64>("price"))?,
        pincode: row.get("pincode"),
        state: row.get("state"),
        status: parse_status(&row.get::<_, String>("status"))?,
    })
}

fn bid_from_row(row: &::postgres::Row) -> Result<Bid> {
    Ok(Bid {
        id: u64::try_from(row.get::<_, i64>("id"))?,
        item: row.get("item"),
        state: row.get("state"),
        supplier_id: row.get("supplier_id"),
        supplier_name: row.get("supplier_name"),
        price: u64::try_from(row.get::<_, i64>("price"))?,
    })
}

pub struct PostgresUserStore;

impl PostgresUserStore {
    pub fn new_shared() -> SharedUserStore<PostgresPersistence> {
        Arc::new(Self)
    }
}

impl UserStore for PostgresUserStore {
    type Persistence = PostgresPersistence;

    fn get(
        &self,
        conn: &mut PostgresConnection,
        clerk_user_id: &str,
    ) -> Result<Option<UserProfile>> {
        conn.query_opt(
            "SELECT clerk_user_id, phone_number, first_name, last_name, role, pincode, state \
             FROM users WHERE clerk_user_id = $1",
            &[&clerk_user_id],
        )?
        .map(|row| {
            Ok(UserProfile {
                clerk_user_id: row.get("clerk_user_id"),
                phone_number: row.get("phone_number"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                role: parse_role(&row.get::<_, String>("role"))?,
                pincode: row.get("pincode"),
                state: row.get("state"),
            })
        })
        .transpose()
    }

    fn upsert_tr<'a>(
        &self,
        transaction: &mut PostgresTransaction<'a>,
        profile: &UserProfile,
    ) -> Result<()> {
        transaction.execute(
            "INSERT INTO users (clerk_user_id, phone_number, first_name, last_name, role, pincode, state) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (clerk_user_id) DO UPDATE SET \
                 phone_number = EXCLUDED.phone_number, \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 role = EXCLUDED.role, \
                 pincode = EXCLUDED.pincode, \
                 state = EXCLUDED.state",
            &[
                &profile.clerk_user_id,
                &profile.phone_number,
                &profile.first_name,
                &profile.last_name,
                &profile.role.as_str(),
                &profile.pincode,
                &profile.state,
            ],
        )?;
        Ok(())
    }
}

pub struct PostgresRequirementStore;

impl PostgresRequirementStore {
    pub fn new_shared() -> SharedRequirementStore<PostgresPersistence> {
        Arc::new(Self)
    }
}

impl RequirementStore for PostgresRequirementStore {
    type Persistence = PostgresPersistence;

    fn get(&self, conn: &mut PostgresConnection, id: RequirementId) -> Result<Option<Requirement>> {
        conn.query_opt(
            "SELECT id, clerk_user_id, item, quantity, unit, price, pincode, state, status \
             FROM requirements WHERE id = $1",
            &[&i64::try_from(id)?],
        )?
        .as_ref()
        .map(requirement_from_row)
        .transpose()
    }

    fn list_by_state(&self, conn: &mut PostgresConnection, state: &str) -> Result<Vec<Requirement>> {
        conn.query(
            "SELECT id, clerk_user_id, item, quantity, unit, price, pincode, state, status \
             FROM requirements WHERE state = $1 ORDER BY id",
            &[&state],
        )?
        .iter()
        .map(requirement_from_row)
        .collect()
    }

    fn insert_tr<'a>(
        &self,
        transaction: &mut PostgresTransaction<'a>,
        new: &NewRequirement,
    ) -> Result<Requirement> {
        let row = transaction.query_one(
            "INSERT INTO requirements (clerk_user_id, item, quantity, unit, price, pincode, state, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, clerk_user_id, item, quantity, unit, price, pincode, state, status",
            &[
                &new.clerk_user_id,
                &new.item,
                &i64::try_from(new.quantity)?,
                &String::from(new.unit.clone()),
                &i64::try_from(new.price)?,
                &new.pincode,
                &new.state,
                &RequirementStatus::Open.as_str(),
            ],
        )?;
        requirement_from_row(&row)
    }
}

pub struct PostgresBidStore;

impl PostgresBidStore {
    pub fn new_shared() -> SharedBidStore<PostgresPersistence> {
        Arc::new(Self)
    }
}

impl BidStore for PostgresBidStore {
    type Persistence = PostgresPersistence;

    fn list_by_state(&self, conn: &mut PostgresConnection, state: &str) -> Result<Vec<Bid>> {
        conn.query(
            "SELECT id, item, state, supplier_id, supplier_name, price \
             FROM bids WHERE state = $1 ORDER BY id",
            &[&state],
        )?
        .iter()
        .map(bid_from_row)
        .collect()
    }

    fn lowest_for_item_tr<'a>(
        &self,
        transaction: &mut PostgresTransaction<'a>,
        item: &str,
        state: &str,
    ) -> Result<Option<u64>> {
        let row = transaction.query_one(
            "SELECT MIN(price) FROM bids WHERE item = $1 AND state = $2",
            &[&item, &state],
        )?;
        row.get::<_, Option<i64>>(0)
            .map(|price| Ok(u64::try_from(price)?))
            .transpose()
    }

    fn upsert_tr<'a>(&self, transaction: &mut PostgresTransaction<'a>, new: &NewBid) -> Result<Bid> {
        let row = transaction.query_one(
            "INSERT INTO bids (item, state, supplier_id, supplier_name, price) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (item, state, supplier_id) DO UPDATE SET \
                 price = EXCLUDED.price, \
                 supplier_name = EXCLUDED.supplier_name \
             RETURNING id, item, state, supplier_id, supplier_name, price",
            &[
                &new.item,
                &new.state,
                &new.clerk_user_id,
                &new.supplier_name,
                &i64::try_from(new.price)?,
            ],
        )?;
        bid_from_row(&row)
    }
}
