use super::test_wiring;
use crate::event::{ApiEvent, Event};
use crate::event_log::Reader as _;
use crate::market::{NewBid, NewRequirement, Role, Scope, Unit, UserProfile, ValidationError};
use crate::persistence::Persistence;
use crate::service::api::{
    bids_by_requirement_sync, create_bid_sync, create_requirement_sync, demand_sync,
    register_user_sync, ApiError,
};
use crate::store::BidStore as _;
use anyhow::Result;
use std::time::Duration;

fn new_bid(supplier: &str, item: &str, price: u64) -> NewBid {
    NewBid {
        clerk_user_id: supplier.to_owned(),
        supplier_name: format!("{supplier} & Sons"),
        item: item.to_owned(),
        state: "Delhi".to_owned(),
        price,
    }
}

fn new_requirement(item: &str, quantity: u64, price: u64) -> NewRequirement {
    NewRequirement {
        clerk_user_id: "vendor-1".to_owned(),
        item: item.to_owned(),
        quantity,
        unit: Unit::Bags,
        price,
        pincode: "110001".to_owned(),
        state: "Delhi".to_owned(),
    }
}

#[test]
fn first_bid_is_accepted_unconditionally() -> Result<()> {
    let wiring = test_wiring();

    let bid = create_bid_sync(&wiring.api, new_bid("singhania", "Cement", 435))?;
    assert_eq!(bid.price, 435);
    assert_eq!(bid.supplier_id, "singhania");

    let mut conn = wiring.api.persistence.get_connection()?;
    let events = wiring
        .event_reader
        .read(&mut conn, 0, 16, Some(Duration::ZERO))?
        .data;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].details, Event::Api(ApiEvent::BidPlaced(bid)));

    Ok(())
}

#[test]
fn bid_not_strictly_lower_is_rejected_before_any_write() -> Result<()> {
    let wiring = test_wiring();

    create_bid_sync(&wiring.api, new_bid("singhania", "Cement", 435))?;

    for price in [435, 500] {
        let res = create_bid_sync(&wiring.api, new_bid("gupta", "Cement", price));
        assert!(matches!(
            res,
            Err(ApiError::Validation(ValidationError::BidTooHigh {
                offered,
                lowest: 435,
            })) if offered == price
        ));
    }

    // the rejected bids left no trace: no row, no event
    let mut conn = wiring.api.persistence.get_connection()?;
    let bids = wiring.api.bids.list_by_state(&mut conn, "Delhi")?;
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].supplier_id, "singhania");

    let events = wiring
        .event_reader
        .read(&mut conn, 0, 16, Some(Duration::ZERO))?
        .data;
    assert_eq!(events.len(), 1);

    Ok(())
}

#[test]
fn lower_bid_becomes_the_new_minimum() -> Result<()> {
    let wiring = test_wiring();

    create_requirement_sync(&wiring.api, new_requirement("Cement", 100, 450))?;
    create_bid_sync(&wiring.api, new_bid("singhania", "Cement", 435))?;
    create_bid_sync(&wiring.api, new_bid("gupta", "Cement", 430))?;

    let demands = demand_sync(&wiring.api, Scope::state_wide("Delhi"))?;
    assert_eq!(demands.get("Cement").expect("aggregated").lowest_bid, Some(430));

    Ok(())
}

#[test]
fn supplier_rebid_replaces_own_bid() -> Result<()> {
    let wiring = test_wiring();

    let first = create_bid_sync(&wiring.api, new_bid("singhania", "Cement", 435))?;
    let second = create_bid_sync(&wiring.api, new_bid("singhania", "Cement", 420))?;
    assert_eq!(first.id, second.id);

    let mut conn = wiring.api.persistence.get_connection()?;
    let bids = wiring.api.bids.list_by_state(&mut conn, "Delhi")?;
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].price, 420);

    Ok(())
}

#[test]
fn zero_priced_bid_is_rejected() {
    let wiring = test_wiring();

    let res = create_bid_sync(&wiring.api, new_bid("singhania", "Cement", 0));
    assert!(matches!(
        res,
        Err(ApiError::Validation(ValidationError::NonPositivePrice))
    ));
}

#[test]
fn requirement_boundary_validation() {
    let wiring = test_wiring();

    let res = create_requirement_sync(&wiring.api, new_requirement("Cement", 0, 450));
    assert!(matches!(
        res,
        Err(ApiError::Validation(ValidationError::NonPositiveQuantity))
    ));

    let res = create_requirement_sync(&wiring.api, new_requirement("  ", 100, 450));
    assert!(matches!(
        res,
        Err(ApiError::Validation(ValidationError::EmptyItem))
    ));

    let res = create_requirement_sync(&wiring.api, new_requirement("Cement", 100, 0));
    assert!(matches!(
        res,
        Err(ApiError::Validation(ValidationError::NonPositivePrice))
    ));
}

#[test]
fn legacy_requirement_bid_lookup_goes_through_item_and_state() -> Result<()> {
    let wiring = test_wiring();

    let req = create_requirement_sync(&wiring.api, new_requirement("Cement", 100, 450))?;
    create_bid_sync(&wiring.api, new_bid("singhania", "Cement", 435))?;
    create_bid_sync(&wiring.api, new_bid("gupta", "Steel", 55))?;

    let bids = bids_by_requirement_sync(&wiring.api, req.id)?;
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].item, "Cement");

    let res = bids_by_requirement_sync(&wiring.api, 9999);
    assert!(matches!(res, Err(ApiError::UnknownRequirement(9999))));

    Ok(())
}

#[test]
fn user_registration_validates_phone_at_the_boundary() {
    let wiring = test_wiring();

    let profile = UserProfile {
        clerk_user_id: "user-1".to_owned(),
        phone_number: "98765".to_owned(),
        first_name: "Asha".to_owned(),
        last_name: "Gupta".to_owned(),
        role: Role::Vendor,
        pincode: "110001".to_owned(),
        state: "Delhi".to_owned(),
    };

    let res = register_user_sync(&wiring.api, profile.clone());
    assert!(matches!(
        res,
        Err(ApiError::Validation(ValidationError::InvalidPhone))
    ));

    let ok = UserProfile {
        phone_number: "9876543210".to_owned(),
        ..profile
    };
    assert!(register_user_sync(&wiring.api, ok).is_ok());
}
