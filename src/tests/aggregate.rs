use crate::market::{
    aggregate, Bid, Requirement, RequirementStatus, Scope, Unit,
};

fn req(
    id: u64,
    item: &str,
    quantity: u64,
    price: u64,
    pincode: &str,
    status: RequirementStatus,
) -> Requirement {
    Requirement {
        id,
        clerk_user_id: format!("user-{id}"),
        item: item.to_owned(),
        quantity,
        unit: Unit::Kg,
        price,
        pincode: pincode.to_owned(),
        state: "Delhi".to_owned(),
        status,
    }
}

fn bid(id: u64, item: &str, state: &str, price: u64) -> Bid {
    Bid {
        id,
        item: item.to_owned(),
        state: state.to_owned(),
        supplier_id: format!("supplier-{id}"),
        supplier_name: format!("Supplier {id}"),
        price,
    }
}

#[test]
fn empty_inputs_give_empty_map() {
    let demands = aggregate(&[], &[], &Scope::state_wide("Delhi"));
    assert!(demands.is_empty());
    assert_eq!(demands.len(), 0);
}

#[test]
fn no_bids_means_no_lowest_bid() {
    let requirements = vec![
        req(1, "Cement (OPC 53)", 100, 450, "110001", RequirementStatus::Open),
        req(2, "Steel Rods (TMT)", 500, 55, "110001", RequirementStatus::Open),
    ];

    let demands = aggregate(&requirements, &[], &Scope::state_wide("Delhi"));

    assert_eq!(demands.len(), 2);
    for (_, demand) in demands.iter() {
        assert_eq!(demand.lowest_bid, None);
    }
}

#[test]
fn cement_scenario() {
    let requirements = vec![
        req(1, "Cement", 100, 450, "110001", RequirementStatus::Open),
        req(2, "Cement", 150, 445, "110001", RequirementStatus::Closed),
    ];
    let bids = vec![bid(1, "Cement", "Delhi", 435)];

    let demands = aggregate(
        &requirements,
        &bids,
        &Scope::within_pincode("Delhi", "110001"),
    );

    let cement = demands.get("Cement").expect("aggregated");
    assert_eq!(cement.total_quantity, 100);
    assert_eq!(cement.vendor_count, 1);
    assert_eq!(cement.highest_price, 450);
    assert_eq!(cement.lowest_bid, Some(435));
}

#[test]
fn total_quantity_is_order_independent() {
    let mut requirements = vec![
        req(1, "Bricks", 5000, 8, "110001", RequirementStatus::Open),
        req(2, "Bricks", 2000, 9, "110001", RequirementStatus::Open),
        req(3, "Bricks", 300, 7, "110001", RequirementStatus::Open),
    ];

    let forward = aggregate(&requirements, &[], &Scope::state_wide("Delhi"));
    requirements.reverse();
    let backward = aggregate(&requirements, &[], &Scope::state_wide("Delhi"));

    assert_eq!(forward.get("Bricks"), backward.get("Bricks"));
    assert_eq!(forward.get("Bricks").expect("aggregated").total_quantity, 7300);
}

#[test]
fn duplicate_vendor_counts_twice() {
    let mut first = req(1, "Plywood", 100, 1200, "110001", RequirementStatus::Open);
    let mut second = req(2, "Plywood", 50, 1150, "110001", RequirementStatus::Open);
    first.clerk_user_id = "user-dup".to_owned();
    second.clerk_user_id = "user-dup".to_owned();

    let demands = aggregate(&[first, second], &[], &Scope::state_wide("Delhi"));

    assert_eq!(demands.get("Plywood").expect("aggregated").vendor_count, 2);
}

#[test]
fn closed_requirements_never_contribute() {
    let requirements = vec![req(
        1,
        "Cement",
        1_000_000,
        9_999,
        "110001",
        RequirementStatus::Closed,
    )];

    let demands = aggregate(&requirements, &[], &Scope::state_wide("Delhi"));

    assert!(demands.is_empty());
}

#[test]
fn lowest_bid_tracks_minimum() {
    let requirements = vec![req(1, "Steel", 500, 55, "110001", RequirementStatus::Open)];
    let mut bids = vec![bid(1, "Steel", "Delhi", 100)];
    let scope = Scope::state_wide("Delhi");

    let demands = aggregate(&requirements, &bids, &scope);
    assert_eq!(demands.get("Steel").expect("aggregated").lowest_bid, Some(100));

    // a higher bid must not change the minimum
    bids.push(bid(2, "Steel", "Delhi", 120));
    let demands = aggregate(&requirements, &bids, &scope);
    assert_eq!(demands.get("Steel").expect("aggregated").lowest_bid, Some(100));

    // a lower one must
    bids.push(bid(3, "Steel", "Delhi", 90));
    let demands = aggregate(&requirements, &bids, &scope);
    assert_eq!(demands.get("Steel").expect("aggregated").lowest_bid, Some(90));
}

#[test]
fn bids_from_other_states_are_ignored() {
    let requirements = vec![req(1, "Steel", 500, 55, "110001", RequirementStatus::Open)];
    let bids = vec![bid(1, "Steel", "Maharashtra", 10)];

    let demands = aggregate(&requirements, &bids, &Scope::state_wide("Delhi"));

    assert_eq!(demands.get("Steel").expect("aggregated").lowest_bid, None);
}

#[test]
fn pincode_scope_narrows_state_scope() {
    let requirements = vec![
        req(1, "Steel", 500, 55, "110018", RequirementStatus::Open),
        req(2, "Steel", 300, 56, "110001", RequirementStatus::Open),
    ];

    let state_wide = aggregate(&requirements, &[], &Scope::state_wide("Delhi"));
    assert_eq!(state_wide.get("Steel").expect("aggregated").total_quantity, 800);
    assert_eq!(state_wide.get("Steel").expect("aggregated").vendor_count, 2);
    assert_eq!(state_wide.get("Steel").expect("aggregated").highest_price, 56);

    let one_pincode = aggregate(
        &requirements,
        &[],
        &Scope::within_pincode("Delhi", "110018"),
    );
    assert_eq!(one_pincode.get("Steel").expect("aggregated").total_quantity, 500);
    assert_eq!(one_pincode.get("Steel").expect("aggregated").vendor_count, 1);
    assert_eq!(one_pincode.get("Steel").expect("aggregated").highest_price, 55);
}

#[test]
fn unknown_units_pass_through_opaquely() {
    let mut requirement = req(1, "Rope", 12, 40, "110001", RequirementStatus::Open);
    requirement.unit = Unit::from("dozens".to_owned());

    let demands = aggregate(&[requirement], &[], &Scope::state_wide("Delhi"));

    assert_eq!(
        demands.get("Rope").expect("aggregated").unit,
        Unit::Other("dozens".to_owned())
    );
}

#[test]
fn items_keep_first_occurrence_order() {
    let requirements = vec![
        req(1, "Cement", 100, 450, "110001", RequirementStatus::Open),
        req(2, "Steel", 500, 55, "110001", RequirementStatus::Open),
        req(3, "Cement", 50, 440, "110001", RequirementStatus::Open),
        req(4, "Bricks", 5000, 8, "110001", RequirementStatus::Open),
    ];

    let demands = aggregate(&requirements, &[], &Scope::state_wide("Delhi"));

    let items: Vec<_> = demands.iter().map(|(item, _)| item.to_owned()).collect();
    assert_eq!(items, vec!["Cement", "Steel", "Bricks"]);
}
