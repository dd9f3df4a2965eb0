//! Audit trail
//!
//! Follows the event log and emits a structured tracing record for
//! every domain event, so there is one chronological account of what
//! the marketplace did.
use crate::event::{ApiEvent, Event};
use crate::persistence::{Persistence, TransactionOf};
use crate::service::{LogFollowerService, ServiceId};
use anyhow::Result;
use tracing::info;

pub const AUDIT_SERVICE_ID: &str = "audit";

pub struct Audit;

impl<P: Persistence> LogFollowerService<P> for Audit {
    fn get_log_progress_id(&self) -> ServiceId {
        AUDIT_SERVICE_ID.to_owned()
    }

    fn handle_event<'a>(
        &mut self,
        _transaction: &mut TransactionOf<'a, P>,
        event: Event,
    ) -> Result<()> {
        match event {
            Event::Api(ApiEvent::UserRegistered {
                clerk_user_id,
                role,
            }) => {
                info!(%clerk_user_id, role = role.as_str(), "user registered");
            }
            Event::Api(ApiEvent::RequirementPosted(req)) => {
                info!(
                    id = req.id,
                    item = %req.item,
                    quantity = req.quantity,
                    price = req.price,
                    pincode = %req.pincode,
                    state = %req.state,
                    "requirement posted"
                );
            }
            Event::Api(ApiEvent::BidPlaced(bid)) => {
                info!(
                    id = bid.id,
                    item = %bid.item,
                    state = %bid.state,
                    supplier = %bid.supplier_name,
                    price = bid.price,
                    "bid placed"
                );
            }
            #[cfg(test)]
            Event::Test => {}
        }
        Ok(())
    }
}
