use crate::event_log::{new_in_memory_shared, SharedReader};
use crate::persistence::InMemoryPersistence;
use crate::service::api::ApiState;
use crate::store::{InMemoryBidStore, InMemoryRequirementStore, InMemoryUserStore};

mod aggregate;
mod bids;
mod event_log;
mod followers;

struct TestWiring {
    api: ApiState<InMemoryPersistence>,
    event_reader: SharedReader<InMemoryPersistence>,
}

fn test_wiring() -> TestWiring {
    let (event_writer, event_reader) = new_in_memory_shared();
    TestWiring {
        api: ApiState {
            persistence: InMemoryPersistence::new(),
            users: InMemoryUserStore::new_shared(),
            requirements: InMemoryRequirementStore::new_shared(),
            bids: InMemoryBidStore::new_shared(),
            event_writer,
        },
        event_reader,
    }
}
