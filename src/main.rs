mod event;
mod event_log;
mod market;
mod persistence;
mod service;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use event_log::{SharedReader, SharedWriter};
use persistence::Persistence;
use service::progress::SharedProgressTracker;
use store::{SharedBidStore, SharedRequirementStore, SharedUserStore};

struct Config {
    listen_addr: SocketAddr,
    database_url: Option<String>,
}

impl Config {
    fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("MANDI_LISTEN")
            .unwrap_or_else(|_| "0.0.0.0:8001".to_owned())
            .parse()
            .context("invalid MANDI_LISTEN")?;
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty());
        Ok(Self {
            listen_addr,
            database_url,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    match config.database_url.clone() {
        Some(url) => {
            let persistence = persistence::postgres::PostgresPersistence::connect(&url)?;
            persistence.init_schema()?;
            run(
                persistence,
                store::postgres::PostgresUserStore::new_shared(),
                store::postgres::PostgresRequirementStore::new_shared(),
                store::postgres::PostgresBidStore::new_shared(),
                event_log::postgres::PostgresEventLog::new_shared(),
                service::progress::PostgresProgressTracker::new_shared(),
                &config,
            )
        }
        None => run(
            persistence::InMemoryPersistence::new(),
            store::InMemoryUserStore::new_shared(),
            store::InMemoryRequirementStore::new_shared(),
            store::InMemoryBidStore::new_shared(),
            event_log::new_in_memory_shared(),
            service::progress::InMemoryProgressTracker::new_shared(),
            &config,
        ),
    }
}

fn run<P: Persistence>(
    persistence: P,
    users: SharedUserStore<P>,
    requirements: SharedRequirementStore<P>,
    bids: SharedBidStore<P>,
    (event_writer, event_reader): (SharedWriter<P>, SharedReader<P>),
    progress_store: SharedProgressTracker<P>,
    config: &Config,
) -> Result<()> {
    let svc_ctl = service::ServiceControl::new(persistence.clone(), progress_store);

    ctrlc::set_handler({
        let svc_ctl = svc_ctl.clone();
        move || {
            info!("stopping all services");
            svc_ctl.stop_all();
        }
    })?;

    let api = service::api::Api::new(
        config.listen_addr,
        service::api::ApiState {
            persistence,
            users,
            requirements,
            bids,
            event_writer,
        },
    )?;

    info!(listen_addr = %config.listen_addr, "marketplace starting");

    for handle in [
        svc_ctl.spawn_loop(api),
        svc_ctl.spawn_log_follower(service::audit::Audit, event_reader),
    ] {
        handle.join()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests;
