//! Engine selection: standalone or cluster, per configuration.

use std::path::Path;

use bytes::Bytes;
use cinder_cluster::ClusterFacade;
use cinder_persistence::AofError;
use cinder_protocol::Frame;
use cinder_store::{Session, StandaloneDatabase};
use thiserror::Error;
use tracing::info;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to open append-only file: {0}")]
    Aof(#[from] AofError),
}

/// The command executor behind every connection: either the plain
/// database set, or the cluster facade wrapping one.
pub enum Engine {
    Standalone(StandaloneDatabase),
    Cluster(ClusterFacade),
}

impl Engine {
    /// Builds the engine the configuration asks for, replaying the
    /// append-only file when persistence is on.
    pub fn from_config(config: &Config) -> Result<Engine, EngineError> {
        let database = if config.append_only {
            StandaloneDatabase::with_aof(config.databases, Path::new(&config.append_filename))?
        } else {
            StandaloneDatabase::new(config.databases)
        };

        if config.is_cluster() {
            let self_addr = config
                .self_addr
                .clone()
                .unwrap_or_default();
            info!(
                self_addr,
                peers = config.peers.len(),
                "starting in cluster mode"
            );
            Ok(Engine::Cluster(ClusterFacade::new(
                self_addr,
                config.peers.clone(),
                database,
            )))
        } else {
            info!(databases = database.databases(), "starting standalone");
            Ok(Engine::Standalone(database))
        }
    }

    /// Executes one command line for a session.
    pub async fn exec(&self, session: &Session, line: &[Bytes]) -> Frame {
        match self {
            Engine::Standalone(database) => database.exec(session, line),
            Engine::Cluster(cluster) => cluster.exec(session, line).await,
        }
    }

    /// Releases engine resources: drains the append-only pipeline and
    /// closes peer connections.
    pub async fn close(&self) {
        match self {
            Engine::Standalone(database) => database.close(),
            Engine::Cluster(cluster) => cluster.close().await,
        }
    }
}
