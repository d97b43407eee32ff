use axum::extract::FromRef;
use std::sync::Arc;

use super::ServerConfig;
use crate::pipeline::MoodPipeline;

pub type GuardedPipeline = Arc<MoodPipeline>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub pipeline: GuardedPipeline,
}

impl ServerState {
    pub fn new(config: ServerConfig, pipeline: GuardedPipeline) -> ServerState {
        ServerState {
            config,
            pipeline,
        }
    }
}

impl FromRef<ServerState> for GuardedPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}
