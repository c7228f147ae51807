use crate::pipeline::PracticePipeline;
use crate::recording::{Recorder, Recording};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single capture device
    pub recorder: Arc<Mutex<Recorder>>,
    pub pipeline: Arc<PracticePipeline>,
    /// Last stopped recording, waiting to be sent or discarded
    pub current: Arc<Mutex<Option<Recording>>>,
}

impl AppState {
    pub fn new(recorder: Recorder, pipeline: Arc<PracticePipeline>) -> Self {
        Self {
            recorder: Arc::new(Mutex::new(recorder)),
            pipeline,
            current: Arc::new(Mutex::new(None)),
        }
    }
}
