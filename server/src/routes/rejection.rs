use serde::Serialize;
use warp::reject;

use crate::errors::RecorderError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: RecorderError,
}

impl Rejection {
    pub fn new(context: Context, error: RecorderError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Record { device: String },
    Stop { id: String },
}

impl Context {
    pub fn record(device: String) -> Context {
        Context::Record { device }
    }

    pub fn stop(id: String) -> Context {
        Context::Stop { id }
    }
}
