use log::debug;
use serde::Deserialize;
use warp::http::header::{HeaderValue, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::reject;
use warp::reply::{json, with_status, Reply};

use crate::environment::Environment;
use crate::errors::RecorderError;
use crate::history;
use crate::recording::{Recording, RecordingId};
use crate::routes::rejection::{Context, Rejection};
use crate::routes::response::SuccessResponse;
use crate::sound_system::StopOutcome;

type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    pub device: String,
}

#[derive(Debug, Deserialize)]
pub struct StopRequest {
    pub id: String,
}

pub async fn devices(environment: Environment) -> RouteResult {
    environment.record_call("/devices");

    let devices = environment.sound_system.list_devices().await;

    Ok(Box::new(json(&SuccessResponse::Devices { devices })))
}

pub async fn recordings(environment: Environment) -> RouteResult {
    environment.record_call("/recordings");

    let recordings = environment.sound_system.get_recordings().await;

    Ok(Box::new(json(&SuccessResponse::Recordings { recordings })))
}

pub async fn history(environment: Environment) -> RouteResult {
    environment.record_call("/history");

    let history = history::load_history(&environment.logger, &environment.recordings_root)
        .iter()
        .map(Recording::snapshot)
        .collect();

    Ok(Box::new(json(&SuccessResponse::History { history })))
}

pub async fn record(environment: Environment, request: RecordRequest) -> RouteResult {
    environment.record_call("/record");

    let device = request.device;
    debug!(environment.logger, "Starting recording..."; "device" => &device);

    let recording = Recording::create(&environment.recordings_root, &device)
        .map_err(|e| Rejection::new(Context::record(device.clone()), e))?;

    let snapshot = environment
        .sound_system
        .start_recording(recording)
        .await
        .map_err(|e| Rejection::new(Context::record(device.clone()), e))?;

    Ok(Box::new(with_status(json(&snapshot), StatusCode::CREATED)))
}

pub async fn stop(environment: Environment, request: StopRequest) -> RouteResult {
    environment.record_call("/stop");

    let id = RecordingId::from(request.id);
    debug!(environment.logger, "Stopping recording..."; "id" => id.as_str());

    let outcome = environment
        .sound_system
        .stop_recording(&id)
        .await
        .map_err(|e| Rejection::new(Context::stop(id.to_string()), e))?;

    match outcome {
        StopOutcome::NotBound => Err(Rejection::new(
            Context::stop(id.to_string()),
            RecorderError::NotBound { id },
        )
        .into()),
        StopOutcome::Stopped => Ok(Box::new(json(&SuccessResponse::Stop {
            id: id.to_string(),
            status: "stopped",
            error_code: None,
        }))),
        StopOutcome::Failed { code } => Ok(Box::new(json(&SuccessResponse::Stop {
            id: id.to_string(),
            status: "error",
            error_code: Some(code),
        }))),
    }
}

pub async fn result(environment: Environment, id: String) -> RouteResult {
    environment.record_call("/result");

    debug!(environment.logger, "Serving result file..."; "id" => &id);

    // IDs are hex strings; anything else could escape the recordings root.
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Ok(Box::new(with_status(json(&()), StatusCode::NOT_FOUND)));
    }

    let path = environment
        .recordings_root
        .join(&id)
        .join(format!("{}.wav", id));

    match tokio::fs::read(&path).await {
        Ok(contents) => {
            let mut response = warp::http::Response::new(Body::from(contents));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("audio/x-wav"));

            Ok(Box::new(response))
        }
        Err(_) => Ok(Box::new(with_status(json(&()), StatusCode::NOT_FOUND))),
    }
}

pub async fn calls(environment: Environment) -> RouteResult {
    let calls = environment
        .calls
        .read()
        .map(|calls| calls.clone())
        .unwrap_or_default();

    Ok(Box::new(json(&SuccessResponse::Calls { calls })))
}
