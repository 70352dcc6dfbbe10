use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::RecorderError;

pub mod admin;
mod handlers;
mod rejection;
mod response;

pub use internal::*;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Recorder error"; "context" => ?r.context, "error" => ?e, "status" => %status_code_for(e), "message" => %e);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &RecorderError) -> StatusCode {
    use RecorderError::*;

    match e {
        PathConflict { .. } | AlreadyBound { .. } => StatusCode::CONFLICT,
        NotBound { .. } => StatusCode::NOT_FOUND,
        InvalidTransition { .. } | Io { .. } | MalformedMetadata { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::path::param as par;
    use warp::Filter;
    use warp::Reply;
    use warp::{body, get as g, path as p, post};

    use super::handlers;
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p("api"))
                .and(p("v1"));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_devices_route => devices, rt; p("devices"), end(), g());
    route!(make_recordings_route => recordings, rt; p("recordings"), end(), g());
    route!(make_history_route => history, rt; p("history"), end(), g());
    route!(make_record_route => record, rt; p("record"), end(), post(), body::json());
    route!(make_stop_route => stop, rt; p("stop"), end(), post(), body::json());
    route!(make_result_route => result, rt; p("result"), par::<String>(), end(), g());
    route!(make_calls_route => calls, rt; p("calls"), end(), g());
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use serde_json::{json as json_value, Value};
    use warp::http::StatusCode;
    use warp::Filter;

    use crate::config::StopConfig;
    use crate::environment::Environment;
    use crate::sound_system::{mock::ScriptBackend, SoundSystem};

    fn environment(root: &std::path::Path, backend: ScriptBackend) -> Environment {
        let logger = Arc::new(log::discard_logger());
        let sound_system = Arc::new(SoundSystem::new(
            logger.clone(),
            Box::new(backend),
            StopConfig::default(),
        ));

        Environment::new(logger, sound_system, root.to_owned())
    }

    #[tokio::test]
    async fn stopping_an_unknown_recording_is_not_found() {
        let root = tempfile::tempdir().expect("create temporary directory");
        let environment = environment(root.path(), ScriptBackend::exiting_with(0));
        let logger = environment.logger.clone();

        let filter = super::make_stop_route(environment)
            .recover(move |r| super::format_rejection(logger.clone(), r));

        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/stop")
            .json(&json_value!({ "id": "doesnotexist" }))
            .reply(&filter)
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn record_then_stop_round_trip() {
        let root = tempfile::tempdir().expect("create temporary directory");
        let environment = environment(root.path(), ScriptBackend::exiting_with(0));

        let record = super::make_record_route(environment.clone());
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/record")
            .json(&json_value!({ "device": "hw:CARD=CODEC,DEV=0" }))
            .reply(&record)
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = serde_json::from_slice(response.body()).expect("parse record response");
        assert_eq!(body["state"], "recording");
        assert_eq!(body["device_name"], "hw:CARD=CODEC,DEV=0");
        let id = body["id"].as_str().expect("id in response").to_owned();

        let stop = super::make_stop_route(environment.clone());
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/stop")
            .json(&json_value!({ "id": id }))
            .reply(&stop)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).expect("parse stop response");
        assert_eq!(body["status"], "stopped");
        assert_eq!(body["error_code"], Value::Null);

        let recordings = super::make_recordings_route(environment);
        let response = warp::test::request()
            .method("GET")
            .path("/api/v1/recordings")
            .reply(&recordings)
            .await;

        let body: Value =
            serde_json::from_slice(response.body()).expect("parse recordings response");
        assert_eq!(body["recordings"][0]["state"], "stopped");
    }

    #[tokio::test]
    async fn devices_listing_uses_the_backend() {
        let root = tempfile::tempdir().expect("create temporary directory");
        let backend = ScriptBackend {
            list_script: "printf 'null\\n    Discard all samples\\ndefault\\n    Default Audio Device\\n'"
                .to_owned(),
            capture_script: "cat > /dev/null".to_owned(),
        };
        let environment = environment(root.path(), backend);

        let filter = super::make_devices_route(environment);
        let response = warp::test::request()
            .method("GET")
            .path("/api/v1/devices")
            .reply(&filter)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).expect("parse devices response");
        let devices = body["devices"].as_array().expect("devices array");
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1]["description"], "Default Audio Device");
    }

    #[tokio::test]
    async fn result_is_not_found_until_the_file_exists() {
        let root = tempfile::tempdir().expect("create temporary directory");
        let environment = environment(root.path(), ScriptBackend::exiting_with(0));

        let filter = super::make_result_route(environment.clone());
        let response = warp::test::request()
            .method("GET")
            .path("/api/v1/result/deadbeef")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let dir = root.path().join("deadbeef");
        std::fs::create_dir_all(&dir).expect("create recording directory");
        std::fs::write(dir.join("deadbeef.wav"), b"RIFF").expect("write output file");

        let response = warp::test::request()
            .method("GET")
            .path("/api/v1/result/deadbeef")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"RIFF");
        assert_eq!(
            response.headers()["content-type"].to_str().expect("header"),
            "audio/x-wav"
        );
    }

    #[tokio::test]
    async fn calls_are_recorded_per_route() {
        let root = tempfile::tempdir().expect("create temporary directory");
        let environment = environment(root.path(), ScriptBackend::exiting_with(0));

        let devices = super::make_devices_route(environment.clone());
        warp::test::request()
            .method("GET")
            .path("/api/v1/devices")
            .reply(&devices)
            .await;

        let calls = super::make_calls_route(environment);
        let response = warp::test::request()
            .method("GET")
            .path("/api/v1/calls")
            .reply(&calls)
            .await;

        let body: Value = serde_json::from_slice(response.body()).expect("parse calls response");
        assert_eq!(body["calls"][0], "/devices");
    }
}
