use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use warp::Filter;

use futures::future::FutureExt;
use log::{info, initialize_logger};
use tokio::sync::mpsc;

use recorder::config::{get_arecord, get_ffmpeg, get_variable, StopConfig};
use recorder::environment::Environment;
use recorder::routes;
use recorder::sound_system::{AlsaBackend, SoundSystem};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("RECORDER_PORT")
        .parse()
        .expect("parse RECORDER_PORT as u16");
    let admin_port: u16 = get_variable("RECORDER_ADMIN_PORT")
        .parse()
        .expect("parse RECORDER_ADMIN_PORT as u16");

    let recordings_root = PathBuf::from(get_variable("RECORDER_RECORDINGS_PATH"));
    fs::create_dir_all(&recordings_root).expect("ensure recordings root exists");

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    let arecord =
        get_arecord(env::var("RECORDER_ARECORD_PATH").ok()).expect("locate arecord binary");
    let ffmpeg = get_ffmpeg(env::var("RECORDER_FFMPEG_PATH").ok()).expect("locate ffmpeg binary");

    let sound_system = Arc::new(SoundSystem::new(
        logger.clone(),
        Box::new(AlsaBackend::new(arecord, ffmpeg)),
        StopConfig::from_env(),
    ));

    let environment = Environment::new(logger.clone(), sound_system, recordings_root);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            let termination_sender = termination_sender.clone();
            termination_sender.send(()).await.unwrap();
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            let terminate = terminate.clone();

            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let logger2 = logger.clone();

        let devices_route = routes::make_devices_route(environment.clone());
        let recordings_route = routes::make_recordings_route(environment.clone());
        let history_route = routes::make_history_route(environment.clone());
        let record_route = routes::make_record_route(environment.clone());
        let stop_route = routes::make_stop_route(environment.clone());
        let result_route = routes::make_result_route(environment.clone());
        let calls_route = routes::make_calls_route(environment.clone());

        let routes = devices_route
            .or(recordings_route)
            .or(history_route)
            .or(record_route)
            .or(stop_route)
            .or(result_route)
            .or(calls_route)
            .recover(move |r| routes::format_rejection(logger2.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
