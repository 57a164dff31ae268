//! Serve a [`TerminologyService`] until a termination signal
//!
//! Sequence: log the process id, serve, stop accepting on the shutdown
//! request, give open connections `drain_timeout` to finish, then run the
//! service's cleanup exactly once (also when serving failed).

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use term_common::shutdown::{Shutdown, ShutdownReason};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

use crate::service::TerminologyService;

pub async fn launch<S, F>(
    service: S,
    listener: TcpListener,
    shutdown: F,
    drain_timeout: Duration,
) -> Result<()>
where
    S: TerminologyService,
    F: Future<Output = ShutdownReason> + Send,
{
    let addr = listener.local_addr()?;
    info!(pid = std::process::id(), %addr, "Starting terminology service");

    let app = service.router().layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(tower_http::LatencyUnit::Micros),
            ),
    );

    let stop = Shutdown::new();
    let server_stop = stop.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_stop.triggered().await;
            })
            .await
    });

    let served: Result<()> = tokio::select! {
        result = &mut server => result.map_err(anyhow::Error::from).and_then(|r| Ok(r?)),
        reason = shutdown => {
            info!(signal = %reason, "Stopping, waiting up to {:?} for connections to close", drain_timeout);
            stop.trigger(reason);
            match tokio::time::timeout(drain_timeout, &mut server).await {
                Ok(result) => result.map_err(anyhow::Error::from).and_then(|r| Ok(r?)),
                Err(_) => {
                    warn!("Connections still open after {:?}, closing them", drain_timeout);
                    server.abort();
                    Ok(())
                },
            }
        },
    };

    let cleaned = service.cleanup().await;
    served?;
    cleaned?;

    info!("Service shut down gracefully");
    Ok(())
}
