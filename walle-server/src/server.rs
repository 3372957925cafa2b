//! Transport wiring for the `Games` service

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use walle_core::GameRegistry;
use walle_proto::games_server::GamesServer;

use crate::metrics::Metrics;
use crate::service::GamesService;

/// Serve the `Games` service on `listener` until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    registry: Arc<GameRegistry>,
    metrics: Arc<Metrics>,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    F: Future<Output = ()> + Send,
{
    let service = GamesService::new(registry, metrics);

    Server::builder()
        .add_service(GamesServer::new(service))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
}
