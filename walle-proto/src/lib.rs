//! Generated gRPC types for the `walle.v1` protocol
//!
//! Server and client stubs live in [`games_server`] and [`games_client`].

tonic::include_proto!("walle.v1");
