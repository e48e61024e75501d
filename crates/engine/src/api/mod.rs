//! API layer - WebSocket entry point.

pub mod websocket;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub use websocket::WsState;

/// Router serving the game protocol at `/ws`.
pub fn router(state: Arc<WsState>) -> Router {
    Router::new()
        .route("/ws", get(websocket::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: Arc<WsState>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server received shutdown signal");
        })
        .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use delver_domain::{Catalog, Namespaces, StyleRegistry, WidGenerator};
    use delver_shared::{decode, encode, CredentialsData, Message, ResultCode};
    use futures_util::{SinkExt, StreamExt};
    use tokio::sync::{mpsc, Notify};
    use tokio_tungstenite::tungstenite::Message as Frame;

    use super::*;
    use crate::config::WorldConfig;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{Account, MockAccountStore};
    use crate::universe::Universe;
    use crate::world::WorldContext;

    async fn start(store: MockAccountStore) -> (String, CancellationToken) {
        let cancel = CancellationToken::new();
        let context = WorldContext {
            catalog: Arc::new(Catalog::new()),
            styles: Arc::new(StyleRegistry::with_defaults()),
            wids: Arc::new(WidGenerator::new()),
            clock: Arc::new(FixedClock(Utc::now())),
            config: WorldConfig::default(),
        };
        let universe = Universe::new(
            Arc::new(store),
            Arc::new(Namespaces::default()),
            context,
            cancel.clone(),
        );
        let (new_clients, arrivals) = mpsc::channel(8);
        let check = Arc::new(Notify::new());
        tokio::spawn(universe.run(arrivals, check.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(serve(
            listener,
            Arc::new(WsState::new(new_clients, check)),
            cancel.clone(),
        ));
        (format!("ws://{address}/ws"), cancel)
    }

    #[tokio::test]
    async fn login_with_a_wrong_password_is_refused_over_the_socket() {
        let mut store = MockAccountStore::new();
        store.expect_account().returning(|user| {
            Ok(Account {
                username: user.to_string(),
                password_hash: "hash".into(),
                characters: Vec::new(),
            })
        });
        store.expect_verify_password().returning(|_, _| false);
        let (url, cancel) = start(store).await;

        let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        let login = Message::Login(CredentialsData {
            user: "ana".into(),
            password: "nope".into(),
            ..Default::default()
        });
        socket
            .send(Frame::Binary(encode(&login).unwrap().into()))
            .await
            .unwrap();

        let reply = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match socket.next().await {
                    Some(Ok(Frame::Binary(bytes))) => return decode(&bytes).unwrap(),
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {other:?}"),
                }
            }
        })
        .await
        .expect("reply in time");

        let Message::Login(data) = reply else {
            panic!("expected a login reply, got {reply:?}");
        };
        assert_eq!(data.result_code, ResultCode::FORBIDDEN);
        assert_eq!(data.user, "ana");
        cancel.cancel();
    }

    #[tokio::test]
    async fn text_frames_are_accepted_and_ping_is_echoed() {
        let (url, cancel) = start(MockAccountStore::new()).await;

        let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        socket
            .send(Frame::Text(r#"{"type":"ping","data":{}}"#.into()))
            .await
            .unwrap();

        let reply = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("reply in time");
        let Some(Ok(Frame::Binary(bytes))) = reply else {
            panic!("expected a binary frame, got {reply:?}");
        };
        assert_eq!(decode(&bytes).unwrap(), Message::ping());
        cancel.cancel();
    }
}
