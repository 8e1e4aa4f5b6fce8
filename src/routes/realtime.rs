//! Realtime WebSocket endpoint (spec §4.6, §6): `GET /ws?token=<jwt>`. The
//! JWT arrives as a query param since the WS upgrade handshake can't carry
//! an Authorization header from a browser `WebSocket` client.

use crate::auth::tokens;
use crate::config::Config;
use crate::realtime::WsHub;
use futures::{SinkExt, StreamExt};
use rocket::{get, State};
use std::sync::Arc;

#[get("/ws?<token>")]
pub fn connect(
    ws: rocket_ws::WebSocket,
    token: &str,
    hub: &State<Arc<WsHub>>,
    config: &State<Config>,
) -> Result<rocket_ws::Channel<'static>, rocket::http::Status> {
    let claims = tokens::verify_jwt(&config.jwt_secret, token).ok_or(rocket::http::Status::Unauthorized)?;
    let dealership_id = claims.dealership_id.ok_or(rocket::http::Status::BadRequest)?;

    let hub: Arc<WsHub> = Arc::clone(hub.inner());
    Ok(ws.channel(move |mut stream| {
        Box::pin(async move {
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let unregister_sender = tx.clone();
            hub.register(dealership_id, claims.sub, tx);

            loop {
                tokio::select! {
                    notification = rx.recv() => {
                        let Some(notification) = notification else { break };
                        let payload = serde_json::to_string(&notification).unwrap_or_default();
                        if stream.send(rocket_ws::Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    incoming = stream.next() => {
                        match incoming {
                            Some(Ok(rocket_ws::Message::Close(_))) | None => break,
                            Some(Err(_)) => break,
                            _ => {}
                        }
                    }
                }
            }

            hub.unregister(dealership_id, &unregister_sender);
            Ok(())
        })
    }))
}
