use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::Message;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;

use crate::hub::Hub;

fn default_user() -> String {
    "guest".to_string()
}

/// A collaboration message as relayed to every peer of a session.
#[derive(Debug, Deserialize, Serialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default = "default_user")]
    user: String,
}

/// Normalise an incoming text frame for fan-out.
fn rebroadcast_frame(text: &str) -> Result<String, String> {
    let frame: Frame = serde_json::from_str(text).map_err(|e| e.to_string())?;
    serde_json::to_string(&frame).map_err(|e| e.to_string())
}

fn error_frame(reason: &str) -> String {
    json!({ "type": "error", "data": format!("Invalid message: {}", reason) }).to_string()
}

pub async fn collaboration_ws(
    req: HttpRequest,
    body: web::Payload,
    hub: web::Data<Hub>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let session_id = path.into_inner();
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, body)?;

    let membership = hub.join(&session_id);
    let mut rx = membership.subscribe();
    log::info!(
        "peer joined collaboration {} ({} connected)",
        session_id,
        hub.peer_count(&session_id)
    );

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                incoming = msg_stream.recv() => {
                    let Some(Ok(msg)) = incoming else { break };
                    match msg {
                        Message::Text(text) => match rebroadcast_frame(&text) {
                            Ok(frame) => membership.publish(frame),
                            Err(reason) => {
                                if session.text(error_frame(&reason)).await.is_err() {
                                    break;
                                }
                            }
                        },
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                outgoing = rx.recv() => match outgoing {
                    Ok(frame) => {
                        if session.text(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("collaboration {}: peer lagged, {} frames dropped", session_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        let _ = session.close(None).await;
        drop(membership);
        log::info!("peer left collaboration {}", session_id);
    });

    Ok(response)
}
