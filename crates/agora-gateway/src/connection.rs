use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use agora_chat::ChatService;
use agora_types::events::{GatewayCommand, GatewayEvent};

use crate::rooms::RoomRegistry;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection: Identify handshake with JWT, then
/// the JoinChat/SendMessage event loop until either side hangs up.
pub async fn handle_connection(
    socket: WebSocket,
    rooms: RoomRegistry,
    chat: Arc<ChatService>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for Identify command with JWT
    let (user_id, display_name) = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} ({}) connected to gateway", display_name, user_id);

    // Step 2: Send Ready event
    let ready = GatewayEvent::Ready {
        user_id: user_id.clone(),
        display_name: display_name.clone(),
    };
    if sender
        .send(Message::Text(serde_json::to_string(&ready).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    let (conn_id, mut conn_rx) = rooms.register().await;

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Spawn task to forward room events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = conn_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };

                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode gateway event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let rooms_recv = rooms.clone();
    let chat_recv = chat.clone();
    let user_id_recv = user_id.clone();
    let display_name_recv = display_name.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&rooms_recv, &chat_recv, conn_id, &user_id_recv, cmd).await;
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            display_name_recv,
                            user_id_recv,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    rooms.unregister(conn_id).await;
    info!("{} ({}) disconnected from gateway", display_name, user_id);
}

async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<(String, String)> {
    use agora_types::api::Claims;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let timeout = tokio::time::timeout(std::time::Duration::from_secs(10), async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some((token_data.claims.sub, token_data.claims.name));
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}

/// Dispatch one client command. Separated from the socket loop so the
/// join/send semantics are testable without a live WebSocket.
pub async fn handle_command(
    rooms: &RoomRegistry,
    chat: &Arc<ChatService>,
    conn_id: Uuid,
    sender_id: &str,
    cmd: GatewayCommand,
) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::JoinChat { chat_id } => {
            info!("{} joining chat {}", sender_id, chat_id);
            rooms.join(conn_id, &chat_id).await;
        }

        GatewayCommand::SendMessage {
            ad_id,
            chat_id,
            receiver_id,
            content,
            image_urls,
        } => {
            // A client guarding against empty submits can still race one
            // through; drop it quietly rather than erroring.
            if content.as_deref().map_or(true, |c| c.trim().is_empty()) && image_urls.is_empty() {
                return;
            }

            // Run blocking DB insert off the async runtime
            let svc = chat.clone();
            let sid = sender_id.to_string();
            let result = tokio::task::spawn_blocking(move || {
                svc.save_message(ad_id, &sid, &receiver_id, content.as_deref(), &image_urls)
            })
            .await;

            let saved = match result {
                Ok(Ok(row)) => row,
                Ok(Err(e)) => {
                    warn!("{} send rejected on ad {}: {}", sender_id, ad_id, e);
                    rooms
                        .send_to(conn_id, GatewayEvent::SendRejected { reason: e.to_string() })
                        .await;
                    return;
                }
                Err(e) => {
                    error!("spawn_blocking join error: {}", e);
                    rooms
                        .send_to(
                            conn_id,
                            GatewayEvent::SendRejected {
                                reason: "internal error".to_string(),
                            },
                        )
                        .await;
                    return;
                }
            };

            // Persisted first, then fanned out — anyone who joins the room
            // after seeing this event will find it in the transcript. Every
            // member gets the echo, the sender's own connections included.
            rooms
                .broadcast_to(
                    &chat_id,
                    GatewayEvent::ReceiveMessage {
                        sender_id: saved.sender_id,
                        content: saved.content,
                        image_urls: saved.image_urls,
                        sent_on: saved.sent_on,
                    },
                )
                .await;
        }
    }
}
