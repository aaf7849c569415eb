use std::sync::Arc;

use agora_chat::ChatService;
use agora_db::Database;
use agora_gateway::connection::handle_command;
use agora_gateway::rooms::RoomRegistry;
use agora_types::events::{GatewayCommand, GatewayEvent};

fn seeded_chat() -> (Arc<Database>, Arc<ChatService>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    db.upsert_user("u1", "Ana", None).unwrap();
    db.upsert_user("u2", "Boris", None).unwrap();
    db.upsert_ad(42, "u1", "Mountain bike", None).unwrap();

    let chat = Arc::new(ChatService::with_store(db.clone()));
    (db, chat)
}

#[tokio::test]
async fn broadcast_reaches_room_members_only() {
    let rooms = RoomRegistry::new();
    let (a, mut rx_a) = rooms.register().await;
    let (b, mut rx_b) = rooms.register().await;
    let (_c, mut rx_c) = rooms.register().await;

    rooms.join(a, "ad_42_u_u2").await;
    rooms.join(b, "ad_42_u_u2").await;

    rooms
        .broadcast_to(
            "ad_42_u_u2",
            GatewayEvent::SendRejected {
                reason: "probe".to_string(),
            },
        )
        .await;

    assert!(rx_a.try_recv().is_ok());
    assert!(rx_b.try_recv().is_ok());
    assert!(rx_c.try_recv().is_err());
}

#[tokio::test]
async fn unregistered_connection_stops_receiving() {
    let rooms = RoomRegistry::new();
    let (a, mut rx_a) = rooms.register().await;
    rooms.join(a, "ad_42_u_u2").await;
    rooms.unregister(a).await;

    rooms
        .broadcast_to(
            "ad_42_u_u2",
            GatewayEvent::SendRejected {
                reason: "probe".to_string(),
            },
        )
        .await;

    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn send_persists_then_broadcasts_to_every_member() {
    let (db, chat) = seeded_chat();
    let rooms = RoomRegistry::new();

    // The buyer has two tabs open plus the seller: all three joined.
    let (buyer_tab1, mut rx_tab1) = rooms.register().await;
    let (buyer_tab2, mut rx_tab2) = rooms.register().await;
    let (seller_conn, mut rx_seller) = rooms.register().await;
    rooms.join(buyer_tab1, "ad_42_u_u2").await;
    rooms.join(buyer_tab2, "ad_42_u_u2").await;
    rooms.join(seller_conn, "ad_42_u_u2").await;

    handle_command(
        &rooms,
        &chat,
        buyer_tab1,
        "u2",
        GatewayCommand::SendMessage {
            ad_id: 42,
            chat_id: "ad_42_u_u2".to_string(),
            receiver_id: "u1".to_string(),
            content: Some("Is this available?".to_string()),
            image_urls: vec![],
        },
    )
    .await;

    // Persisted before fan-out: the row is already in the transcript.
    let transcript = db.get_transcript(42, "u1", "u2").unwrap();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].content, "Is this available?");

    // Everyone in the room got the echo, the sending tab included.
    for rx in [&mut rx_tab1, &mut rx_tab2, &mut rx_seller] {
        match rx.try_recv().unwrap() {
            GatewayEvent::ReceiveMessage {
                sender_id, content, ..
            } => {
                assert_eq!(sender_id, "u2");
                assert_eq!(content, "Is this available?");
            }
            other => panic!("expected ReceiveMessage, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn rejected_send_reaches_only_the_initiator() {
    let (db, chat) = seeded_chat();
    let rooms = RoomRegistry::new();

    let (origin, mut rx_origin) = rooms.register().await;
    let (other, mut rx_other) = rooms.register().await;
    rooms.join(origin, "ad_42_u_u2").await;
    rooms.join(other, "ad_42_u_u2").await;

    // receiver == sender fails the participant rule
    handle_command(
        &rooms,
        &chat,
        origin,
        "u2",
        GatewayCommand::SendMessage {
            ad_id: 42,
            chat_id: "ad_42_u_u2".to_string(),
            receiver_id: "u2".to_string(),
            content: Some("hello me".to_string()),
            image_urls: vec![],
        },
    )
    .await;

    match rx_origin.try_recv().unwrap() {
        GatewayEvent::SendRejected { .. } => {}
        other => panic!("expected SendRejected, got {:?}", other),
    }
    assert!(rx_other.try_recv().is_err());

    // Nothing was persisted either.
    assert!(db.get_transcript(42, "u1", "u2").unwrap().is_empty());
}

#[tokio::test]
async fn empty_send_is_a_silent_noop() {
    let (db, chat) = seeded_chat();
    let rooms = RoomRegistry::new();

    let (origin, mut rx_origin) = rooms.register().await;
    rooms.join(origin, "ad_42_u_u2").await;

    handle_command(
        &rooms,
        &chat,
        origin,
        "u2",
        GatewayCommand::SendMessage {
            ad_id: 42,
            chat_id: "ad_42_u_u2".to_string(),
            receiver_id: "u1".to_string(),
            content: Some("   ".to_string()),
            image_urls: vec![],
        },
    )
    .await;

    assert!(rx_origin.try_recv().is_err());
    assert!(db.get_transcript(42, "u1", "u2").unwrap().is_empty());
}

#[tokio::test]
async fn join_then_send_with_images() {
    let (db, chat) = seeded_chat();
    let rooms = RoomRegistry::new();

    let (origin, mut rx_origin) = rooms.register().await;
    handle_command(
        &rooms,
        &chat,
        origin,
        "u2",
        GatewayCommand::JoinChat {
            chat_id: "ad_42_u_u2".to_string(),
        },
    )
    .await;

    let urls = vec![
        "/uploads/chat/a.jpg".to_string(),
        "/uploads/chat/b.jpg".to_string(),
    ];
    handle_command(
        &rooms,
        &chat,
        origin,
        "u2",
        GatewayCommand::SendMessage {
            ad_id: 42,
            chat_id: "ad_42_u_u2".to_string(),
            receiver_id: "u1".to_string(),
            content: None,
            image_urls: urls.clone(),
        },
    )
    .await;

    match rx_origin.try_recv().unwrap() {
        GatewayEvent::ReceiveMessage {
            content,
            image_urls,
            ..
        } => {
            assert_eq!(content, "");
            assert_eq!(image_urls, urls);
        }
        other => panic!("expected ReceiveMessage, got {:?}", other),
    }

    let transcript = db.get_transcript(42, "u1", "u2").unwrap();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].image_urls, urls);
}
