use std::sync::Arc;

use pricebot::bot::Bot;
use pricebot::config::Settings;
use pricebot::transport::telegram::Telegram;
use pricebot::transport::{InboundMessage, ReplySink};
use pricebot::worker;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:test";

#[tokio::test]
async fn get_updates_returns_text_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{}/getUpdates", TOKEN)))
        .and(query_param("offset", "0"))
        .and(query_param("timeout", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": [
                {
                    "update_id": 11,
                    "message": {
                        "message_id": 3,
                        "from": { "id": 9, "username": "bob" },
                        "chat": { "id": 77 },
                        "text": "/quote BTC",
                        "entities": [{ "type": "bot_command", "offset": 0, "length": 6 }]
                    }
                },
                { "update_id": 12, "edited_message": { "message_id": 4 } }
            ]
        })))
        .mount(&server)
        .await;

    let telegram = Telegram::with_base_url(TOKEN, server.uri());
    let updates = telegram.get_updates(0, 0).await.unwrap();
    assert_eq!(updates.len(), 2);

    let messages: Vec<InboundMessage> = updates.into_iter().filter_map(|u| u.into_inbound()).collect();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].chat_id, 77);
    assert!(messages[0].is_command);
}

#[tokio::test]
async fn send_message_threads_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .and(body_partial_json(serde_json::json!({
            "chat_id": 77,
            "reply_to_message_id": 3,
            "text": "hello"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ok": true, "result": { "message_id": 4 } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let telegram = Telegram::with_base_url(TOKEN, server.uri());
    let reply = pricebot::transport::OutboundMessage {
        chat_id: 77,
        reply_to: 3,
        text: "hello".into(),
    };
    telegram.send(reply).await.unwrap();
}

#[tokio::test]
async fn send_message_reports_api_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "ok": false, "description": "Bad Request: chat not found" }),
        ))
        .mount(&server)
        .await;

    let telegram = Telegram::with_base_url(TOKEN, server.uri());
    let reply = pricebot::transport::OutboundMessage {
        chat_id: 1,
        reply_to: 1,
        text: "x".into(),
    };
    let result = telegram.send(reply).await;
    assert!(matches!(result, Err(pricebot::error::Error::Api(ref m)) if m.contains("chat not found")));
}

#[tokio::test]
async fn worker_pool_answers_each_message_and_drops_chatter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/BTC"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "price_usd": 20000.5 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ok": true, "result": {} })),
        )
        .expect(3)
        .mount(&server)
        .await;

    let settings = Settings {
        coincap_url: server.uri(),
        workers: 3,
        ..Settings::default()
    };
    let bot = Arc::new(Bot::from_settings(&settings));
    let sink: Arc<dyn ReplySink> = Arc::new(Telegram::with_base_url(TOKEN, server.uri()));
    let (tx, rx) = worker::queue(settings.workers);

    let texts = [
        ("/quote BTC", true),
        ("BTC", false),
        ("/help", true),
        ("this is just people talking", false),
    ];
    for (id, (text, is_command)) in texts.into_iter().enumerate() {
        tx.send(InboundMessage {
            chat_id: 77,
            message_id: id as i64,
            sender: None,
            text: text.to_string(),
            is_command,
        })
        .await
        .unwrap();
    }
    drop(tx);

    worker::run(settings.workers, rx, bot, sink).await;

    let sent = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().ends_with("/sendMessage"))
        .count();
    assert_eq!(sent, 3);
}
