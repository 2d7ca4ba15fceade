//! WebSocket side of the subscriptions: each connection holds one pub/sub
//! subscription and receives every matching event as a JSON text frame
//! `{"topic": ..., "data": ...}`.

use axum::{
    extract::{
        Query, State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::stream::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::pubsub::{NEW_ALERT_TOPIC, NEW_NOTIFICATION_TOPIC, Subscription};
use crate::web::AppState;
use crate::web::models::{
    AlertSubscriptionQuery, AlertView, NotificationSubscriptionQuery, NotificationView,
};

#[derive(Serialize)]
struct Push<'a, T> {
    topic: &'a str,
    data: &'a T,
}

/// `onNewAlert(zone?)`
pub async fn alerts_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<AlertSubscriptionQuery>,
) -> impl IntoResponse {
    let subscription = match query.zone.filter(|z| !z.is_empty()) {
        Some(zone) => app_state
            .alert_bus
            .subscribe_filtered(NEW_ALERT_TOPIC, move |alert: &AlertView| {
                alert.zone.as_deref() == Some(zone.as_str())
            }),
        None => app_state.alert_bus.subscribe(NEW_ALERT_TOPIC),
    };
    ws.on_upgrade(move |socket| forward_subscription(socket, subscription))
}

/// `onNotification(userId?)`
pub async fn notifications_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<NotificationSubscriptionQuery>,
) -> impl IntoResponse {
    let subscription = match query.user_id {
        Some(user_id) => app_state
            .notification_bus
            .subscribe_filtered(NEW_NOTIFICATION_TOPIC, move |n: &NotificationView| n.user_id == user_id),
        None => app_state.notification_bus.subscribe(NEW_NOTIFICATION_TOPIC),
    };
    ws.on_upgrade(move |socket| forward_subscription(socket, subscription))
}

async fn forward_subscription<T>(mut socket: WebSocket, mut subscription: Subscription<T>)
where
    T: Clone + Send + Serialize + 'static,
{
    let topic = subscription.topic().to_string();
    info!(topic = %topic, "WebSocket subscriber connected.");

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else { break };
                let json_data = match serde_json::to_string(&Push { topic: &topic, data: &event }) {
                    Ok(json_data) => json_data,
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "Failed to serialize event.");
                        continue;
                    }
                };
                if socket.send(Message::Text(Utf8Bytes::from(json_data))).await.is_err() {
                    debug!(topic = %topic, "Send failed, closing subscription.");
                    break;
                }
            }
            msg = socket.next() => {
                match msg {
                    Some(Ok(Message::Text(t))) if t.as_str() == "ping" => {
                        if socket.send(Message::Text(Utf8Bytes::from("pong"))).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(p))) => {
                        if socket.send(Message::Pong(p)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    subscription.cancel();
    info!(topic = %topic, "WebSocket subscriber disconnected.");
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures;
    use crate::pubsub::NEW_ALERT_TOPIC;
    use crate::web::create_axum_router;
    use crate::web::models::AlertView;
    use crate::web::test_support::state;
    use futures_util::StreamExt;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::time::Duration;
    use tokio_tungstenite::connect_async;

    #[tokio::test]
    async fn zone_subscriber_receives_only_its_zone() {
        let app_state = state(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = create_axum_router(app_state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let (mut socket, _) = connect_async(format!("ws://{addr}/ws/alerts?zone=Tayacaja"))
            .await
            .unwrap();

        // Wait for the server side to register the subscription.
        for _ in 0..50 {
            if app_state.alert_bus.subscriber_count(NEW_ALERT_TOPIC) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let acobamba = AlertView::new(&fixtures::alert(1), None);
        let mut tayacaja_alert = fixtures::alert(2);
        tayacaja_alert.zone = Some("Tayacaja".to_string());
        let tayacaja = AlertView::new(&tayacaja_alert, None);
        app_state.alert_bus.publish(NEW_ALERT_TOPIC, acobamba);
        app_state.alert_bus.publish(NEW_ALERT_TOPIC, tayacaja);

        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(body["topic"], "newAlert");
        assert_eq!(body["data"]["id"], 2);
        assert_eq!(body["data"]["zone"], "Tayacaja");
    }
}
