// HTTP client for the chat platform's bot API.
//
// Only the two calls enforcement needs: delete a message, send a text message.

use crate::core::platform::{ChatPlatform, PlatformError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpPlatformClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct NewMessageBody<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    message: Option<SentMessage>,
}

#[derive(Deserialize)]
struct SentMessage {
    body: Option<SentMessageBody>,
}

#[derive(Deserialize)]
struct SentMessageBody {
    mid: Option<String>,
}

impl HttpPlatformClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, PlatformError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(token).map_err(|e| PlatformError::Request(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url)
    }

    async fn check_status(resp: Response) -> Result<Response, PlatformError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(PlatformError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

fn message_id_from(raw: &str) -> Result<String, PlatformError> {
    let parsed: SendMessageResponse =
        serde_json::from_str(raw).map_err(|e| PlatformError::Decode(e.to_string()))?;
    parsed
        .message
        .and_then(|m| m.body)
        .and_then(|b| b.mid)
        .ok_or_else(|| PlatformError::Decode("response has no message id".to_string()))
}

#[async_trait]
impl ChatPlatform for HttpPlatformClient {
    async fn delete_message(&self, message_id: &str) -> Result<(), PlatformError> {
        let resp = self
            .client
            .delete(self.messages_url())
            .query(&[("message_id", message_id)])
            .send()
            .await
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        Self::check_status(resp).await?;
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, PlatformError> {
        let resp = self
            .client
            .post(self.messages_url())
            .query(&[("chat_id", chat_id.to_string())])
            .json(&NewMessageBody { text })
            .send()
            .await
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        let raw = Self::check_status(resp)
            .await?
            .text()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        message_id_from(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one request with a canned response; hands back the request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request
        });

        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_message_id_from_response() {
        let raw = r#"{"message":{"body":{"mid":"mid.123","text":"hi"}}}"#;
        assert_eq!(message_id_from(raw).unwrap(), "mid.123");

        assert!(matches!(
            message_id_from(r#"{"message":null}"#),
            Err(PlatformError::Decode(_))
        ));
        assert!(matches!(
            message_id_from("not json"),
            Err(PlatformError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_send_message_posts_json() {
        let (base, server) =
            serve_once("200 OK", r#"{"message":{"body":{"mid":"m-1"}}}"#).await;
        let client = HttpPlatformClient::new(&base, "secret").unwrap();

        let id = client.send_message(-42, "hello").await.unwrap();
        assert_eq!(id, "m-1");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /messages?chat_id=-42 "));
        assert!(request.to_lowercase().contains("authorization: secret"));
    }

    #[tokio::test]
    async fn test_delete_error_carries_status_and_body() {
        let (base, server) = serve_once("404 Not Found", r#"{"code":"not.found"}"#).await;
        let client = HttpPlatformClient::new(&format!("{}/", base), "secret").unwrap();

        let err = client.delete_message("m-9").await.unwrap_err();
        match err {
            PlatformError::Api { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("not.found"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let request = server.await.unwrap();
        assert!(request.starts_with("DELETE /messages?message_id=m-9 "));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let client = HttpPlatformClient::new("http://127.0.0.1:1", "secret").unwrap();
        assert!(matches!(
            client.delete_message("m").await,
            Err(PlatformError::Request(_))
        ));
    }
}
