/* ================= SERVER API ================= */

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::session::{CatalogEntry, ChatTurn};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A spreadsheet read into memory, ready to become a multipart `file` part.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub api_key: String,
    pub model_id: String,
    pub history: Vec<ChatTurn>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
    /// Left untyped: the server sends `null`, `false` or a chart object.
    #[serde(default)]
    pub chart: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct UploadReply {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: Option<String>,
}

/// Talks to the SheetChat server. The server tracks uploaded files in a
/// cookie session, so the client keeps a cookie store for its lifetime.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

// reqwest::Client has no equality; two clients are the same endpoint if they
// share a base URL.
impl PartialEq for ApiClient {
    fn eq(&self, other: &Self) -> bool {
        self.base_url == other.base_url
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /upload with one `file` part per spreadsheet.
    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<CatalogEntry>, ApiError> {
        let mut form = Form::new();
        for file in files {
            debug!(file = %file.name, bytes = file.bytes.len(), "adding upload part");
            let part = Part::bytes(file.bytes).file_name(file.name).mime_str(XLSX_MIME)?;
            form = form.part("file", part);
        }

        let response = self.http.post(self.url("/upload")).multipart(form).send().await?;
        let reply: UploadReply = decode(response).await?;
        Ok(reply.catalog)
    }

    /// POST /chat with the message and the conversation so far.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let response = self.http.post(self.url("/chat")).json(request).send().await?;
        decode(response).await
    }

    /// POST /reset, asking the server to forget the uploaded files.
    pub async fn reset(&self) -> Result<(), ApiError> {
        let response = self.http.post(self.url("/reset")).send().await?;
        let _: Value = decode(response).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()));
    }

    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        });
    warn!(status = status.as_u16(), %message, "server returned an error");

    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use mockito::Matcher;
    use serde_json::json;

    fn sheet(name: &str) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            bytes: b"PK\x03\x04fake".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_upload_returns_catalog() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="sales.xlsx""#.into()),
                Matcher::Regex(r#"name="file"; filename="costs.xlsx""#.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "message": "Files uploaded and processed",
                    "catalog": [
                        {"filename": "sales.xlsx", "summary": "Sheet: Sales, Table 1: 3 rows"},
                        {"filename": "costs.xlsx", "summary": "Sheet: Costs, Table 1: 2 rows"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let api = ApiClient::new(server.url()).unwrap();
        let catalog = api.upload(vec![sheet("sales.xlsx"), sheet("costs.xlsx")]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].filename, "sales.xlsx");
        assert_eq!(catalog[1].summary, "Sheet: Costs, Table 1: 2 rows");
    }

    #[tokio::test]
    async fn test_upload_error_field_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(400)
            .with_body(r#"{"error": "Invalid file type: notes.txt"}"#)
            .create_async()
            .await;

        let api = ApiClient::new(server.url()).unwrap();
        let err = api.upload(vec![sheet("a.xlsx")]).await.unwrap_err();

        match err {
            ApiError::Server { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid file type: notes.txt");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_uses_status_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let api = ApiClient::new(server.url()).unwrap();
        let request = ChatRequest {
            message: "hi".into(),
            api_key: "k".into(),
            model_id: "gemini-2.5-flash".into(),
            history: vec![],
        };
        let err = api.chat(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 502, .. }));
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_chat_posts_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "message": "total sales?",
                "api_key": "secret",
                "model_id": "gemini-2.5-pro",
                "history": [{"role": "user", "content": "total sales?"}]
            })))
            .with_status(200)
            .with_body(r#"{"response": "**450** units", "chart": null}"#)
            .create_async()
            .await;

        let api = ApiClient::new(format!("{}/", server.url())).unwrap();
        let request = ChatRequest {
            message: "total sales?".into(),
            api_key: "secret".into(),
            model_id: "gemini-2.5-pro".into(),
            history: vec![ChatTurn::new(Role::User, "total sales?")],
        };
        let reply = api.chat(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply.response, "**450** units");
        assert!(reply.chart.is_none());
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let api = ApiClient::new(server.url()).unwrap();
        let request = ChatRequest {
            message: "hi".into(),
            api_key: "k".into(),
            model_id: "m".into(),
            history: vec![],
        };
        assert!(matches!(api.chat(&request).await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let api = ApiClient::new(format!("http://127.0.0.1:{port}")).unwrap();
        assert!(matches!(api.reset().await, Err(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn test_reset_posts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/reset")
            .with_status(200)
            .with_body(r#"{"message": "Session reset"}"#)
            .create_async()
            .await;

        let api = ApiClient::new(server.url()).unwrap();
        api.reset().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_session_cookie_from_upload_is_sent_back() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(200)
            .with_header("set-cookie", "session=abc123; Path=/; HttpOnly")
            .with_body(r#"{"catalog": [{"filename": "sales.xlsx", "summary": "Sheet: Sales"}]}"#)
            .create_async()
            .await;
        let chat = server
            .mock("POST", "/chat")
            .match_header("cookie", "session=abc123")
            .with_status(200)
            .with_body(r#"{"response": "uses files"}"#)
            .create_async()
            .await;
        let reset = server
            .mock("POST", "/reset")
            .match_header("cookie", "session=abc123")
            .with_status(200)
            .with_body(r#"{"message": "Session reset"}"#)
            .create_async()
            .await;

        let api = ApiClient::new(server.url()).unwrap();
        api.upload(vec![sheet("sales.xlsx")]).await.unwrap();

        let request = ChatRequest {
            message: "which product sold most?".into(),
            api_key: "k".into(),
            model_id: "gemini-2.5-flash".into(),
            history: vec![],
        };
        // a cloned handle shares the same cookie jar
        let reply = api.clone().chat(&request).await.unwrap();
        assert_eq!(reply.response, "uses files");
        api.reset().await.unwrap();

        chat.assert_async().await;
        reset.assert_async().await;
    }
}
