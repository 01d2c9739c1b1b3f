use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ChatConfig;

/// Shown when the service answered but gave nothing usable.
pub const NO_ANSWER_TEXT: &str = "No se encontró respuesta.";

#[derive(Debug, Error)]
pub enum ChatClientError {
    #[error("request to chat service failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("chat service returned {0}")]
    Status(StatusCode),
    #[error("could not decode chat service response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Body returned by `POST /chat`. Fields of an unexpected type read as
/// absent so that odd shapes fall through to the fallback answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    #[serde(default, deserialize_with = "lenient_text")]
    pub pregunta: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub seccion_detectada: Option<String>,
    #[serde(default, deserialize_with = "lenient_texts")]
    pub respuestas_similares: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_texts")]
    pub respuesta_similares: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub respuesta_generada: Option<String>,
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(text_of(&Value::deserialize(deserializer)?))
}

fn lenient_texts<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|items| items.iter().filter_map(text_of).collect()))
}

impl ChatReply {
    /// Reads a decoded body. Anything that is not an object has no usable
    /// fields.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        Self::deserialize(value).unwrap_or_default()
    }

    /// Text to show for this reply: the generated answer, else the similar
    /// answers one per line, else [`NO_ANSWER_TEXT`].
    pub fn reply_text(&self) -> String {
        if let Some(generated) = self.respuesta_generada.as_deref().filter(|s| !s.is_empty()) {
            return generated.to_string();
        }

        let similar = self
            .respuestas_similares
            .as_deref()
            .or(self.respuesta_similares.as_deref());
        match similar {
            Some(similar) if !similar.is_empty() => similar.join("\n"),
            _ => NO_ANSWER_TEXT.to_string(),
        }
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(&self, question: &str) -> Result<ChatReply, ChatClientError>;
}

pub struct ChatClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn ask(&self, question: &str) -> Result<ChatReply, ChatClientError> {
        let request_body = json!({ "pregunta": question });

        debug!("Sending request to {}: {}", self.endpoint, request_body);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request_body)
            .send()
            .await
            .map_err(ChatClientError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            debug!("Chat service answered with status {}", status);
            return Err(ChatClientError::Status(status));
        }

        let body = response.bytes().await.map_err(ChatClientError::Transport)?;
        let body: Value = serde_json::from_slice(&body).map_err(ChatClientError::Decode)?;

        debug!("Received response from chat service: {}", body);
        let reply = ChatReply::from_value(&body);
        if let Some(question) = &reply.pregunta {
            debug!("Service read the question as: {}", question);
        }
        if let Some(section) = &reply.seccion_detectada {
            debug!("Detected section: {}", section);
        }

        Ok(reply)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer) -> ChatClient {
        let config = ChatConfig::from_endpoint(&format!("{}/chat", server.uri())).unwrap();
        ChatClient::new(&config)
    }

    /// Endpoint on a local port that nothing listens on.
    pub(crate) fn closed_port_config() -> ChatConfig {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        ChatConfig::from_endpoint(&format!("http://127.0.0.1:{port}/chat")).unwrap()
    }

    fn reply(value: Value) -> ChatReply {
        ChatReply::from_value(&value)
    }

    async fn ask_with_body(body: ResponseTemplate) -> ChatReply {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(body)
            .mount(&server)
            .await;

        client_for(&server).ask("hola").await.unwrap()
    }

    #[test]
    fn generated_answer_wins() {
        let r = reply(json!({
            "respuesta_generada": "X",
            "respuestas_similares": ["A", "B"]
        }));
        assert_eq!(r.reply_text(), "X");
    }

    #[test]
    fn empty_generated_answer_falls_back_to_similar_answers() {
        let r = reply(json!({
            "respuesta_generada": "",
            "respuestas_similares": ["A", "B"]
        }));
        assert_eq!(r.reply_text(), "A\nB");
    }

    #[test]
    fn singular_similar_answers_field_is_accepted() {
        let r = reply(json!({ "respuesta_similares": ["solo uno"] }));
        assert_eq!(r.reply_text(), "solo uno");
    }

    #[test]
    fn missing_or_empty_fields_give_fallback() {
        assert_eq!(reply(json!({})).reply_text(), NO_ANSWER_TEXT);
        assert_eq!(
            reply(json!({ "respuesta_generada": null, "respuestas_similares": [] })).reply_text(),
            NO_ANSWER_TEXT
        );
        assert_eq!(reply(json!({ "detail": "Not Found" })).reply_text(), NO_ANSWER_TEXT);
    }

    #[tokio::test]
    async fn posts_question_and_parses_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "pregunta": "  ¿Cuál es el horario? " })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pregunta": "¿Cuál es el horario?",
                "seccion_detectada": "horario",
                "respuestas_similares": ["Abren a las 9"],
                "respuesta_generada": "9 a 18"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).ask("  ¿Cuál es el horario? ").await.unwrap();
        assert_eq!(reply.seccion_detectada.as_deref(), Some("horario"));
        assert_eq!(reply.reply_text(), "9 a 18");
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let r = reply(json!({
            "pregunta": ["no"],
            "seccion_detectada": 3,
            "respuesta_generada": null,
            "respuestas_similares": ["A", 7, null, {"x": 1}]
        }));
        assert_eq!(r.pregunta, None);
        assert_eq!(r.seccion_detectada.as_deref(), Some("3"));
        assert_eq!(r.reply_text(), "A\n7");

        let r = reply(json!({ "respuesta_generada": true, "respuestas_similares": "A" }));
        assert_eq!(r.reply_text(), NO_ANSWER_TEXT);
    }

    #[test]
    fn plural_similar_answers_take_precedence() {
        let r = reply(json!({
            "respuestas_similares": ["plural"],
            "respuesta_similares": ["singular"]
        }));
        assert_eq!(r.reply_text(), "plural");
    }

    #[test]
    fn non_object_bodies_give_fallback() {
        for body in [json!(null), json!([1, 2]), json!("texto"), json!(5)] {
            assert_eq!(reply(body).reply_text(), NO_ANSWER_TEXT);
        }
    }

    #[tokio::test]
    async fn unrelated_mistyped_field_keeps_answer() {
        let reply = ask_with_body(ResponseTemplate::new(200).set_body_json(json!({
            "respuesta_generada": "X",
            "seccion_detectada": 3
        })))
        .await;
        assert_eq!(reply.reply_text(), "X");
    }

    #[tokio::test]
    async fn null_body_gives_fallback() {
        let reply = ask_with_body(ResponseTemplate::new(200).set_body_json(json!(null))).await;
        assert_eq!(reply.reply_text(), NO_ANSWER_TEXT);
    }

    #[tokio::test]
    async fn numeric_answer_is_shown_as_text() {
        let reply = ask_with_body(
            ResponseTemplate::new(200).set_body_json(json!({ "respuesta_generada": 42 })),
        )
        .await;
        assert_eq!(reply.reply_text(), "42");
    }

    #[tokio::test]
    async fn server_error_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "respuesta_generada": "should be ignored"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).ask("hola").await.unwrap_err();
        assert!(matches!(err, ChatClientError::Status(code) if code == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).ask("hola").await.unwrap_err();
        assert!(matches!(err, ChatClientError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = ChatClient::new(&closed_port_config());

        let err = client.ask("hola").await.unwrap_err();
        assert!(matches!(err, ChatClientError::Transport(_)));
    }
}
