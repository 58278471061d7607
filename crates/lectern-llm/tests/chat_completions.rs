//! End-to-end tests against a canned local HTTP endpoint.

use lectern_core::error::LecternError;
use lectern_core::traits::{GenerationOptions, Llm, LlmConfig};
use lectern_core::types::Message;
use lectern_llm::{LlmProvider, OpenAiCompatibleLlm};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one request with `status` and `body`, returning the raw request.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (base_url, handle)
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

fn client(base_url: String) -> OpenAiCompatibleLlm {
    let config = LlmConfig {
        api_key: Some("gsk-test".into()),
        base_url: Some(base_url),
        ..Default::default()
    };
    OpenAiCompatibleLlm::new(LlmProvider::Groq, config).unwrap()
}

#[tokio::test]
async fn test_successful_completion() {
    let body = serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": "{\"flashcards\": []}"}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
    })
    .to_string();
    let (base_url, server) = serve_once("200 OK", body).await;

    let llm = client(base_url);
    let response = llm
        .generate(&[Message::user("hi")], Some(GenerationOptions::json()))
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("{\"flashcards\": []}"));
    assert_eq!(response.usage.unwrap().total_tokens, 17);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_lowercase().contains("authorization: bearer gsk-test"));
    assert!(request.contains("\"json_object\""));
    assert!(request.contains("llama-3.1-70b-versatile"));
}

#[tokio::test]
async fn test_failed_generation_error() {
    let body = serde_json::json!({
        "error": {
            "message": "Failed to generate JSON",
            "code": "json_validate_failed",
            "failed_generation": "{\"front\": \"Osmosis\", \"back\": \"Diffusion of water\"}"
        }
    })
    .to_string();
    let (base_url, _server) = serve_once("400 Bad Request", body).await;

    let err = client(base_url)
        .generate(&[Message::user("hi")], None)
        .await
        .unwrap_err();

    assert!(matches!(err, LecternError::Llm { .. }));
    assert_eq!(
        err.failed_generation(),
        Some("{\"front\": \"Osmosis\", \"back\": \"Diffusion of water\"}")
    );
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
    drop(listener);

    let err = client(base_url)
        .generate(&[Message::user("hi")], None)
        .await
        .unwrap_err();
    assert!(matches!(err, LecternError::Network { .. }));
}
