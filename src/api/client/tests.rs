use super::*;
use crate::api::{ChatMessage, Credential};
use crate::core::decoder::Utf8StreamDecoder;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_api() -> HttpApi {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client should build");
    HttpApi::with_client(client)
}

fn test_ctx(base_url: &str) -> ApiContext {
    ApiContext::new(base_url, Credential::new("test-key"))
}

async fn collect_stream(mut stream: ByteStream) -> Vec<u8> {
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.expect("chunk should read"));
    }
    body
}

#[tokio::test]
async fn list_files_sends_api_key_and_parses_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("X-API-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"file_id": "a1", "filename": "pto.pdf", "upload_date": "2024-01-02T03:04:05.000001"},
            {"file_id": "b2", "filename": "benefits.docx", "upload_date": "2024-02-03T04:05:06"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let files = test_api()
        .list_files(&test_ctx(&server.uri()))
        .await
        .expect("listing should succeed");

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].id, "a1");
    assert_eq!(files[1].filename, "benefits.docx");
}

#[tokio::test]
async fn list_files_reports_status_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Invalid API Key"})))
        .mount(&server)
        .await;

    let err = test_api()
        .list_files(&test_ctx(&server.uri()))
        .await
        .expect_err("403 should fail");

    match err {
        ApiError::Status { status, detail } => {
            assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
            assert_eq!(detail, "Invalid API Key");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn list_files_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"files\": 3}"))
        .mount(&server)
        .await;

    let err = test_api()
        .list_files(&test_ctx(&server.uri()))
        .await
        .expect_err("object body should not parse as a list");
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn delete_file_accepts_no_content_and_encodes_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/files/a%2Fb"))
        .and(header("X-API-Key", "test-key"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    test_api()
        .delete_file(&test_ctx(&server.uri()), "a/b")
        .await
        .expect("204 should count as success");
}

#[tokio::test]
async fn upload_file_posts_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": "new-1",
            "filename": "policy.txt",
            "upload_date": "2024-05-06T07:08:09"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().expect("temp dir");
    let file_path = dir.path().join("policy.txt");
    std::fs::write(&file_path, "Employees accrue 15 days of PTO.").expect("write fixture");

    let record = test_api()
        .upload_file(&test_ctx(&server.uri()), &file_path)
        .await
        .expect("upload should succeed");
    assert_eq!(record.id, "new-1");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"policy.txt\""));
    assert!(body.contains("Employees accrue 15 days of PTO."));
}

#[tokio::test]
async fn upload_file_reports_missing_local_file() {
    let err = test_api()
        .upload_file(
            &test_ctx("http://127.0.0.1:9"),
            Path::new("/definitely/not/here.pdf"),
        )
        .await
        .expect_err("missing file should fail before any request");
    assert!(matches!(err, ApiError::ReadFile { .. }));
}

#[tokio::test]
async fn open_chat_posts_question_and_history() {
    let server = MockServer::start().await;
    let request = ChatRequest {
        question: "What is the PTO policy?".into(),
        history: vec![ChatMessage {
            role: "assistant".into(),
            content: "Hello!".into(),
        }],
    };
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("X-API-Key", "test-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "question": "What is the PTO policy?",
            "history": [{"role": "assistant", "content": "Hello!"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("The PTO policy is 15 days."),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stream = test_api()
        .open_chat(&test_ctx(&server.uri()), &request)
        .await
        .expect("chat should open");
    assert_eq!(collect_stream(stream).await, b"The PTO policy is 15 days.");
}

#[tokio::test]
async fn open_chat_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "index offline"})))
        .mount(&server)
        .await;

    let request = ChatRequest {
        question: "hi".into(),
        history: Vec::new(),
    };
    let err = match test_api().open_chat(&test_ctx(&server.uri()), &request).await {
        Ok(_) => panic!("500 should not open a stream"),
        Err(err) => err,
    };
    assert_eq!(err.status_code(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
    assert!(err.to_string().contains("index offline"));
}

#[tokio::test]
async fn chat_blocking_returns_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/blocking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "15 days."})))
        .mount(&server)
        .await;

    let request = ChatRequest {
        question: "PTO?".into(),
        history: Vec::new(),
    };
    let answer = test_api()
        .chat_blocking(&test_ctx(&server.uri()), &request)
        .await
        .expect("blocking chat should succeed");
    assert_eq!(answer, "15 days.");
}

async fn read_request_head(stream: &mut tokio::net::TcpStream) -> Result<String, String> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("connection closed before headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buffer[..end]).into_owned();
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let mut body_len = buffer.len() - (end + 4);
            while body_len < content_length {
                let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
                if read == 0 {
                    break;
                }
                body_len += read;
            }
            return Ok(head);
        }
    }
}

#[tokio::test]
async fn open_chat_streams_chunked_body_with_split_multibyte_character() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
        let head = read_request_head(&mut stream).await?;

        let first: &[u8] = &[b'C', b'a', b'f', 0xC3];
        let second: &[u8] = &[0xA9, b' ', b'a', b'u', b' ', b'l', b'a', b'i', b't'];
        let mut response =
            b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ntransfer-encoding: chunked\r\n\r\n"
                .to_vec();
        response.extend_from_slice(format!("{:x}\r\n", first.len()).as_bytes());
        response.extend_from_slice(first);
        response.extend_from_slice(b"\r\n");
        stream
            .write_all(&response)
            .await
            .map_err(|err| err.to_string())?;
        stream.flush().await.map_err(|err| err.to_string())?;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let mut rest = format!("{:x}\r\n", second.len()).into_bytes();
        rest.extend_from_slice(second);
        rest.extend_from_slice(b"\r\n0\r\n\r\n");
        stream.write_all(&rest).await.map_err(|err| err.to_string())?;
        Ok::<String, String>(head)
    });

    let request = ChatRequest {
        question: "Coffee?".into(),
        history: Vec::new(),
    };
    let mut stream = test_api()
        .open_chat(&test_ctx(&format!("http://{addr}")), &request)
        .await
        .expect("chat should open");

    let mut decoder = Utf8StreamDecoder::new();
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&decoder.decode(&chunk.expect("chunk should read")));
    }
    text.push_str(&decoder.finish());
    assert_eq!(text, "Café au lait");

    let head = server_task
        .await
        .expect("server task should join")
        .expect("server should respond");
    assert!(head.starts_with("POST /chat HTTP/1.1"));
    assert!(head.to_ascii_lowercase().contains("x-api-key: test-key"));
}
