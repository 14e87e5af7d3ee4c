mod common;

use std::sync::Arc;

use docreview::{ChatSession, ChatSettings, NullNotifier, Role};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{chat_client, ndjson_reply, review_client};

fn session_against(server: &MockServer) -> ChatSession {
    ChatSession::new(
        chat_client(&server.uri()),
        review_client(&server.uri()),
        Arc::new(NullNotifier),
        ChatSettings::default(),
    )
}

#[tokio::test]
async fn marked_message_is_augmented_and_answer_carries_page_sources() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/document_qa"))
        .and(query_param("source_num", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "documents": "Refunds within 30 days.",
            "page_numbers": [4],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson_reply(&["You", " can", " get", " a", " refund."], true),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let mut session = session_against(&server);
    let job_id = session.send("@doc1 what is the refund policy?").await;
    assert!(job_id.is_some());
    session.join().await;

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, Role::User);
    assert_eq!(transcript[0].content, "@doc1 what is the refund policy?");
    assert_eq!(transcript[1].role, Role::Assistant);
    assert_eq!(
        transcript[1].content,
        "You can get a refund.\n\n\nPage Sources: [4]"
    );
    assert!(!session.is_streaming());

    // The wire copy carries the spliced passages; the transcript does not.
    let chat_request = server
        .received_requests()
        .await
        .expect("requests recorded")
        .into_iter()
        .find(|request| request.url.path() == "/callollama")
        .expect("chat request sent");
    let body: serde_json::Value =
        serde_json::from_slice(&chat_request.body).expect("chat body is json");
    assert_eq!(body["model"], "llama3.1");
    assert_eq!(body["options"]["temperature"], 0.0);
    let sent = body["messages"][0]["content"].as_str().expect("content");
    assert!(sent.starts_with("Refunds within 30 days."));
    assert!(sent.ends_with("@doc1 what is the refund policy?"));
}

#[tokio::test]
async fn unmarked_message_skips_retrieval_and_gets_no_footer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/document_qa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "documents": "should never be fetched",
            "page_numbers": [1],
        })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson_reply(&["Hello."], true),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let mut session = session_against(&server);
    session.send("say hello").await;
    session.join().await;

    let transcript = session.transcript();
    assert_eq!(transcript[1].content, "Hello.");
}

#[tokio::test]
async fn retrieval_failure_degrades_to_an_unaugmented_send() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/document_qa"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson_reply(&["Best effort."], true),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let mut session = session_against(&server);
    session.send("@doc1 summarize").await;
    session.join().await;

    let transcript = session.transcript();
    // No footer: retrieval produced no page sources.
    assert_eq!(transcript[1].content, "Best effort.");

    let chat_request = server
        .received_requests()
        .await
        .expect("requests recorded")
        .into_iter()
        .find(|request| request.url.path() == "/callollama")
        .expect("chat request sent");
    let body: serde_json::Value =
        serde_json::from_slice(&chat_request.body).expect("chat body is json");
    assert_eq!(body["messages"][0]["content"], "@doc1 summarize");
}

#[tokio::test]
async fn follow_up_turns_carry_the_settled_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson_reply(&["Answer."], true),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let mut session = session_against(&server);
    session.send("first question").await;
    session.join().await;
    session.send("second question").await;
    session.join().await;

    let requests = server.received_requests().await.expect("requests recorded");
    let body: serde_json::Value =
        serde_json::from_slice(&requests.last().expect("second request").body)
            .expect("chat body is json");
    let messages = body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["content"], "first question");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Answer.");
    assert_eq!(messages[2]["content"], "second question");

    assert_eq!(session.transcript().len(), 4);
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let server = MockServer::start().await;
    let mut session = session_against(&server);

    assert!(session.send("   ").await.is_none());
    assert!(session.transcript().is_empty());
    assert!(server
        .received_requests()
        .await
        .expect("requests recorded")
        .is_empty());
}

#[tokio::test]
async fn reset_clears_the_transcript_and_live_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson_reply(&["Answer."], true),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let mut session = session_against(&server);
    session.send("a question").await;
    session.join().await;

    session.reset();
    assert!(session.transcript().is_empty());
    assert!(!session.is_streaming());
}
