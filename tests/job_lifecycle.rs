mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use docreview::{
    ChatMessage, ChatRequest, JobController, JobStatus, Severity, SharedRegistry, TabRegistry,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{chat_client, ndjson_reply, RecordingNotifier};

fn request(content: &str) -> ChatRequest {
    ChatRequest::new("llama3.1", vec![ChatMessage::user(content)], 0.0)
}

fn controller_against(
    server: &MockServer,
) -> (Arc<JobController>, SharedRegistry, Arc<RecordingNotifier>) {
    let registry: SharedRegistry = Arc::new(Mutex::new(TabRegistry::new()));
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = JobController::new(
        Arc::clone(&registry),
        chat_client(&server.uri()),
        Arc::clone(&notifier) as Arc<dyn docreview::Notifier>,
    );
    (controller, registry, notifier)
}

fn job_status(registry: &SharedRegistry, tab: &str) -> Option<JobStatus> {
    registry
        .lock()
        .expect("registry lock")
        .job(tab)
        .map(|job| job.status())
}

#[tokio::test]
async fn cancellation_settles_the_job_without_a_failure_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(ndjson_reply(&["slow"], true), "application/x-ndjson")
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let (controller, registry, notifier) = controller_against(&server);
    controller
        .start("Tab 1", request("take your time"), Vec::new())
        .expect("job starts");
    assert!(controller.is_running("Tab 1"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.cancel("Tab 1");
    controller.join("Tab 1").await;

    assert_eq!(job_status(&registry, "Tab 1"), Some(JobStatus::Cancelled));
    assert!(!controller.is_running("Tab 1"));
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn starting_a_new_job_supersedes_the_running_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(ndjson_reply(&["old answer"], true), "application/x-ndjson")
                .set_delay(Duration::from_millis(400)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson_reply(&["new answer"], true),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let (controller, registry, _) = controller_against(&server);
    let first = controller
        .start("Tab 1", request("first"), Vec::new())
        .expect("first job starts");
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = controller
        .start("Tab 1", request("second"), Vec::new())
        .expect("second job starts");
    assert_ne!(first, second);

    controller.join("Tab 1").await;
    // Give the superseded worker time to unwind; its events must not land.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let registry = registry.lock().expect("registry lock");
    let job = registry.job("Tab 1").expect("job present");
    assert_eq!(job.id, second);
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(job.text(), "new answer");
}

#[tokio::test]
async fn upstream_error_fails_the_job_and_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (controller, registry, notifier) = controller_against(&server);
    controller
        .start("Tab 1", request("doomed"), Vec::new())
        .expect("job starts");
    controller.join("Tab 1").await;

    assert_eq!(job_status(&registry, "Tab 1"), Some(JobStatus::Failed));
    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, Severity::Error);
    assert_eq!(notices[0].1, "Message Failed");
}

#[tokio::test]
async fn jobs_stream_into_background_tabs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/callollama"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson_reply(&["background answer"], true),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let (controller, registry, _) = controller_against(&server);
    {
        let mut registry = registry.lock().expect("registry lock");
        registry.add_tab(); // Tab 2, now active
    }

    controller
        .start("Tab 1", request("into the background tab"), Vec::new())
        .expect("job starts");
    controller.join("Tab 1").await;

    let registry = registry.lock().expect("registry lock");
    assert_eq!(registry.active(), "Tab 2");
    let job = registry.job("Tab 1").expect("job present");
    assert_eq!(job.text(), "background answer");
    assert_eq!(job.status(), JobStatus::Completed);
}
