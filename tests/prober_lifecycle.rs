//! Integration tests for the prober scheduling loop
//!
//! Covers fixed-interval ticking, serialised cycles and cooperative stop.

use std::sync::Arc;
use std::time::Duration;
use uptime_probe::{
    metrics::Metrics,
    prober::{Prober, ProberSettings},
};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

const HOST: &str = "loop-host";

fn spawn_prober(target: &str, interval: Duration) -> (uptime_probe::prober::ProberHandle, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new(HOST, false).expect("metrics should build"));
    let settings = ProberSettings {
        target_url: target.to_string(),
        host: HOST.to_string(),
        interval,
        timeout: Duration::from_secs(5),
    };
    let handle = Prober::new(settings, metrics.clone())
        .expect("prober should build")
        .spawn();
    (handle, metrics)
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_first_tick_fires_immediately() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let target = mock_server.uri();
    let (handle, metrics) = spawn_prober(&target, Duration::from_secs(60));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let cycles = handle.stop().await.expect("prober should stop");

    assert_eq!(cycles, 1);
    assert_eq!(metrics.scrape_bytes(&target), 2);
    assert!(metrics.probe_duration(HOST, &target, "200").is_some());
}

#[tokio::test]
async fn test_ticks_repeat_on_interval() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("abc"))
        .mount(&mock_server)
        .await;

    let target = mock_server.uri();
    let (handle, metrics) = spawn_prober(&target, Duration::from_millis(100));

    tokio::time::sleep(Duration::from_millis(550)).await;
    let cycles = handle.stop().await.expect("prober should stop");

    assert!(cycles >= 3, "expected at least 3 cycles, got {}", cycles);
    assert_eq!(request_count(&mock_server).await as u64, cycles);
    assert_eq!(metrics.scrape_bytes(&target), 3 * cycles);
}

#[tokio::test]
async fn test_slow_cycles_do_not_overlap() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(250)))
        .mount(&mock_server)
        .await;

    // Interval shorter than the response time
    let (handle, _) = spawn_prober(&mock_server.uri(), Duration::from_millis(50));

    tokio::time::sleep(Duration::from_millis(600)).await;
    let cycles = handle.stop().await.expect("prober should stop");

    // Serialised: at most ceil(600 / 250) cycles can have started
    assert!(cycles <= 3, "cycles overlapped: {} in 600ms", cycles);
    assert_eq!(request_count(&mock_server).await as u64, cycles);
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_cycle() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![b'z'; 8])
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&mock_server)
        .await;

    let target = mock_server.uri();
    let (handle, metrics) = spawn_prober(&target, Duration::from_secs(60));

    // Let the first request get in flight
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());

    let started = std::time::Instant::now();
    let cycles = handle.stop().await.expect("prober should stop");

    assert_eq!(cycles, 1);
    assert!(
        started.elapsed() >= Duration::from_millis(200),
        "stop should wait for the in-flight request"
    );
    assert_eq!(metrics.scrape_bytes(&target), 8, "in-flight cycle must finish recording");
}

#[tokio::test]
async fn test_no_cycles_after_stop() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (handle, _) = spawn_prober(&mock_server.uri(), Duration::from_millis(50));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let cycles = handle.stop().await.expect("prober should stop");
    let seen_at_stop = request_count(&mock_server).await;

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(seen_at_stop as u64, cycles);
    assert_eq!(
        request_count(&mock_server).await,
        seen_at_stop,
        "no probe may run after the loop confirmed stop"
    );
}
