//! Readiness checks against real local sockets

use async_net::TcpListener;
use async_trait::async_trait;
use deploy_orchestration::{
    ContainerEngine, ContainerState, ProbeSpec, ReadinessChecker, ReadinessProbe,
    ServiceDescriptor, StatusRange, Verdict,
};
use futures::{AsyncReadExt, AsyncWriteExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine whose inspect answers come from a fixed field value
struct InspectOnly(Option<&'static str>);

#[async_trait]
impl ContainerEngine for InspectOnly {
    async fn container_state(
        &self,
        _service: &ServiceDescriptor,
    ) -> deploy_orchestration::Result<ContainerState> {
        Ok(ContainerState::NotCreated)
    }

    async fn start(&self, _service: &ServiceDescriptor) -> deploy_orchestration::Result<()> {
        Ok(())
    }

    async fn inspect_field(
        &self,
        _container: &str,
        _field: &str,
    ) -> deploy_orchestration::Result<Option<String>> {
        Ok(self.0.map(String::from))
    }
}

/// Engine whose inspect call never comes back
struct HangingInspect;

#[async_trait]
impl ContainerEngine for HangingInspect {
    async fn container_state(
        &self,
        _service: &ServiceDescriptor,
    ) -> deploy_orchestration::Result<ContainerState> {
        Ok(ContainerState::Running)
    }

    async fn start(&self, _service: &ServiceDescriptor) -> deploy_orchestration::Result<()> {
        Ok(())
    }

    async fn inspect_field(
        &self,
        _container: &str,
        _field: &str,
    ) -> deploy_orchestration::Result<Option<String>> {
        smol::Timer::after(Duration::from_secs(60)).await;
        Ok(Some("running".to_string()))
    }
}

fn checker(field: Option<&'static str>) -> ReadinessChecker {
    ReadinessChecker::new(Arc::new(InspectOnly(field)), Duration::from_secs(2)).unwrap()
}

/// Serve every connection with a fixed HTTP status, returning the port
async fn serve_status(status: u16) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    smol::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.close().await;
        }
    })
    .detach();

    port
}

/// A port nothing listens on
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[smol_potat::test]
async fn test_tcp_check_ready_when_listening() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let verdict = checker(None).probe(&ProbeSpec::tcp("127.0.0.1", port)).await;
    assert_eq!(verdict, Verdict::Ready);
}

#[smol_potat::test]
async fn test_tcp_check_refused_is_not_ready() {
    let port = closed_port().await;
    let verdict = checker(None).probe(&ProbeSpec::tcp("127.0.0.1", port)).await;
    assert!(matches!(verdict, Verdict::NotReady(_)), "{:?}", verdict);
}

#[smol_potat::test]
async fn test_http_check_uses_status_range() {
    let ok = serve_status(200).await;
    let unavailable = serve_status(503).await;
    let checker = checker(None);

    let verdict = checker
        .probe(&ProbeSpec::http(format!("http://127.0.0.1:{}/api/status", ok)))
        .await;
    assert_eq!(verdict, Verdict::Ready);

    let verdict = checker
        .probe(&ProbeSpec::http(format!("http://127.0.0.1:{}/", unavailable)))
        .await;
    assert!(matches!(verdict, Verdict::NotReady(_)), "{:?}", verdict);
}

#[smol_potat::test]
async fn test_http_check_accepts_client_errors_when_declared() {
    let port = serve_status(404).await;
    let probe = ProbeSpec::HttpGet {
        url: format!("http://127.0.0.1:{}/", port),
        expected_status: StatusRange::new(200, 499),
    };

    assert_eq!(checker(None).probe(&probe).await, Verdict::Ready);
}

#[smol_potat::test]
async fn test_http_check_refused_is_not_ready() {
    let port = closed_port().await;
    let verdict = checker(None)
        .probe(&ProbeSpec::http(format!("http://127.0.0.1:{}/", port)))
        .await;
    assert!(matches!(verdict, Verdict::NotReady(_)), "{:?}", verdict);
}

#[smol_potat::test]
async fn test_http_check_bad_host_is_unknown() {
    let verdict = checker(None)
        .probe(&ProbeSpec::http("http://no-such-host.invalid:9200/"))
        .await;
    assert!(matches!(verdict, Verdict::Unknown(_)), "{:?}", verdict);
}

#[smol_potat::test]
async fn test_process_field_check() {
    let probe = ProbeSpec::process_field("dionaea-honeypot", "State.Status");

    assert_eq!(checker(Some("running")).probe(&probe).await, Verdict::Ready);
    assert!(matches!(
        checker(Some("exited")).probe(&probe).await,
        Verdict::NotReady(_)
    ));
    assert!(matches!(checker(None).probe(&probe).await, Verdict::NotReady(_)));
}

/// Accept connections and hold them open without ever answering
async fn serve_silence() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    smol::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    })
    .detach();

    port
}

#[smol_potat::test]
async fn test_http_check_gives_up_on_silent_server() {
    let port = serve_silence().await;
    let checker =
        ReadinessChecker::new(Arc::new(InspectOnly(None)), Duration::from_secs(1)).unwrap();

    let began = Instant::now();
    let verdict = checker
        .probe(&ProbeSpec::http(format!("http://127.0.0.1:{}/", port)))
        .await;
    let elapsed = began.elapsed();

    assert!(matches!(verdict, Verdict::Unknown(_)), "{:?}", verdict);
    assert!(elapsed >= Duration::from_millis(900), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "{:?}", elapsed);
}

#[smol_potat::test]
async fn test_field_check_gives_up_on_hung_engine() {
    let checker =
        ReadinessChecker::new(Arc::new(HangingInspect), Duration::from_millis(500)).unwrap();

    let began = Instant::now();
    let verdict = checker
        .probe(&ProbeSpec::process_field("dionaea-honeypot", "State.Status"))
        .await;

    assert!(matches!(verdict, Verdict::Unknown(_)), "{:?}", verdict);
    assert!(began.elapsed() < Duration::from_secs(2));
}

#[smol_potat::test]
async fn test_tcp_check_bad_host_is_unknown() {
    let checker =
        ReadinessChecker::new(Arc::new(InspectOnly(None)), Duration::from_secs(1)).unwrap();

    let began = Instant::now();
    let verdict = checker
        .probe(&ProbeSpec::tcp("no-such-host.invalid", 2222))
        .await;

    assert!(matches!(verdict, Verdict::Unknown(_)), "{:?}", verdict);
    assert!(began.elapsed() < Duration::from_secs(3));
}
