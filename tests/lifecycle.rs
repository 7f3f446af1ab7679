//! End-to-end tests for service start, drain and shutdown.

use std::time::{Duration, Instant};

use multiserve::config::{LifecycleConfig, ListenerSpec};
use multiserve::lifecycle::{
    Exit, LifecycleError, Orchestrator, OrchestratorState, Service, ServiceState, StartupError,
};

mod common;

fn lifecycle(drain_timeout_secs: u64) -> LifecycleConfig {
    LifecycleConfig {
        drain_timeout_secs,
        ..LifecycleConfig::default()
    }
}

#[tokio::test]
async fn test_two_services_start_serve_and_stop() {
    let mut orchestrator = Orchestrator::new(lifecycle(30));
    orchestrator
        .add_service(common::ephemeral("main-server"), common::test_router("main"))
        .unwrap()
        .add_service(common::ephemeral("health-checker"), common::test_router("health"))
        .unwrap();

    orchestrator.start().await.unwrap();
    let main_addr = orchestrator.local_addr("main-server").unwrap();
    let health_addr = orchestrator.local_addr("health-checker").unwrap();
    assert_ne!(main_addr, health_addr);

    let client = common::client();
    let body = client
        .get(format!("http://{main_addr}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "main");
    let body = client
        .get(format!("http://{health_addr}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "health");

    let handle = orchestrator.shutdown_handle();
    let started = Instant::now();
    let run = tokio::spawn(async move {
        orchestrator.wait().await;
        let report = orchestrator.stop().await;
        (orchestrator, report)
    });
    handle.trigger();

    let (orchestrator, report) = run.await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(report.is_clean());
    assert_eq!(orchestrator.state(), OrchestratorState::Terminated);
    for service in orchestrator.services() {
        assert_eq!(service.state(), ServiceState::Stopped);
    }

    assert!(!common::accepts_connections(main_addr).await);
    assert!(!common::accepts_connections(health_addr).await);
}

#[tokio::test]
async fn test_in_flight_request_finishes_during_drain() {
    let mut service = Service::new(common::ephemeral("api"), common::test_router("api"))
        .with_drain_timeout(Duration::from_secs(5));
    service.start().await.unwrap();
    let addr = service.local_addr().unwrap();

    let request = tokio::spawn(async move {
        common::client()
            .get(format!("http://{addr}/slow/300"))
            .send()
            .await
            .map(|res| res.status())
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    service.stop().await.unwrap();

    let status = request.await.unwrap().expect("in-flight request was dropped");
    assert_eq!(status, 200);
    assert!(!common::accepts_connections(addr).await);
}

#[tokio::test]
async fn test_drain_deadline_forces_close() {
    let mut service = Service::new(common::ephemeral("api"), common::test_router("api"))
        .with_drain_timeout(Duration::from_millis(200));
    service.start().await.unwrap();
    let addr = service.local_addr().unwrap();

    let request = tokio::spawn(async move {
        common::client()
            .get(format!("http://{addr}/slow/10000"))
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    assert!(service.stop().await.is_ok());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(service.state(), ServiceState::Stopped);

    assert!(request.await.unwrap().is_err());
}

#[tokio::test]
async fn test_start_failure_stops_earlier_services() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let taken_addr = taken.local_addr().unwrap();

    let mut orchestrator = Orchestrator::new(lifecycle(1));
    orchestrator
        .add_service(common::ephemeral("first"), common::test_router("first"))
        .unwrap()
        .add_service(
            ListenerSpec::new("conflict", taken_addr.to_string()),
            common::test_router("conflict"),
        )
        .unwrap()
        .add_service(common::ephemeral("never"), common::test_router("never"))
        .unwrap();

    let err = orchestrator.start().await.unwrap_err();
    assert!(matches!(
        err,
        StartupError::Service(LifecycleError::Bind { ref service, .. }) if service == "conflict"
    ));
    assert_eq!(orchestrator.state(), OrchestratorState::Terminated);

    let states: Vec<_> = orchestrator.services().iter().map(Service::state).collect();
    assert_eq!(
        states,
        vec![ServiceState::Stopped, ServiceState::Created, ServiceState::Created]
    );
}

#[tokio::test]
async fn test_run_reports_startup_failure() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let taken_addr = taken.local_addr().unwrap();

    let mut orchestrator = Orchestrator::new(lifecycle(1));
    orchestrator
        .add_service(
            ListenerSpec::new("conflict", taken_addr.to_string()),
            common::test_router("conflict"),
        )
        .unwrap();

    assert_eq!(orchestrator.run().await, Exit::StartupFailed);
}

#[tokio::test]
async fn test_run_exits_clean_after_shutdown_event() {
    let mut orchestrator = Orchestrator::new(lifecycle(1));
    orchestrator
        .add_service(common::ephemeral("api"), common::test_router("api"))
        .unwrap();
    let handle = orchestrator.shutdown_handle();

    let run = tokio::spawn(orchestrator.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.trigger();
    // Redundant triggers are ignored.
    handle.trigger();

    let exit = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("orchestrator did not shut down")
        .unwrap();
    assert_eq!(exit, Exit::Clean);
}
