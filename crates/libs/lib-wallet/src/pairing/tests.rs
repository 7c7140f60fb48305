use super::*;
use crate::provider::ProviderEvent;
use crate::testing::{MockBalances, MockRelay, ALICE, BOB, SEPOLIA, VALID_PROJECT_ID};
use lib_core::ErrorCategory;
use serde_json::json;
use shared::dto::wallet::ConnectionStatus;

const URI: &str = "wc:7f6e504bfad60b485450578e05678ed3e8e8c4751d3c6160be17160d63ec90f9@2?relay-protocol=irn";

fn options() -> PairingOptions {
    PairingOptions {
        project_id: Some(VALID_PROJECT_ID.to_string()),
        ..PairingOptions::default()
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn controller() -> SessionController {
    SessionController::new(SEPOLIA, Some(MockBalances::new(7)))
}

fn spawn_pair(
    pairing: &Arc<RemotePairing>,
    controller: &SessionController,
) -> tokio::task::JoinHandle<Result<ConnectOutcome, ConnectionError>> {
    let pairing = pairing.clone();
    let controller = controller.clone();
    tokio::spawn(async move { controller.connect_with(pairing.as_ref()).await })
}

#[tokio::test(start_paused = true)]
async fn test_pairing_end_to_end() {
    let address = "0xAAAA...1111";
    let uri = "wc:abc123";
    let relay = MockRelay::new(vec![
        (secs(2), RelayEvent::DisplayUri(uri.to_string())),
        (secs(3), RelayEvent::Connect {
            accounts: vec![address.to_string()],
        }),
    ]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();
    let mut states = pairing.subscribe();
    controller.begin_connection().unwrap();

    let attempt = spawn_pair(&pairing, &controller);

    tokio::time::sleep(secs(3)).await;
    states.changed().await.unwrap();
    assert_eq!(states.borrow_and_update().uri(), Some(uri));
    assert!(matches!(
        pairing.state(),
        PairingState::AwaitingPeerApproval { .. }
    ));

    let outcome = attempt.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        ConnectOutcome::Connected {
            address: address.to_string()
        }
    );
    assert_eq!(
        pairing.state(),
        PairingState::Paired {
            address: address.to_string()
        }
    );

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
    assert_eq!(snapshot.address.as_deref(), Some(address));
    assert_eq!(snapshot.chain_id, Some(SEPOLIA));
    assert_eq!(snapshot.balance, Some(7));
    assert_eq!(controller.provider().unwrap().kind(), "relay");

    // A paired session stays open
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_uri_timeout_tears_down_once() {
    let relay = MockRelay::new(vec![(secs(20), RelayEvent::DisplayUri(URI.to_string()))]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();
    controller.begin_connection().unwrap();

    let started = Instant::now();
    let err = spawn_pair(&pairing, &controller).await.unwrap().unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert_eq!(started.elapsed(), secs(15));
    assert_eq!(relay.init_calls(), 1);
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 1);
    assert!(matches!(pairing.state(), PairingState::Failed(ref e) if e.category() == ErrorCategory::Timeout));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Failed);
    assert_eq!(snapshot.error.unwrap().category, ErrorCategory::Timeout);

    // The late URI lands on a torn-down attempt
    tokio::time::sleep(secs(10)).await;
    assert!(matches!(pairing.state(), PairingState::Failed(_)));
    assert_eq!(controller.status(), ConnectionStatus::Failed);
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_uri_cancels_timer() {
    let relay = MockRelay::new(vec![
        (secs(14), RelayEvent::DisplayUri(URI.to_string())),
        (secs(60), RelayEvent::Connect {
            accounts: vec![BOB.to_string()],
        }),
    ]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    let outcome = spawn_pair(&pairing, &controller).await.unwrap().unwrap();
    assert_eq!(
        outcome,
        ConnectOutcome::Connected {
            address: BOB.to_string()
        }
    );
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_approval_timeout() {
    let relay = MockRelay::new(vec![(secs(1), RelayEvent::DisplayUri(URI.to_string()))]);
    let pairing = Arc::new(RemotePairing::new(
        relay.clone(),
        PairingOptions {
            approval_timeout: Some(secs(30)),
            ..options()
        },
    ));
    let controller = controller();

    let started = Instant::now();
    let err = spawn_pair(&pairing, &controller).await.unwrap().unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert_eq!(started.elapsed(), secs(31));
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_placeholder_project_id_fails_before_relay() {
    for project_id in [
        None,
        Some("your_walletconnect_project_id_here"),
        Some("abc123"),
    ] {
        let relay = MockRelay::new(vec![]);
        let pairing = RemotePairing::new(
            relay.clone(),
            PairingOptions {
                project_id: project_id.map(str::to_string),
                ..PairingOptions::default()
            },
        );
        let controller = controller();
        controller.begin_connection().unwrap();

        let err = controller.connect_with(&pairing).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidConfiguration);
        assert_eq!(relay.init_calls(), 0, "project id: {project_id:?}");
        assert_eq!(controller.status(), ConnectionStatus::Failed);
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_awaiting_uri() {
    let relay = MockRelay::new(vec![(secs(10), RelayEvent::DisplayUri(URI.to_string()))]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();
    controller.begin_connection().unwrap();

    let attempt = spawn_pair(&pairing, &controller);
    tokio::time::sleep(secs(3)).await;
    assert_eq!(pairing.state(), PairingState::AwaitingUri);

    pairing.cancel();
    let outcome = attempt.await.unwrap().unwrap();

    assert_eq!(outcome, ConnectOutcome::Cancelled);
    assert_eq!(pairing.state(), PairingState::Cancelled);
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 1);

    // No timer left to fire, no URI accepted
    tokio::time::sleep(secs(30)).await;
    assert_eq!(pairing.state(), PairingState::Cancelled);
    assert_eq!(controller.status(), ConnectionStatus::AwaitingMethodChoice);

    pairing.reset();
    assert_eq!(pairing.state(), PairingState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_awaiting_approval() {
    let relay = MockRelay::new(vec![(secs(1), RelayEvent::DisplayUri(URI.to_string()))]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    let attempt = spawn_pair(&pairing, &controller);
    tokio::time::sleep(secs(5)).await;
    assert_eq!(pairing.state().uri(), Some(URI));

    pairing.cancel();
    assert_eq!(attempt.await.unwrap().unwrap(), ConnectOutcome::Cancelled);

    let session = relay.last_session().unwrap();
    assert_eq!(session.disconnect_calls(), 1);

    // Approval after cancel is dropped
    session.emit(RelayEvent::Connect {
        accounts: vec![ALICE.to_string()],
    });
    tokio::time::sleep(secs(1)).await;
    assert_eq!(controller.status(), ConnectionStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_enable_resolves_pairing() {
    let relay = MockRelay::with_enable(
        vec![(secs(1), RelayEvent::DisplayUri(URI.to_string()))],
        Ok(vec![ALICE.to_string(), BOB.to_string()]),
    );
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    let outcome = spawn_pair(&pairing, &controller).await.unwrap().unwrap();
    assert_eq!(
        outcome,
        ConnectOutcome::Connected {
            address: ALICE.to_string()
        }
    );
    assert_eq!(controller.address().as_deref(), Some(ALICE));
}

#[tokio::test(start_paused = true)]
async fn test_enable_error_is_classified() {
    let relay = MockRelay::with_enable(
        vec![],
        Err(RelayError::new("Failed to publish custom payload, please try again.")),
    );
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    let err = spawn_pair(&pairing, &controller).await.unwrap().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NetworkUnavailable);
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_init_error_is_classified() {
    let relay = MockRelay::failing_init("Invalid projectId: project not found");
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    let err = spawn_pair(&pairing, &controller).await.unwrap().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidConfiguration);
    assert!(relay.last_session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_session_delete_before_approval() {
    let relay = MockRelay::new(vec![
        (secs(1), RelayEvent::DisplayUri(URI.to_string())),
        (secs(1), RelayEvent::SessionEvent(json!({"name": "chainChanged"}))),
        (secs(1), RelayEvent::SessionDelete),
    ]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    let err = spawn_pair(&pairing, &controller).await.unwrap().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NetworkUnavailable);
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_uri_ignored() {
    let second_uri = "wc:ffff@2?relay-protocol=irn";
    let relay = MockRelay::new(vec![
        (secs(1), RelayEvent::DisplayUri(URI.to_string())),
        (secs(1), RelayEvent::DisplayUri(second_uri.to_string())),
    ]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    let _attempt = spawn_pair(&pairing, &controller);
    tokio::time::sleep(secs(5)).await;
    assert_eq!(pairing.state().uri(), Some(URI));
    pairing.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_each_attempt_opens_new_session() {
    let relay = MockRelay::new(vec![]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    for _ in 0..2 {
        let err = spawn_pair(&pairing, &controller).await.unwrap().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }
    assert_eq!(relay.init_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_pair_rejected() {
    let relay = MockRelay::new(vec![]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();

    let first = tokio::spawn({
        let pairing = pairing.clone();
        let controller = controller.clone();
        async move { pairing.pair(&controller).await }
    });
    tokio::task::yield_now().await;

    let err = pairing.pair(&controller).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::AlreadyPending);
    assert_eq!(pairing.state(), PairingState::AwaitingUri);

    pairing.cancel();
    assert_eq!(first.await.unwrap().unwrap(), ConnectOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_paired_session_events_reach_controller() {
    let relay = MockRelay::new(vec![
        (secs(1), RelayEvent::DisplayUri(URI.to_string())),
        (secs(1), RelayEvent::Connect {
            accounts: vec![ALICE.to_string()],
        }),
    ]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();
    spawn_pair(&pairing, &controller).await.unwrap().unwrap();

    relay
        .last_session()
        .unwrap()
        .emit_provider(ProviderEvent::Disconnected);
    tokio::time::sleep(secs(1)).await;

    assert_eq!(controller.status(), ConnectionStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_pairing_closes_session() {
    let relay = MockRelay::new(vec![
        (secs(1), RelayEvent::DisplayUri(URI.to_string())),
        (secs(1), RelayEvent::Connect {
            accounts: vec![ALICE.to_string()],
        }),
    ]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let balances = MockBalances::new(7);
    balances.set_delay(secs(5));
    let controller = SessionController::new(SEPOLIA, Some(balances.clone()));

    let attempt = spawn_pair(&pairing, &controller);
    tokio::time::sleep(secs(3)).await;
    assert_eq!(controller.status(), ConnectionStatus::Connecting);
    controller.disconnect();

    let outcome = attempt.await.unwrap().unwrap();
    assert_eq!(outcome, ConnectOutcome::Superseded);
    assert_eq!(pairing.state(), PairingState::Cancelled);
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 1);

    assert_eq!(controller.status(), ConnectionStatus::Idle);
    assert!(controller.provider().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unusable_paired_account_closes_session() {
    let relay = MockRelay::new(vec![
        (secs(1), RelayEvent::DisplayUri(URI.to_string())),
        (secs(1), RelayEvent::Connect {
            accounts: vec!["0xAAAA 1111".to_string()],
        }),
    ]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();
    controller.begin_connection().unwrap();

    let err = spawn_pair(&pairing, &controller).await.unwrap().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unknown);
    assert!(matches!(pairing.state(), PairingState::Failed(_)));
    assert_eq!(relay.last_session().unwrap().disconnect_calls(), 1);
    assert_eq!(controller.status(), ConnectionStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_attempt_starts() {
    let relay = MockRelay::new(vec![(secs(1), RelayEvent::DisplayUri(URI.to_string()))]);
    let pairing = Arc::new(RemotePairing::new(relay.clone(), options()));
    let controller = controller();
    controller.begin_connection().unwrap();

    pairing.arm();
    pairing.cancel();
    let outcome = spawn_pair(&pairing, &controller).await.unwrap().unwrap();

    assert_eq!(outcome, ConnectOutcome::Cancelled);
    assert_eq!(pairing.state(), PairingState::Cancelled);
    assert_eq!(relay.init_calls(), 0);
    assert_eq!(controller.status(), ConnectionStatus::AwaitingMethodChoice);

    // A fresh arm is not affected by the earlier cancel
    pairing.arm();
    let attempt = spawn_pair(&pairing, &controller);
    tokio::time::sleep(secs(2)).await;
    assert_eq!(pairing.state().uri(), Some(URI));
    pairing.cancel();
    assert_eq!(attempt.await.unwrap().unwrap(), ConnectOutcome::Cancelled);
}

#[test]
fn test_options_from_config() {
    let config = Config {
        project_id: Some(VALID_PROJECT_ID.to_string()),
        approval_timeout: Some(secs(120)),
        ..Config::default()
    };
    let options = PairingOptions::from_config(&config);
    assert_eq!(options.chains, vec![SEPOLIA]);
    assert_eq!(options.uri_timeout, secs(15));
    assert_eq!(options.approval_timeout, Some(secs(120)));
    assert_eq!(options.metadata.name, "ArmaDEX");
}
