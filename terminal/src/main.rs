use anyhow::{bail, Context};
use lib_core::Config;
use lib_wallet::{InjectedConnector, RpcClient, SessionController};
use shared::dto::wallet::ConnectMethod;
use shared::utils::short_address;
use std::sync::Arc;
use terminal::{App, AppEvent, Screen};
use tracing::{info, warn};

fn parse_method(arg: Option<&str>) -> anyhow::Result<Option<ConnectMethod>> {
    match arg {
        None => Ok(None),
        Some("browser") | Some("injected") => Ok(Some(ConnectMethod::Injected)),
        Some("pairing") | Some("walletconnect") => Ok(Some(ConnectMethod::RemotePairing)),
        Some(other) => bail!("unknown connection method '{}' (expected browser or pairing)", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = terminal::debug::init().context("failed to initialize logging")?;

    let method = parse_method(std::env::args().nth(1).as_deref())?;
    let config = Config::load().context("invalid configuration")?;
    info!(rpc_url = %config.rpc_url, chain_id = config.chain_id, "Starting ArmaDEX");

    let rpc = Arc::new(RpcClient::new(config.rpc_url.clone()));
    let controller = SessionController::new(config.chain_id, Some(rpc.clone()));
    // The shell ships no relay transport; remote pairing reports it as unavailable
    let app = App::new(controller, InjectedConnector::new(Some(rpc)), None);

    let events = app.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                AppEvent::ConnectionChanged(snapshot) => {
                    info!(status = %snapshot.status, "Connection state changed")
                }
                AppEvent::PairingUri(uri) => info!(%uri, "Scan with your mobile wallet"),
                AppEvent::ConnectionFailed { category, message } => {
                    warn!(%category, "{}", message)
                }
                AppEvent::AttemptCancelled => info!("Connection cancelled"),
            }
        }
    });

    if let Some(address) = app.restore_session().await {
        info!(address = %short_address(&address), "Welcome back");
    }

    if let (Some(method), Screen::Landing) = (method, app.screen()) {
        app.open_connect_modal()?;
        app.choose_method(method);

        let attempt = app.wait_for_attempt();
        tokio::pin!(attempt);
        tokio::select! {
            _ = &mut attempt => {}
            _ = tokio::signal::ctrl_c() => {
                app.close_modal();
                attempt.await;
            }
        }
    }

    let snapshot = app.snapshot();
    info!(screen = app.screen().title(), status = %snapshot.status, "Ready");

    if app.screen() == Screen::Dashboard {
        if let Some(address) = snapshot.address.as_deref() {
            info!(
                address = %short_address(address),
                chain_id = ?snapshot.chain_id,
                balance_wei = ?snapshot.balance,
                "Connected; press Ctrl+C to disconnect"
            );
        }
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
        app.disconnect();
    }

    Ok(())
}
