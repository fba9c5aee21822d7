use roomsync_server::{Relay, RelayConfig, RelayError};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    tracing_subscriber::fmt::init();

    let config = RelayConfig::from_env();
    let relay = Relay::bind(&config).await?;
    let addr = relay.local_addr()?;
    tracing::info!(%addr, code_len = config.room_code_len, "roomsync relay listening");

    tokio::select! {
        () = relay.run() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!(error = %e, "ctrl-c handler failed");
            }
            tracing::info!("roomsync relay shutting down");
        }
    }
    Ok(())
}
