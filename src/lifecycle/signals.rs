//! OS signal handling.
//!
//! Process shutdown is not graceful: on interrupt the binary returns from
//! `main` and in-flight connections are dropped with the runtime.

/// Wait for Ctrl+C / SIGINT.
pub async fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, shutting down");
    Ok(())
}
