use anyhow::Result;
use tracing::info;

#[async_trait::async_trait]
pub trait PeripheralControl: Send + Sync {
    async fn restart_peripheral(&self) -> Result<()>;
    async fn restart_bridge(&self) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPeripheral;

#[async_trait::async_trait]
impl PeripheralControl for LoggingPeripheral {
    async fn restart_peripheral(&self) -> Result<()> {
        info!("Peripheral restart requested");
        Ok(())
    }

    async fn restart_bridge(&self) -> Result<()> {
        info!("Bridge restart requested");
        Ok(())
    }
}
