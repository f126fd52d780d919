pub mod generate;
pub mod init;
pub mod validate;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
