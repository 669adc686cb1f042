//! Primary entrypoint for the `tfmod` CLI binary.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tfmod_cli::run().await
}
