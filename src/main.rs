use anyhow::Result;
use conductor::cli::App;

#[tokio::main]
async fn main() -> Result<()> {
    App::from_env().await
}
