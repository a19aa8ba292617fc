use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    findcode_cli::main_entry().await
}
