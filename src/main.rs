#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feedhub::run().await
}
