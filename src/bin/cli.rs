use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    unidb::logging::init_tracing();
    unidb::cli::run().await
}
