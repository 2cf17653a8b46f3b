#[tokio::main]
async fn main() {
    exchange::start(std::env::args()).await;
}
