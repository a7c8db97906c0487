#[tokio::main]
async fn main() {
    matchpoint_backend::run().await;
}
