#[tokio::main]
async fn main() {
    tienda::start_server().await;
}
