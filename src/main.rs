use swgbuddy_client::app;

#[tokio::main]
async fn main() {
    if let Err(err) = app::start().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
