// Sessions are single-threaded: everything runs on one cooperative runtime thread.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if tebesa_client::run().await.is_err() {
        std::process::exit(1);
    }
}
