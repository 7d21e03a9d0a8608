use env_logger::Env;
use log::error;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(err) = kr_daily_collector::app::bootstrap::run().await {
        if err.is_fatal() {
            error!("aborting run: {err}");
        } else {
            error!("collection failed: {err}");
        }
        std::process::exit(1);
    }
}
