#[rocket::main]
async fn main() {
    env_logger::init();
    if let Err(e) = dealerops_core::rocket().launch().await {
        log::error!(target: "dealerops::main", "server error: {e}");
        std::process::exit(1);
    }
}
