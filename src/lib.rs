pub mod adapters;
pub mod auth;
pub mod config;
pub mod conversation;
pub mod db;
pub mod errors;
pub mod inventory;
pub mod models;
pub mod posting;
pub mod rate_limit;
pub mod realtime;
pub mod retention;
pub mod routes;
pub mod store;
pub mod webhook_sig;

use adapters::ai::AiAdapter;
use adapters::blob::BlobAdapter;
use adapters::browser_automation::BrowserAutomationAdapter;
use adapters::crm::CrmAdapter;
use adapters::email::EmailAdapter;
use adapters::provider::{Provider, ProviderA, ProviderB, ProviderC, ProviderD};
use config::Config;
use db::Store;
use inventory::provider_chain::ProviderChain;
use rate_limit::{RateLimitConfig, RateLimiter};
use realtime::WsHub;
use rocket_cors::CorsOptions;
use std::sync::Arc;

/// Builds the configured Rocket instance, managing every C1-C7 piece as
/// state and spawning the background drainers on liftoff (spec §9).
pub fn rocket() -> rocket::Rocket<rocket::Build> {
    let config = Config::from_env();
    build_rocket(config)
}

/// Builds a Rocket instance from a caller-supplied config, bypassing the
/// environment. Used by the integration test suite to point at an isolated
/// per-test database.
pub fn rocket_with_config(config: Config) -> rocket::Rocket<rocket::Build> {
    build_rocket(config)
}

fn build_rocket(config: Config) -> rocket::Rocket<rocket::Build> {
    let store = Arc::new(Store::new(&config.database_url));
    let hub = Arc::new(WsHub::new());
    let rate_limiter = RateLimiter::new();
    let rate_limit_config = RateLimitConfig::from_env();
    let chain = ProviderChain::from_config(&config);

    let crm = CrmAdapter::new(config.crm_base_url.clone(), config.crm_api_key.clone());
    let ai = AiAdapter::new(config.ai_base_url.clone(), config.ai_api_key.clone());
    let email = EmailAdapter::new(
        config.email_base_url.clone(),
        config.email_api_key.clone(),
        config.email_from_address.clone(),
    );
    let blob = Arc::new(BlobAdapter::new(config.blob_base_url.clone(), config.blob_bucket.clone()));
    let browser = Arc::new(BrowserAutomationAdapter::new(
        config.browser_automation_base_url.clone(),
        config.browser_automation_api_key.clone(),
    ));

    let cors = CorsOptions::default().to_cors().expect("failed to build CORS");

    let provider_a_url = config.provider_a_base_url.clone();
    let provider_b_url = config.provider_b_base_url.clone();
    let provider_c_endpoint = config.provider_c_endpoint.clone();
    let provider_d_endpoint = config.provider_d_endpoint.clone();
    let scrape_hour_local = config.scrape_hour_local;
    let retention_db_path = config.database_url.clone();

    let scheduler_store = store.clone();
    let scheduler_hub = hub.clone();
    let scheduler_blob = blob.clone();
    let recovery_store = store.clone();
    let posting_store = store.clone();
    let posting_hub = hub.clone();
    let posting_browser = browser.clone();

    rocket::build()
        .manage(store)
        .manage(config)
        .manage(hub)
        .manage(rate_limiter)
        .manage(rate_limit_config)
        .manage(chain)
        .manage(crm)
        .manage(ai)
        .manage(email)
        .manage(blob)
        .manage(browser)
        .attach(cors)
        .register(
            "/",
            rocket::catchers![
                routes::system::bad_request,
                routes::system::unauthorized,
                routes::system::forbidden,
                routes::system::not_found,
                routes::system::conflict,
                routes::system::too_many_requests,
                routes::system::internal_error,
            ],
        )
        .mount(
            "/",
            rocket::routes![
                routes::system::health,
                routes::system::metrics,
                routes::tenancy::resolve,
                routes::auth::login,
                routes::auth::me,
                routes::auth::logout,
                routes::auth::forgot_password,
                routes::auth::check_reset_token,
                routes::auth::reset_password,
                routes::auth::impersonate,
                routes::auth::end_impersonation,
                routes::vehicles::list,
                routes::vehicles::get,
                routes::vehicles::create,
                routes::vehicles::update,
                routes::vehicles::delete,
                routes::vehicles::force_rescrape,
                routes::vehicles::generate_description,
                routes::import::bulk_import,
                routes::import::list,
                routes::import::delete_by_id,
                routes::import::delete_by_vin,
                routes::import::sync,
                routes::conversations::all_conversations,
                routes::conversations::messenger_conversations,
                routes::conversations::send_message,
                routes::conversations::messenger_reply,
                routes::conversations::toggle_ai,
                routes::conversations::update_metadata,
                routes::webhooks::trigger_scrape,
                routes::webhooks::ghl_webhook,
                routes::webhooks::ghl_call_webhook,
                routes::webhooks::pbs_webhook,
                routes::posting::inventory,
                routes::posting::posting_token,
                routes::posting::report_posting,
                routes::posting::auto_post,
                routes::posting::extension_limits,
                routes::realtime::connect,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Stuck Posting Recovery", move |_rocket| {
            Box::pin(async move {
                let n = store::posting::interrupt_stuck_items(&recovery_store);
                if n > 0 {
                    log::warn!(target: "dealerops::posting", "requeued {n} stuck posting items from a prior crash");
                }
            })
        }))
        .attach(rocket::fairing::AdHoc::on_liftoff("Inventory Scheduler", move |_rocket| {
            Box::pin(async move {
                let dealerships = store::dealerships::list_all(&scheduler_store);
                let configs = dealerships
                    .into_iter()
                    .filter(|d| d.is_active)
                    .map(|d| inventory::scheduler::DealershipScrapeConfig {
                        dealership_id: d.id,
                        sources: Vec::new(),
                        hour_local: scrape_hour_local,
                    })
                    .collect();
                inventory::scheduler::spawn(
                    scheduler_store,
                    scheduler_hub,
                    scheduler_blob,
                    move || -> Vec<Box<dyn Provider>> {
                        vec![
                            Box::new(ProviderA::new(provider_a_url.clone())),
                            Box::new(ProviderB::new(provider_b_url.clone())),
                            Box::new(ProviderC::new(provider_c_endpoint.clone())),
                            Box::new(ProviderD::new(provider_d_endpoint.clone())),
                        ]
                    },
                    configs,
                );
                log::info!(target: "dealerops::inventory", "scheduler started");
            })
        }))
        .attach(rocket::fairing::AdHoc::on_liftoff("Posting Scheduler", move |_rocket| {
            Box::pin(async move {
                posting::scheduler::spawn(
                    posting_store,
                    posting_hub,
                    posting_browser,
                    |_item| None,
                    |store, dealership_id, vehicle_id| {
                        let vehicle = store::vehicles::get(store, dealership_id, vehicle_id).ok()?;
                        let description = vehicle
                            .manual_description
                            .clone()
                            .unwrap_or_else(|| format!("{} {} {}", vehicle.year, vehicle.make, vehicle.model));
                        let images = if vehicle.local_images.is_empty() { vehicle.images.clone() } else { vehicle.local_images.clone() };
                        let json = serde_json::to_value(&vehicle).unwrap_or(serde_json::Value::Null);
                        Some((json, images, description))
                    },
                );
                log::info!(target: "dealerops::posting", "scheduler started");
            })
        }))
        .attach(rocket::fairing::AdHoc::on_liftoff("Maintenance Sweep", move |_rocket| {
            Box::pin(async move {
                retention::spawn_maintenance_task(retention_db_path);
                log::info!(target: "dealerops::retention", "maintenance task started");
            })
        }))
}
