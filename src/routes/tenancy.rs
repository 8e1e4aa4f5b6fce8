//! Tenant resolution (spec §2, §6): maps a subdomain or dealership id to the
//! public `DealershipDescriptor` the frontend needs before any auth exists.

use crate::db::Store;
use crate::models::DealershipDescriptor;
use crate::store;
use rocket::get;
use rocket::serde::json::Json;
use rocket::State;
use std::sync::Arc;

#[get("/tenancy/resolve?<subdomain>&<dealership_id>")]
pub fn resolve(
    subdomain: Option<String>,
    dealership_id: Option<i64>,
    store: &State<Arc<Store>>,
) -> Json<serde_json::Value> {
    let dealership = if let Some(sub) = subdomain {
        store::dealerships::find_by_subdomain(store, &sub)
    } else if let Some(id) = dealership_id {
        store::dealerships::get(store, id).ok()
    } else {
        None
    };

    match dealership {
        Some(d) => Json(serde_json::json!({
            "dealership": DealershipDescriptor {
                id: d.id,
                slug: d.slug,
                display_name: d.display_name,
            }
        })),
        None => Json(serde_json::json!({"dealership": null})),
    }
}
