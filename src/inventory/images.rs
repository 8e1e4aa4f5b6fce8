//! Image persistence during a scrape (spec §4.4): mirror each external
//! image to the blob service under a deterministic key, updating
//! `localImages`. A failed mirror downgrades that slot to the external
//! URL; a successful remote image is never dropped.

use crate::adapters::blob::BlobAdapter;
use crate::db::Store;
use crate::models::Vehicle;
use crate::store;

/// Mirror every image in `vehicle.images` to the blob service and persist
/// the resulting `localImages` list. Called once per vehicle per scrape.
pub async fn persist_for_vehicle(store: &Store, dealership_id: i64, vehicle: &Vehicle, blob: &BlobAdapter) {
    let mut local_images = Vec::with_capacity(vehicle.images.len());
    for (index, source_url) in vehicle.images.iter().enumerate() {
        let ext = extension_of(source_url);
        let key = BlobAdapter::key(dealership_id, vehicle.id, index, &ext);
        let result = blob.mirror(store, dealership_id, source_url, &key).await;
        match result.data {
            Some(hosted_url) => local_images.push(hosted_url),
            None => local_images.push(source_url.clone()),
        }
    }
    if local_images != vehicle.local_images {
        let now = chrono::Utc::now().to_rfc3339();
        store::vehicles::set_local_images(store, dealership_id, vehicle.id, &local_images, &now).ok();
    }
}

fn extension_of(url: &str) -> String {
    url.rsplit('.')
        .next()
        .filter(|ext| ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpg")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_extension_from_url() {
        assert_eq!(extension_of("https://ext/a/b.jpeg"), "jpeg");
        assert_eq!(extension_of("https://ext/a/b?x=1"), "jpg");
    }
}
