//! Smart merge (spec §4.4): a scraped record updates a stored `Vehicle`
//! only where the incoming value is non-empty and valid, and never touches
//! manually-edited fields beyond the ones the spec explicitly refreshes.

use crate::models::Vehicle;

/// A freshly-scraped or bulk-imported record, prior to merge against
/// whatever row (if any) already exists for the VIN.
#[derive(Debug, Clone, Default)]
pub struct ScrapedVehicle {
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    pub vehicle_type: Option<String>,
    pub price: i64,
    pub odometer: i64,
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    pub images: Vec<String>,
    pub carfax_url: Option<String>,
    pub dealer_vdp_url: Option<String>,
}

pub fn valid_vin(vin: &str) -> bool {
    vin.len() == 17
}

/// Build the `Vehicle` row to persist: `existing` is `None` for a brand-new
/// VIN, `Some` for a reconciling update. Manually edited fields never take
/// the scraped headline/description/subheadline; price, odometer, images
/// and VDP links always refresh from a valid incoming value.
pub fn merge(existing: Option<&Vehicle>, incoming: &ScrapedVehicle, now: &str) -> Vehicle {
    let base = existing.cloned().unwrap_or_else(|| Vehicle {
        id: 0,
        dealership_id: 0,
        year: incoming.year,
        make: String::new(),
        model: String::new(),
        trim: None,
        vehicle_type: None,
        price: 0,
        odometer: 0,
        vin: incoming.vin.clone(),
        stock_number: None,
        images: Vec::new(),
        local_images: Vec::new(),
        carfax_url: None,
        dealer_vdp_url: None,
        last_scraped_at: None,
        marketplace_posted_at: None,
        social_templates: None,
        manual_headline: None,
        manual_subheadline: None,
        manual_description: None,
        is_manually_edited: false,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    });

    let mut merged = base;
    merged.last_scraped_at = Some(now.to_string());
    merged.updated_at = now.to_string();

    if incoming.year > 0 {
        merged.year = incoming.year;
    }
    if !incoming.make.is_empty() {
        merged.make = incoming.make.clone();
    }
    if !incoming.model.is_empty() {
        merged.model = incoming.model.clone();
    }
    if incoming.trim.is_some() {
        merged.trim = incoming.trim.clone();
    }
    if incoming.vehicle_type.is_some() {
        merged.vehicle_type = incoming.vehicle_type.clone();
    }
    if incoming.price > 0 {
        merged.price = incoming.price;
    }
    if incoming.odometer > 0 {
        merged.odometer = incoming.odometer;
    }
    if let Some(vin) = &incoming.vin
        && valid_vin(vin)
    {
        merged.vin = Some(vin.clone());
    }
    if incoming.stock_number.is_some() {
        merged.stock_number = incoming.stock_number.clone();
    }
    if !incoming.images.is_empty() {
        merged.images = incoming.images.clone();
    }
    if incoming.carfax_url.is_some() {
        merged.carfax_url = incoming.carfax_url.clone();
    }
    if incoming.dealer_vdp_url.is_some() {
        merged.dealer_vdp_url = incoming.dealer_vdp_url.clone();
    }

    // Headline/subheadline/description only ever come from the manual-edit
    // endpoint; a scrape never sets them, manually edited or not.
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_existing() -> Vehicle {
        Vehicle {
            id: 1,
            dealership_id: 1,
            year: 2020,
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            trim: Some("SE".to_string()),
            vehicle_type: None,
            price: 20000,
            odometer: 30000,
            vin: Some("1HGCM82633A004352".to_string()),
            stock_number: Some("A1".to_string()),
            images: vec!["https://ext/a.jpg".to_string()],
            local_images: vec!["https://blob/1/1/0.jpg".to_string()],
            carfax_url: None,
            dealer_vdp_url: None,
            last_scraped_at: None,
            marketplace_posted_at: None,
            social_templates: None,
            manual_headline: Some("Great deal".to_string()),
            manual_subheadline: None,
            manual_description: Some("Hand written".to_string()),
            is_manually_edited: true,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn refreshes_price_and_odometer_even_when_manually_edited() {
        let existing = sample_existing();
        let incoming = ScrapedVehicle {
            year: 2020,
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            price: 19500,
            odometer: 31000,
            vin: Some("1HGCM82633A004352".to_string()),
            images: vec!["https://ext/b.jpg".to_string()],
            ..Default::default()
        };
        let merged = merge(Some(&existing), &incoming, "2024-02-01T00:00:00Z");
        assert_eq!(merged.price, 19500);
        assert_eq!(merged.odometer, 31000);
        assert_eq!(merged.images, vec!["https://ext/b.jpg".to_string()]);
        assert_eq!(merged.manual_headline.as_deref(), Some("Great deal"));
        assert_eq!(merged.manual_description.as_deref(), Some("Hand written"));
        assert!(merged.is_manually_edited);
    }

    #[test]
    fn ignores_zero_price_and_invalid_vin() {
        let existing = sample_existing();
        let incoming = ScrapedVehicle {
            year: 0,
            make: String::new(),
            model: String::new(),
            price: 0,
            odometer: 0,
            vin: Some("short".to_string()),
            ..Default::default()
        };
        let merged = merge(Some(&existing), &incoming, "2024-02-01T00:00:00Z");
        assert_eq!(merged.price, 20000);
        assert_eq!(merged.year, 2020);
        assert_eq!(merged.vin.as_deref(), Some("1HGCM82633A004352"));
    }

    #[test]
    fn builds_new_row_when_no_existing() {
        let incoming = ScrapedVehicle {
            year: 2023,
            make: "Ford".to_string(),
            model: "Escape".to_string(),
            price: 28000,
            odometer: 1200,
            vin: Some("1FMCU9GD6NUA12345".to_string()),
            ..Default::default()
        };
        let merged = merge(None, &incoming, "2024-02-01T00:00:00Z");
        assert_eq!(merged.make, "Ford");
        assert!(!merged.is_manually_edited);
        assert_eq!(merged.created_at, "2024-02-01T00:00:00Z");
    }
}
