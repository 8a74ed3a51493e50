//! Schema store example.
//!
//! Writes a small directory of schema documents, records their checksums in
//! a manifest, and resolves references through the store.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p concordia-demos --example store_references
//! ```
//!
//! This example creates temporary schema files to demonstrate the API.

use concordia_core::Concordia;
use concordia_store::{Manifest, StoreConfig};
use serde_json::json;

const BASE_URL: &str = "https://schemas.example.com/";

fn main() {
    let dir = std::env::temp_dir().join("concordia_store_demo");
    let schemas = dir.join("schemas");
    std::fs::create_dir_all(&schemas).unwrap();

    let documents = [
        (
            "address.json",
            json!({
                "type": "object",
                "schema": [
                    { "name": "street", "type": "string" },
                    { "name": "city", "type": "string" },
                    { "name": "zip", "type": "string", "optional": true }
                ]
            }),
        ),
        (
            "audit.json",
            json!({
                "type": "object",
                "schema": [
                    { "name": "created_by", "type": "string" },
                    { "name": "created_at", "type": "number" }
                ]
            }),
        ),
    ];
    for (file, document) in &documents {
        let text = serde_json::to_string_pretty(document).unwrap();
        std::fs::write(schemas.join(file), text).unwrap();
    }

    // Record checksums, then open the store through a config that checks them
    let manifest_path = dir.join("manifest.json");
    let manifest = Manifest::scan(&schemas, BASE_URL).unwrap();
    manifest.save(&manifest_path).unwrap();
    println!("Manifest:");
    for (url, entry) in &manifest.documents {
        println!("  {url} -> {} ({})", entry.file, &entry.checksum[..12]);
    }

    let mut config = StoreConfig::new(BASE_URL);
    config.directories.push(schemas.clone());
    config.manifest = Some(manifest_path);
    let store = config.open().unwrap();
    println!("Opened store with {} documents", store.len());
    println!();

    let concordia = Concordia::builder()
        .fetcher(store)
        .build_value(json!({
            "type": "object",
            "doc": "A shipment.",
            "schema": [
                { "name": "to", "$ref": format!("{BASE_URL}address.json") },
                { "name": "from", "$ref": format!("{BASE_URL}address.json"), "optional": true },
                { "$ref": format!("{BASE_URL}audit.json") }
            ]
        }))
        .unwrap();
    println!("Shipment fields: {:?}", concordia.schema().field_names());

    let shipments = [
        json!({
            "to": { "street": "1 Loop", "city": "Oslo" },
            "created_by": "ops",
            "created_at": 1_700_000_000
        }),
        json!({
            "to": { "street": "1 Loop" },
            "created_by": "ops",
            "created_at": 1_700_000_000
        }),
        json!({ "to": { "street": "1 Loop", "city": "Oslo" }, "created_by": "ops" }),
    ];
    for shipment in &shipments {
        match concordia.validate_value(shipment) {
            Ok(()) => println!("accepted"),
            Err(e) => println!("rejected: {e}"),
        }
    }

    // Tampering shows up on the next open
    std::fs::write(schemas.join("audit.json"), r#"{ "type": "object", "schema": [] }"#).unwrap();
    if let Err(e) = config.open() {
        println!();
        println!("After editing audit.json: {e}");
    }

    std::fs::remove_dir_all(&dir).ok();
}
