//! Payload validation example.
//!
//! Builds a schema for an order document, validates a few payloads against
//! it, and prints where each rejected payload went wrong.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p concordia-demos --example validate_payload
//! ```

use concordia_core::{Concordia, Node};

const ORDER_SCHEMA: &str = r#"{
    "type": "object",
    "doc": "A customer order.",
    "schema": [
        { "name": "id", "type": "string", "doc": "Order number." },
        { "name": "paid", "type": "boolean" },
        { "name": "note", "type": "string", "optional": true },
        { "name": "lines", "type": "array", "schema": {
            "type": "object",
            "schema": [
                { "name": "sku", "type": "string" },
                { "name": "qty", "type": "number" }
            ]
        }},
        { "name": "geo", "type": "array", "optional": true, "schema": [
            { "type": "number", "doc": "Latitude." },
            { "type": "number", "doc": "Longitude." }
        ]}
    ]
}"#;

fn main() {
    let concordia = match Concordia::new(ORDER_SCHEMA) {
        Ok(concordia) => concordia,
        Err(e) => {
            eprintln!("Schema rejected: {e}");
            std::process::exit(1);
        }
    };

    println!("Order schema fields:");
    for node in concordia.schema().children() {
        let marker = if node.is_optional() { "optional" } else { "required" };
        println!(
            "  {:<6} {:<8} {marker:<9} {}",
            node.name().unwrap_or("-"),
            node.schema_type(),
            node.doc().unwrap_or("")
        );
        if let Node::Schema(schema) = node {
            for child in schema.children() {
                println!("    {:<6} {}", child.name().unwrap_or("[]"), child.schema_type());
            }
        }
    }
    println!();

    let payloads = [
        r#"{ "id": "A-1", "paid": true, "lines": [{ "sku": "tea", "qty": 2 }] }"#,
        r#"{ "id": "A-2", "paid": false, "lines": [], "note": null, "geo": [59.9, 10.7] }"#,
        r#"{ "id": "A-3", "lines": [] }"#,
        r#"{ "id": "A-4", "paid": true, "lines": [{ "sku": "tea", "qty": "2" }] }"#,
        r#"{ "id": "A-5", "paid": true, "lines": [], "geo": [59.9] }"#,
        r#"{ "id": "A-6", "paid": "#,
    ];

    for payload in payloads {
        match concordia.validate_str(payload) {
            Ok(value) => println!("accepted {}", value["id"]),
            Err(e) => println!("rejected: {e}"),
        }
    }

    println!();
    println!("Schema round trip:");
    match concordia.to_value() {
        Ok(document) => match serde_json::to_string_pretty(&document) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("  could not print schema: {e}"),
        },
        Err(e) => eprintln!("  could not serialize schema: {e}"),
    }
}
