//! Extension rules example.
//!
//! Registers the built-in numeric range and string pattern rules plus an
//! ad-hoc closure rule on a controller, then validates data with it.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p concordia-demos --example custom_extension
//! ```

use concordia_core::{
    BasicController, Concordia, FnExtension, NumberBounds, SchemaType, StringPattern,
};
use serde_json::{Value, json};

fn main() {
    let mut controller = BasicController::new();
    controller.register(SchemaType::Number, NumberBounds);
    controller.register(SchemaType::String, StringPattern::new());
    controller.register(
        SchemaType::Array,
        FnExtension::new("unique-items")
            .on_schema(|raw| match raw.get("unique") {
                None | Some(Value::Bool(_)) => Ok(()),
                Some(_) => Err("\"unique\" must be a boolean".into()),
            })
            .on_data(|node, value| {
                if node.others.get("unique") != Some(&Value::Bool(true)) {
                    return Ok(());
                }
                let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                for (i, item) in items.iter().enumerate() {
                    if items[..i].contains(item) {
                        return Err(format!("item {i} repeats an earlier item").into());
                    }
                }
                Ok(())
            }),
    );

    let bad_bounds = Concordia::builder()
        .controller(controller.clone())
        .build_value(json!({
            "type": "object",
            "schema": [{ "name": "age", "type": "number", "min": 10, "max": 1 }]
        }));
    if let Err(e) = bad_bounds {
        println!("Schema rejected: {e}");
    }

    let concordia = match Concordia::builder().controller(controller).build_value(json!({
        "type": "object",
        "schema": [
            { "name": "user", "type": "string", "pattern": "^[a-z][a-z0-9_]{2,15}$" },
            { "name": "age", "type": "number", "min": 0, "max": 150 },
            { "name": "tags", "type": "array", "unique": true, "schema": { "type": "string" } }
        ]
    })) {
        Ok(concordia) => concordia,
        Err(e) => {
            eprintln!("Schema rejected: {e}");
            std::process::exit(1);
        }
    };

    let samples = [
        json!({ "user": "ada_l", "age": 36, "tags": ["math", "engines"] }),
        json!({ "user": "Ada", "age": 36, "tags": [] }),
        json!({ "user": "ada_l", "age": 200, "tags": [] }),
        json!({ "user": "ada_l", "age": 36, "tags": ["math", "math"] }),
    ];
    for sample in &samples {
        match concordia.validate_value(sample) {
            Ok(()) => println!("accepted {sample}"),
            Err(e) => println!("rejected {sample}: {e}"),
        }
    }
}
