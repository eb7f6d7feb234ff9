//! Order pipeline example: a producer and a consumer share one topic gate.
//!
//! Run with:
//!   cargo run --example order-pipeline

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use serde_json::{json, Value};
use topicguard::schema::{MissingSchemaPolicy, SchemaError, SchemaRegistry, TopicGate};

const SCHEMAS: &[&str] = &[
    r#"{ "id": "customers", "spec": { "id": "int", "name": "string" } }"#,
    r#"{
        "id": "orders/default",
        "spec": {
            "id": "int",
            "status": { "$one-of": ["new", "paid", "shipped"] },
            "customer": { "$ref": "customers" },
            "items": [{ "sku": "string", "qty": "int" }]
        }
    }"#,
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(SchemaRegistry::from_embedded(SCHEMAS)?);
    let gate = TopicGate::with_policy(Arc::clone(&registry), MissingSchemaPolicy::Strict);

    let (tx, rx) = mpsc::channel::<(String, Vec<u8>)>();

    let consumer_gate = gate.clone();
    let consumer = thread::spawn(move || {
        for (topic, payload) in rx {
            match consumer_gate.check_payload(&topic, &payload) {
                Ok(message) => eprintln!("[consumer] {topic}: accepted order {}", message["id"]),
                Err(err) => eprintln!("[consumer] {topic}: dropped: {err}"),
            }
        }
    });

    let outgoing: Vec<(&str, Value)> = vec![
        (
            "orders",
            json!({
                "id": 1,
                "status": "paid",
                "customer": {"id": 7, "name": "Ada"},
                "items": [{"sku": "A-1", "qty": 2}]
            }),
        ),
        (
            "orders",
            json!({
                "id": 2,
                "status": "lost",
                "customer": {"id": "seven"},
                "items": [{"sku": "A-1", "qty": "two"}]
            }),
        ),
        ("payments", json!({"amount": 10})),
    ];

    for (topic, message) in outgoing {
        match gate.check(topic, &message) {
            Ok(()) => {
                tx.send((topic.to_string(), serde_json::to_vec(&message)?))?;
                eprintln!("[producer] {topic}: sent");
            }
            Err(SchemaError::Rejected { errors, .. }) => {
                eprintln!("[producer] {topic}: not sent");
                for err in errors {
                    eprintln!("    {err}");
                }
            }
            Err(err) => eprintln!("[producer] {topic}: not sent: {err}"),
        }
    }

    // A payload that skipped the producer-side check still hits the consumer gate.
    tx.send(("orders".to_string(), br#"{"id": 3}"#.to_vec()))?;
    drop(tx);

    consumer
        .join()
        .map_err(|_| std::io::Error::other("consumer thread panicked"))?;
    Ok(())
}
