//! # Accounts Demo
//!
//! Walks through the main RecordHaus features on an accounts table with tags:
//! - Declaring fields with configured defaults
//! - Writing a record group in one transaction
//! - Listening to change signals
//! - Reading groups back with both read paths
//! - Routing wire requests through the coordinator
//!
//! Uses an in-memory SQLite database unless `RECORDHAUS_CONFIG` points to a
//! configuration file; in that case the tables are expected to exist.

use recordhaus::prelude::*;
use serde_json::json;
use std::sync::Arc;

const ACCOUNTS_DDL: &str =
    "CREATE TABLE accounts (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, active BOOL NOT NULL)";
const TAGS_DDL: &str = "CREATE TABLE accounts_tags (\
    id INTEGER PRIMARY KEY AUTOINCREMENT, \
    account_id INTEGER NOT NULL, \
    tag TEXT NOT NULL, \
    UNIQUE (account_id, tag))";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("RecordHaus Accounts Demo");
    println!("========================");

    // 1. Configuration
    let (config, in_memory) = match std::env::var("RECORDHAUS_CONFIG") {
        Ok(_) => (AppConfig::load()?, false),
        Err(_) => (
            AppConfig {
                database: DatabaseConfig::new("sqlite::memory:".to_string(), 5, 30),
                fields: FieldDefaults::default(),
            },
            true,
        ),
    };

    let mut haus = RecordHaus::connect(&config.database).await?;
    if in_memory {
        haus.connection().execute(ACCOUNTS_DDL).await?;
        haus.connection().execute(TAGS_DDL).await?;
    }
    haus.health_check().await?;
    println!("Connected to {}", config.database.url);

    // 2. Schemas
    let factory = FieldFactory::new(&config.fields)?;
    let accounts = RecordSchema::builder("accounts")
        .field(factory.string("name").length(1, 45).pattern("^[A-Za-z ]+$"))
        .field(factory.boolean("active"))
        .build()?;
    let tags = RecordSchema::builder("accounts_tags")
        .field(factory.numeric("account_id"))
        .field(
            factory
                .string("tag")
                .custom_check(|v| v.as_str().is_some_and(|t| t != "banned")),
        )
        .build()?;
    let group_schema = GroupSchema::builder(accounts)
        .category("tags", tags, "account_id")
        .build()?;

    // 3. Signals
    haus.signals().add_callback(|event| {
        println!("  signal: {} (id {:?})", event.name(), event.record_id);
    });

    // 4. Transactional group write
    println!("\nWriting a group");
    let signals = Arc::clone(haus.signals());
    let mut alice = RecordGroup::new(Arc::clone(&group_schema));
    alice.fill_input_data(
        &json!({
            "main": {"name": "Alice", "active": true},
            "tags": [{"tag": "vip"}, {"tag": "early"}]
        }),
        false,
    )?;
    alice.update(haus.connection(), Some(signals.as_ref())).await?;
    println!("  stored: {}", alice.to_json());

    // 5. A rejected value never reaches the database
    println!("\nRejected input");
    let mut bad = alice.new_sub_record("tags")?;
    match bad.set_field("tag", "banned") {
        Ok(()) => println!("  unexpectedly accepted"),
        Err(e) => println!("  rejected: {}", e),
    }

    // 6. Reading back
    println!("\nReading groups");
    let query = QueryBuilder::new().filter(QueryFilter::eq("accounts_tags.tag", "vip"));
    for group in RecordGroup::find(&group_schema, haus.connection(), &query).await? {
        println!("  find: {}", group.to_json());
    }
    let selector = RecordGroupSelector::from_defaults(Arc::clone(&group_schema), &config.fields);
    for group in selector.select(haus.connection(), "").await? {
        println!("  joined: {}", group.to_json());
    }

    // 7. Coordinator
    println!("\nCoordinator requests");
    haus.register_group("accounts", group_schema)?;
    let body = json!({
        "timestamp": chrono::Utc::now().timestamp(),
        "info": {"group": "accounts", "action": "add"},
        "data": {"main": {"name": "Bob", "active": false}}
    });
    println!("  add: {}", haus.handle_json(&body.to_string()).await.to_json());

    let select = Request::new("accounts", Action::Select).with_params(json!({"active": false}));
    println!("  select: {}", haus.handle(&select).await.to_json());

    let unknown = Request::new("invoices", Action::Select);
    println!("  unknown group: {}", haus.handle(&unknown).await.to_json());

    println!("\nDone");
    Ok(())
}
