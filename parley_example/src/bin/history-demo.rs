use anyhow::Result;
use parley::prelude::*;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}

fn load_config() -> ProviderConfig {
    match ProviderConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "no provider configuration found, using the in-memory engine");
            ProviderConfig::new("memory://", "memory")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    println!("🗄️  Parley History Demo\n");

    let config = load_config();
    println!("📡 Connecting to {} backend...", config.backend_kind);
    let history = History::connect(&config).await?;
    println!("✅ Connected\n");

    // 1. Start a conversation
    println!("1️⃣  Creating conversation...");
    let conversation = history
        .create_conversation("Weekend trip", Some(json!({"model": "gpt-4o-mini", "temperature": 0.2})))
        .await?;
    println!("   ✅ {} ({})\n", conversation.title, conversation.conv_id);

    // 2. Save a few turns
    println!("2️⃣  Saving turns...");
    let turns = [
        Message::system("You are a helpful travel assistant."),
        Message::human("Where should I go for a weekend in October?"),
        Message::ai("Lisbon is mild in October and easy to walk."),
        Message::human("What should I pack?"),
    ];
    for turn in &turns {
        history.save_message(turn, &conversation.conv_id).await?;
    }
    println!("   ✅ Saved {} turns\n", turns.len());

    // 3. Replay them
    println!("3️⃣  Replaying history...");
    for turn in history.get_history(&conversation.conv_id, 0).await? {
        println!("   {:>9}: {}", turn.role(), turn.text());
    }
    println!();

    // 4. An unknown id yields an empty history
    println!("4️⃣  Reading an unknown conversation...");
    let fresh = history.get_history("demo-fresh-conversation", 10).await?;
    println!("   ✅ {} turns, conversation created on first read\n", fresh.len());

    // 5. Archive and pin
    println!("5️⃣  Archiving and pinning...");
    history.archive_conversation(&conversation.conv_id).await?;
    history.pin_conversation(&conversation.conv_id).await?;
    let fetched = history.get_conversation(&conversation.conv_id).await?;
    println!("   archived={} pinned={}\n", fetched.is_archived, fetched.is_pinned);

    // 6. List by recent activity
    println!("6️⃣  Listing conversations...");
    for conversation in history.list_conversations(0, 10).await? {
        println!(
            "   - {} \"{}\" updated_at={}",
            conversation.conv_id, conversation.title, conversation.updated_at
        );
    }
    println!();

    // 7. Clean up
    println!("7️⃣  Deleting conversations...");
    history.delete_conversation(&conversation.conv_id).await?;
    history.delete_conversation("demo-fresh-conversation").await?;
    match history.get_conversation(&conversation.conv_id).await {
        Err(err) if err.is_not_found() => println!("   ✅ Gone\n"),
        other => println!("   ⚠️  Unexpected: {:?}\n", other),
    }

    history.close().await?;
    println!("🎉 Done");
    Ok(())
}
