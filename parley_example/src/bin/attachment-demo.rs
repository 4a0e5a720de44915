use anyhow::Result;
use parley::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("📎 Parley Attachment Demo\n");

    let config = ProviderConfig::load()
        .unwrap_or_else(|_| ProviderConfig::new("memory://", "memory"))
        .with_debug(true)
        .with_log_level("debug");
    let provider = create_provider(&config).await?;
    println!("✅ Connected ({:?} backend)\n", provider.backend());

    let messages = provider.messages();
    let attachments = provider.attachments();
    let links = provider.message_attachments();

    // 1. A message to attach files to
    let conversation = provider.conversations().first_or_create("attachment-demo").await?;
    let message = messages
        .create(DBMessage::new(&conversation.conv_id, Role::User, "Here are the trip documents"))
        .await?;
    println!("1️⃣  Message {} (order_seq {})\n", message.msg_id, message.order_seq);

    // 2. Two attachments, linked to the message
    println!("2️⃣  Creating attachments...");
    let files = [
        Attachment {
            attachment_type: "image".into(),
            file_name: "boarding-pass.jpg".into(),
            file_size: 100 * 1024,
            storage_type: "path".into(),
            storage_path: "/images/boarding-pass.jpg".into(),
            mime_type: "image/jpeg".into(),
            ..Default::default()
        },
        Attachment {
            attachment_type: "file".into(),
            file_name: "itinerary.pdf".into(),
            file_size: 2 * 1024 * 1024,
            storage_type: "path".into(),
            storage_path: "/documents/itinerary.pdf".into(),
            mime_type: "application/pdf".into(),
            ..Default::default()
        },
    ];
    let mut saved = Vec::with_capacity(files.len());
    for file in files {
        let attachment = attachments.create(file).await?;
        let link = links
            .create(MessageAttachment::new(&message.msg_id, &attachment.attach_id))
            .await?;
        println!("   ✅ {} -> link #{}", attachment.file_name, link.id);
        saved.push(attachment);
    }
    println!();

    // 3. Read them back through the message
    println!("3️⃣  Attachments of the message:");
    for attachment in attachments.list_by_message(&message.msg_id).await? {
        println!(
            "   - {} [{}] {} bytes at {}",
            attachment.file_name, attachment.mime_type, attachment.file_size, attachment.storage_path
        );
    }
    println!();

    // 4. Unlink one, then drop the rest
    println!("4️⃣  Removing links...");
    let removed = links
        .delete_by_message_and_attachment(&message.msg_id, &saved[0].attach_id)
        .await?;
    println!("   unlinked {} association(s)", removed);
    println!("   {} attachment(s) still linked", attachments.list_by_message(&message.msg_id).await?.len());
    let removed = links.delete_by_message(&message.msg_id).await?;
    println!("   removed {} remaining association(s)\n", removed);

    // 5. Clean up
    for attachment in &saved {
        attachments.delete(&attachment.attach_id).await?;
    }
    provider.conversations().delete(&conversation.conv_id).await?;
    println!("5️⃣  Cleaned up");

    provider.close().await?;
    println!("\n🎉 Done");
    Ok(())
}
