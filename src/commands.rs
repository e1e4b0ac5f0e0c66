//! CLI entry points. Each prints to stdout; logs go to stderr.

use anyhow::Result;

use crate::library::{plain_locator, Library};

pub fn run_roots(library: &Library) -> Result<()> {
    for root in library.root_strings() {
        println!("{}", root);
    }
    Ok(())
}

pub fn run_scan(library: &Library, json: bool) -> Result<()> {
    let summary = library.summary(plain_locator);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.characters.0.is_empty() {
        println!("No characters found.");
    } else {
        println!("{:<32} {:>6} {:>7}  AVATAR", "CHARACTER", "CHATS", "IMAGES");
        for c in &summary.characters.0 {
            println!(
                "{:<32} {:>6} {:>7}  {}",
                c.name,
                c.chat_count,
                c.image_count,
                c.avatar.as_deref().unwrap_or("-")
            );
        }
    }
    println!();
    println!(
        "{} characters, {} images across {} roots",
        summary.characters.0.len(),
        summary.image_count,
        summary.roots.len()
    );
    Ok(())
}

pub fn run_chat(library: &Library, character: &str, file: &str, json: bool) -> Result<()> {
    let view = library.get_chat(Some(character), Some(file), plain_locator)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("--- {} / {} ({} messages) ---", view.character, view.name, view.messages.len());
    for message in &view.messages {
        println!();
        let mut header = format!("[{}]", message.speaker);
        if !message.timestamp.is_empty() {
            header.push_str(&format!(" {}", message.timestamp));
        }
        if message.swipe_count > 1 {
            let selected = message.selected_swipe.map(|s| s + 1).unwrap_or(1);
            header.push_str(&format!(" (swipe {}/{})", selected, message.swipe_count));
        }
        println!("{}", header);
        if let Some(title) = &message.title {
            println!("title: {}", title);
        }
        if let Some(image) = &message.image {
            println!("image: {}", image);
        }
        println!("{}", message.body);
    }
    Ok(())
}

pub fn run_images(library: &Library, character: Option<&str>, json: bool) -> Result<()> {
    let images = library.gallery_views(character, plain_locator);
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "images": images }))?);
        return Ok(());
    }

    if images.is_empty() {
        println!("No images.");
        return Ok(());
    }
    for image in &images {
        let dir = if image.dir.is_empty() { "." } else { image.dir.as_str() };
        println!("{:<24} {}", dir, image.url);
    }
    Ok(())
}
