//! Basic example: read an artist lazily and page through its releases.
//!
//! This example shows how to:
//! - Create a client with a user-agent
//! - Read fields, with the first miss fetching and later reads cached
//! - Walk a paginated listing one page at a time
//! - Run a database search
//!
//! Run with: `cargo run --example basic_call`

use spindle::{Client, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("spindle=debug,basic_call=info")
        .init();

    let client = Client::new("spindle-basic-call/0.1 +https://example.org")?;

    println!("=== Lazy Object Example ===");
    let mut artist = client.artist(1);
    println!("Artist ID: {:?}", artist.id());
    println!("Name: {:?}", artist.get("name").await?.as_str());
    println!("Real name: {:?}", artist.get("real_name").await?.as_str());
    println!("Complete: {}", artist.is_complete());
    println!();

    println!("=== Pagination Example ===");
    if let Some(mut releases) = artist.get("releases").await?.into_list() {
        releases.set_per_page(5);
        println!("Releases: {}", releases.len().await?);
        println!("Pages: {}", releases.pages().await?);

        for release in releases.page(1).await? {
            println!(
                "  {:?} {:?}: {:?}",
                release.kind(),
                release.id(),
                release.peek("title")?.as_str()
            );
        }
    }
    println!();

    println!("=== Search Example ===");
    let mut results = client.search("Persuader", [("type", "artist")]);
    println!("Results: {}", results.len().await?);
    if !results.is_empty().await? {
        let first = results.get(0).await?;
        println!("First result: {:?} {:?}", first.kind(), first.id());
    }

    Ok(())
}
