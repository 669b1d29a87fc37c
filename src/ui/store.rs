// Document store (Firebase) management: list, inspect, browse, clear,
// delete and update documents through the bot's admin API.

use super::{confirm_typed, pause, pick, settle};
use crate::api::ApiClient;
use crate::render::{self, RULE_WIDTH, TABLE_WIDTH};
use anyhow::Result;
use dialoguer::{Input, Select};
use serde_json::Value;

/// Documents shown per page in the browser.
const PAGE_SIZE: u32 = 20;

/// Rough per-document footprint used for the size estimate.
const ESTIMATED_KB_PER_DOCUMENT: u64 = 2;

pub fn store_menu(api: &ApiClient) -> Result<()> {
    loop {
        render::screen(api.endpoint().base_url(), "DOCUMENT STORE");
        let items = [
            "List collections",
            "Collection stats",
            "Clear a whole collection",
            "Clear old documents",
            "Browse documents",
            "Delete a document",
            "Update a document",
            "Back",
        ];
        let selection = Select::new()
            .with_prompt("Choose an action")
            .items(&items)
            .default(0)
            .interact()?;
        match selection {
            0 => list_collections(api)?,
            1 => show_stats(api)?,
            2 => clear_collection(api)?,
            3 => clear_old_documents(api)?,
            4 => browse_documents(api)?,
            5 => delete_document(api)?,
            6 => update_document(api)?,
            _ => return Ok(()),
        }
    }
}

fn list_collections(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "COLLECTIONS");
    if let Some(list) = settle(render::with_spinner("Loading collections...", || api.collections())) {
        println!("Found {} collections:", list.count);
        println!("{}", render::rule('-', RULE_WIDTH));
        if list.collections.is_empty() {
            println!("  No collections");
        }
        for (i, name) in list.collections.iter().enumerate() {
            println!("  {:2}. {}", i + 1, name);
        }
    }
    pause()
}

/// Fetch the collection names and let the operator choose one.
fn pick_collection(api: &ApiClient) -> Result<Option<String>> {
    let Some(list) = settle(render::with_spinner("Loading collections...", || api.collections())) else {
        return Ok(None);
    };
    if list.collections.is_empty() {
        println!("No collections");
        return Ok(None);
    }
    Ok(pick("Collection", &list.collections)?.map(|i| list.collections[i].clone()))
}

/// Print the document count ahead of a destructive action.
fn announce_count(api: &ApiClient, collection: &str) {
    if let Ok(reply) = api.collection_stats(collection) {
        if let Ok(stats) = reply.into_result() {
            println!(
                "\nCollection '{}' holds {} documents",
                collection,
                render::count(stats.document_count)
            );
        }
    }
}

fn show_stats(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "COLLECTION STATS");
    let Some(collection) = pick_collection(api)? else {
        return pause();
    };
    let outcome = render::with_spinner("Loading stats...", || api.collection_stats(&collection));
    if let Some(stats) = settle(outcome) {
        let name = stats.collection.as_deref().unwrap_or(&collection);
        println!("\nSTATS: {}", name);
        println!("{}", render::rule('-', RULE_WIDTH));
        println!("Documents: {}", render::count(stats.document_count));
        if stats.document_count > 0 {
            println!(
                "Estimated size: ~{} KB",
                render::count(stats.document_count * ESTIMATED_KB_PER_DOCUMENT)
            );
        }
    }
    pause()
}

fn clear_collection(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "CLEAR COLLECTION");
    println!("WARNING: this deletes EVERY document in the collection and cannot be undone");
    println!("{}", render::rule('-', RULE_WIDTH));
    let Some(collection) = pick_collection(api)? else {
        return pause();
    };
    announce_count(api, &collection);

    println!("\nDelete ALL documents in '{}'?", collection);
    if !confirm_typed("DELETE")? {
        println!("Deletion cancelled");
        return pause();
    }

    let outcome = render::with_spinner("Deleting...", || api.clear_collection(&collection));
    if let Some(cleared) = settle(outcome) {
        println!(
            "Deleted {} documents from '{}'",
            render::count(cleared.deleted_count),
            collection
        );
    }
    pause()
}

fn clear_old_documents(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "CLEAR OLD DOCUMENTS");
    println!("Deletes documents older than the given number of days");
    println!("{}", render::rule('-', RULE_WIDTH));
    let Some(collection) = pick_collection(api)? else {
        return pause();
    };

    let days: u32 = Input::new()
        .with_prompt("Delete documents older than how many days")
        .validate_with(|days: &u32| -> Result<(), &'static str> {
            if *days > 0 {
                Ok(())
            } else {
                Err("days must be greater than 0")
            }
        })
        .interact_text()?;
    announce_count(api, &collection);

    println!("\nDelete documents older than {} days in '{}'?", days, collection);
    if !confirm_typed("DELETE")? {
        println!("Deletion cancelled");
        return pause();
    }

    let outcome = render::with_spinner("Deleting...", || api.clear_old_documents(&collection, days));
    if let Some(cleared) = settle(outcome) {
        println!(
            "Deleted {} documents older than {} days",
            render::count(cleared.deleted_count),
            days
        );
        println!("Cutoff date: {}", cleared.cutoff_date.as_deref().unwrap_or("N/A"));
    }
    pause()
}

fn browse_documents(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "BROWSE DOCUMENTS");
    let Some(collection) = pick_collection(api)? else {
        return pause();
    };

    let mut offset = 0;
    loop {
        render::screen(api.endpoint().base_url(), &format!("DOCUMENTS: {}", collection));
        let outcome = render::with_spinner("Loading documents...", || {
            api.documents(&collection, PAGE_SIZE, offset)
        });
        let Some(page) = settle(outcome) else {
            return pause();
        };
        if page.documents.is_empty() {
            println!("  No documents");
            return pause();
        }

        println!("{}", render::document_table(&page.documents));
        println!("{}", render::rule('-', TABLE_WIDTH));
        let shown = page.documents.len() as u32;
        println!(
            "Showing {}-{} of {} documents",
            offset + 1,
            offset + shown,
            render::count(page.count)
        );

        let has_next = u64::from(offset + shown) < page.count;
        let mut actions = Vec::new();
        if has_next {
            actions.push("Next page".to_string());
        }
        if offset > 0 {
            actions.push("Previous page".to_string());
        }
        let Some(choice) = pick("Navigate", &actions)? else {
            return Ok(());
        };
        if actions[choice] == "Next page" {
            offset += shown;
        } else {
            offset = offset.saturating_sub(PAGE_SIZE);
        }
    }
}

fn delete_document(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "DELETE DOCUMENT");
    let Some(collection) = pick_collection(api)? else {
        return pause();
    };
    let id: String = Input::new().with_prompt("Document ID to delete").interact_text()?;
    let id = id.trim().to_string();

    println!("\nDelete document '{}' from '{}'?", id, collection);
    if !confirm_typed("DELETE")? {
        println!("Deletion cancelled");
        return pause();
    }

    let outcome = render::with_spinner("Deleting...", || api.delete_document(&collection, &id));
    if settle(outcome).is_some() {
        println!("Deleted document '{}'", id);
    }
    pause()
}

fn update_document(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "UPDATE DOCUMENT");
    let Some(collection) = pick_collection(api)? else {
        return pause();
    };
    let id: String = Input::new().with_prompt("Document ID to update").interact_text()?;
    let id = id.trim().to_string();

    println!("\nFields to update as a JSON object");
    println!(r#"Example: {{"title": "New Title", "status": "updated"}}"#);
    let raw: String = Input::new().with_prompt("JSON").interact_text()?;
    let data = match parse_document_patch(&raw) {
        Ok(data) => data,
        Err(e) => {
            println!("Invalid data: {}", e);
            return pause();
        }
    };

    println!("\nUpdate document '{}' with {}?", id, data);
    if !confirm_typed("UPDATE")? {
        println!("Update cancelled");
        return pause();
    }

    let outcome = render::with_spinner("Updating...", || api.update_document(&collection, &id, &data));
    if settle(outcome).is_some() {
        println!("Updated document '{}'", id);
    }
    pause()
}

/// Parse the operator's update payload; only a JSON object is accepted.
pub fn parse_document_patch(raw: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(format!("not valid JSON ({})", e)),
    }
}
