//! Document operations component: generic CRUD against a user-chosen
//! collection.
//!
//! All values entered here are captured as strings; the store is
//! schema-less and nothing is validated beyond "a document is an object".
//! Store-level errors are reported and the menu loop continues.

use docledger_core::filter::Filter;
use docledger_core::store::Store;
use serde_json::{Map, Value};

use crate::console::{Console, ConsoleError, pause};
use crate::display::Table;

/// Default collection name used when the store has none yet.
const DEFAULT_COLLECTION: &str = "scratch";

/// Run the document operations submenu.
pub fn run(store: &Store, console: &mut dyn Console) -> Result<(), ConsoleError> {
    console.panel("Document operations");

    let collection = choose_collection(store, console)?;
    console.line(&format!("Working on collection '{collection}'."));

    loop {
        console.table(&menu());
        let choice = console.prompt("Select an operation (0-5): ")?;
        match choice.as_str() {
            "0" => break,
            "1" => insert(store, console, &collection)?,
            "2" => find(store, console, &collection)?,
            "3" => update(store, console, &collection)?,
            "4" => delete(store, console, &collection)?,
            "5" => count(store, console, &collection),
            _ => console.line("Invalid option, try again."),
        }
        pause(console)?;
    }
    Ok(())
}

fn menu() -> Table {
    let mut table = Table::new(["Option", "Operation", "Description"]).with_title("CRUD operations");
    table.add_row(["1", "Insert", "Add new documents"]);
    table.add_row(["2", "Find", "Query documents"]);
    table.add_row(["3", "Update", "Modify matching documents"]);
    table.add_row(["4", "Delete", "Remove matching documents"]);
    table.add_row(["5", "Count", "Count all documents"]);
    table.add_row(["0", "Back", "Return to the main menu"]);
    table
}

fn choose_collection(store: &Store, console: &mut dyn Console) -> Result<String, ConsoleError> {
    let names = store.collection_names();
    if names.is_empty() {
        console.line(&format!(
            "No collections yet; using '{DEFAULT_COLLECTION}'."
        ));
        return Ok(DEFAULT_COLLECTION.to_string());
    }
    let entered = console.prompt(&format!("Collection name ({}): ", names.join(", ")))?;
    if entered.is_empty() {
        Ok(names[0].clone())
    } else {
        Ok(entered)
    }
}

/// Read a free-form document as key/value pairs until an empty field name.
fn read_document(console: &mut dyn Console) -> Result<Value, ConsoleError> {
    let mut doc = Map::new();
    loop {
        let key = console.prompt("Field name (empty to finish): ")?;
        if key.is_empty() {
            break;
        }
        let value = console.prompt(&format!("Value for '{key}': "))?;
        doc.insert(key, Value::String(value));
    }
    Ok(Value::Object(doc))
}

/// Read an optional single field=value equality filter.
fn read_filter(console: &mut dyn Console, verb: &str) -> Result<Filter, ConsoleError> {
    let field = console.prompt(&format!("Filter field for {verb} (empty for all): "))?;
    if field.is_empty() {
        return Ok(Filter::All);
    }
    let value = console.prompt(&format!("Value for '{field}': "))?;
    Ok(Filter::eq(field, value))
}

fn insert(store: &Store, console: &mut dyn Console, collection: &str) -> Result<(), ConsoleError> {
    console.line("1. Insert one\n2. Insert many");
    let choice = console.prompt("Select an option (1-2): ")?;
    match choice.as_str() {
        "1" => {
            let doc = read_document(console)?;
            match store.insert_one(collection, doc) {
                Ok(id) => console.line(&format!("Inserted document {id}.")),
                Err(e) => console.line(&format!("Error: {e}")),
            }
        }
        "2" => {
            let mut docs = Vec::new();
            loop {
                let doc = read_document(console)?;
                if doc.as_object().is_some_and(|obj| !obj.is_empty()) {
                    docs.push(doc);
                }
                let more = console.prompt("Add another document? (y/n): ")?;
                if !more.eq_ignore_ascii_case("y") {
                    break;
                }
            }
            match store.insert_many(collection, docs) {
                Ok(ids) => console.line(&format!("Inserted {} document(s).", ids.len())),
                Err(e) => console.line(&format!("Error: {e}")),
            }
        }
        _ => console.line("Invalid option, try again."),
    }
    Ok(())
}

fn find(store: &Store, console: &mut dyn Console, collection: &str) -> Result<(), ConsoleError> {
    let filter = read_filter(console, "find")?;
    match store.find(collection, &filter) {
        Ok(results) => {
            let mut table = Table::new(["Id", "Document"]).with_title("Search results");
            for (id, doc) in &results {
                table.add_row([id.to_string(), doc.to_string()]);
            }
            console.table(&table);
            console.line(&format!("{} matching document(s).", results.len()));
        }
        Err(e) => console.line(&format!("Error: {e}")),
    }
    Ok(())
}

fn update(store: &Store, console: &mut dyn Console, collection: &str) -> Result<(), ConsoleError> {
    let filter = read_filter(console, "update")?;
    let field = console.prompt("Field to set: ")?;
    if field.is_empty() {
        console.line("No field given; nothing updated.");
        return Ok(());
    }
    let value = console.prompt(&format!("New value for '{field}': "))?;
    match store.update_many(collection, &filter, &field, Value::String(value)) {
        Ok(modified) => console.line(&format!("Updated {modified} document(s).")),
        Err(e) => console.line(&format!("Error: {e}")),
    }
    Ok(())
}

fn delete(store: &Store, console: &mut dyn Console, collection: &str) -> Result<(), ConsoleError> {
    let filter = read_filter(console, "delete")?;
    match store.delete_many(collection, &filter) {
        Ok(deleted) => console.line(&format!("Deleted {deleted} document(s).")),
        Err(e) => console.line(&format!("Error: {e}")),
    }
    Ok(())
}

fn count(store: &Store, console: &mut dyn Console, collection: &str) {
    match store.count(collection) {
        Ok(n) => console.line(&format!("Total documents: {n}")),
        Err(e) => console.line(&format!("Error: {e}")),
    }
}
