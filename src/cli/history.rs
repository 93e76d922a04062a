use super::render::format_message;
use super::Backend;
use crate::core::config::path_display;

pub fn print_history(backend: &Backend) {
    let Some(history) = backend.history(false) else {
        eprintln!("⚠️  No history location could be determined.");
        return;
    };

    let messages = history.load();
    if messages.is_empty() {
        println!("No saved conversation.");
        return;
    }
    for message in &messages {
        println!("{}", format_message(message));
    }
}

pub fn clear_history(backend: &Backend) {
    match backend.history(false) {
        Some(history) => {
            history.clear();
            println!(
                "🧹 Cleared saved conversation ({})",
                path_display(history.store().path())
            );
        }
        None => eprintln!("⚠️  No history location could be determined."),
    }
}
