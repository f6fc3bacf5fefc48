use colored::Colorize;
use solace_core::DISCLAIMER;

const CONTENT_WIDTH: usize = 49;

pub fn show_welcome(voice_enabled: bool) {
    let version = env!("CARGO_PKG_VERSION");
    let border = format!("╭{}╮", "─".repeat(CONTENT_WIDTH + 2));
    let footer = format!("╰{}╯", "─".repeat(CONTENT_WIDTH + 2));
    let print_row = |text: &str| {
        println!("│ {:<CONTENT_WIDTH$} │", text, CONTENT_WIDTH = CONTENT_WIDTH);
    };

    println!();
    println!("{}", border);
    print_row(&format!("Solace (v{})", version));
    print_row("");
    print_row("Quick start:");
    print_row("   Type text    -> Talk it through");
    if voice_enabled {
        print_row("   /voice       -> Say one thing aloud");
        print_row("   /voice-mode  -> Keep listening (Ctrl-C stops)");
    }
    print_row("   /help        -> Show commands");
    print_row("   /quit        -> Leave");
    println!("{}", footer);
    println!("{}\n", DISCLAIMER.dimmed());
}
