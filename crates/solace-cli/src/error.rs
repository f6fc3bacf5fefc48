use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    for suggestion in suggestions(&err.to_string()) {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        for line in suggestion {
            eprintln!("  {line}");
        }
    }

    std::process::exit(1);
}

fn suggestions(message: &str) -> Vec<Vec<String>> {
    let msg = message.to_lowercase();
    let mut out = Vec::new();

    if msg.contains("openai_api_key") || msg.contains("invalid api key") {
        out.push(vec![
            "Set your OpenAI key in the environment or a .env file:".to_string(),
            format!("{} export OPENAI_API_KEY=<value>", "$".dimmed()),
        ]);
    }

    if msg.contains("memory service") {
        out.push(vec![
            "Make sure the memory server is running (default http://localhost:8888)".to_string(),
            "or point SOLACE_MEMORY_URL at it.".to_string(),
        ]);
    }

    if msg.contains("audio") {
        out.push(vec![
            "Voice features need a build with audio support:".to_string(),
            format!("{} cargo install solace-cli --features audio", "$".dimmed()),
        ]);
    }

    if msg.contains("connection refused") || msg.contains("network") {
        out.push(vec!["Check your internet connection and try again.".to_string()]);
    }

    out
}
