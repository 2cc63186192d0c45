use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use query::GraphQa;

#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Quit,
    ToggleVerbose,
    Skip,
    Ask(&'a str),
}

pub fn parse_command(line: &str) -> ChatCommand<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Skip;
    }

    match line.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "verbose" => ChatCommand::ToggleVerbose,
        _ => ChatCommand::Ask(line),
    }
}

/// Read questions from stdin until EOF or a quit command.
pub async fn run(qa: &GraphQa, mut verbose: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Ask a question about the graph. Type 'verbose' to toggle context, 'quit' to exit.");

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Skip => continue,
            ChatCommand::ToggleVerbose => {
                verbose = !verbose;
                println!("verbose {}", if verbose { "on" } else { "off" });
            }
            ChatCommand::Ask(question) => match qa.ask(question).await {
                Ok(answer) => {
                    if verbose {
                        println!("Entities: {}", answer.entities.join(", "));
                        println!("{}", answer.context);
                    }
                    println!("{}", answer.answer);
                }
                Err(e) => {
                    warn!(stage = e.stage(), error = %e, "question failed");
                    println!("Error: {}", e);
                }
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_words() {
        for word in ["quit", "EXIT", " q ", "Quit"] {
            assert_eq!(parse_command(word), ChatCommand::Quit);
        }
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(parse_command(""), ChatCommand::Skip);
        assert_eq!(parse_command("   \t"), ChatCommand::Skip);
    }

    #[test]
    fn test_questions_are_trimmed() {
        assert_eq!(parse_command("verbose"), ChatCommand::ToggleVerbose);
        assert_eq!(
            parse_command("  Who founded Acme?  "),
            ChatCommand::Ask("Who founded Acme?")
        );
        assert_eq!(parse_command("quitting time?"), ChatCommand::Ask("quitting time?"));
    }
}
