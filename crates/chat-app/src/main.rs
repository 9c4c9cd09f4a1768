use std::io::{self, Write};
use std::sync::Arc;

use norma::controller::{ChatController, PipelineError, SendOutcome};
use norma::settings::{ENDPOINT_URL_ENV_VAR, SettingsStore};
use norma_assistant::{AnswerEndpoint, HttpAnswerEndpoint, Topic, builtin_topics};
use norma_chat::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatExit {
    Back,
    Quit,
}

/// Application entry point.
///
/// Bootstraps tracing, loads settings (with the environment override for the
/// endpoint URL), and runs the terminal front: topic selection, then the chat
/// loop for the chosen topic until the user goes back or quits.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run().await {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = SettingsStore::load()
        .settings()
        .clone()
        .with_endpoint_override(std::env::var(ENDPOINT_URL_ENV_VAR).ok().as_deref());
    let endpoint: Arc<dyn AnswerEndpoint> =
        Arc::new(HttpAnswerEndpoint::new(settings.to_endpoint_config())?);
    let topics = builtin_topics();

    println!("Asistente Normativo");
    loop {
        let Some(topic) = prompt_topic(&topics)? else {
            return Ok(());
        };
        if run_chat(Arc::clone(&endpoint), topic).await? == ChatExit::Quit {
            return Ok(());
        }
    }
}

fn prompt_topic(topics: &[Topic]) -> io::Result<Option<Topic>> {
    loop {
        println!("\nElige un tema:");
        for (index, topic) in topics.iter().enumerate() {
            println!("  [{}] {}", index + 1, topic.display_name);
        }
        print!("tema (o :quit)> ");
        io::stdout().flush()?;

        let Some(line) = read_line()? else {
            return Ok(None);
        };
        let line = line.trim();
        if line == ":quit" || line == ":q" {
            return Ok(None);
        }

        if let Ok(choice) = line.parse::<usize>()
            && choice >= 1
            && choice <= topics.len()
        {
            return Ok(Some(topics[choice - 1].clone()));
        }
        println!("Opción no válida.");
    }
}

async fn run_chat(
    endpoint: Arc<dyn AnswerEndpoint>,
    topic: Topic,
) -> Result<ChatExit, Box<dyn std::error::Error>> {
    let mut controller = ChatController::new(endpoint, topic.id.clone());
    println!("\nChat · {}", topic.display_name);
    println!("Escribe tu pregunta, o :new, :open <n>, :history, :back, :quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = read_line()? else {
            return Ok(ChatExit::Quit);
        };
        let line = line.trim();

        match line {
            "" => {}
            ":quit" | ":q" => return Ok(ChatExit::Quit),
            ":back" => return Ok(ChatExit::Back),
            ":new" => {
                controller.new_chat();
                println!("Nuevo chat.");
            }
            ":history" => print_history(&controller),
            _ => {
                if let Some(raw_index) = line.strip_prefix(":open") {
                    open_chat_by_index(&mut controller, raw_index.trim());
                    continue;
                }

                println!("El asistente está escribiendo…");
                match controller.send(line).await {
                    Ok(SendOutcome::Answered) => {
                        if let Some(turn) = controller.messages().last_turn() {
                            println!("\nAsistente: {}\n", turn.text);
                        }
                    }
                    Ok(SendOutcome::Ignored) => {}
                    Err(PipelineError::Ask { source, .. }) => {
                        println!("El asistente no pudo responder: {source}");
                    }
                    Err(error) => println!("{error}"),
                }
            }
        }
    }
}

fn open_chat_by_index(controller: &mut ChatController, raw_index: &str) {
    let summaries = controller.session_summaries();
    let Ok(index) = raw_index.parse::<usize>() else {
        println!("Uso: :open <n> (ver :history)");
        return;
    };
    let Some(summary) = index.checked_sub(1).and_then(|index| summaries.get(index)) else {
        println!("No existe el chat {index}.");
        return;
    };

    match controller.open_chat(summary.id) {
        Ok(()) => print_log(controller),
        Err(error) => println!("{error}"),
    }
}

fn print_history(controller: &ChatController) {
    println!("Historial:");
    for (index, summary) in controller.session_summaries().iter().enumerate() {
        let marker = if summary.is_active { '*' } else { ' ' };
        let typing = if summary.is_awaiting {
            " (escribiendo…)"
        } else {
            ""
        };
        println!(" {marker}[{}] {}{typing}", index + 1, summary.title);
    }
}

fn print_log(controller: &ChatController) {
    for turn in controller.messages().turns() {
        let speaker = match turn.role {
            Role::User => "Tú",
            Role::Assistant => "Asistente",
        };
        println!("{speaker}: {}", turn.text);
    }
}

fn read_line() -> io::Result<Option<String>> {
    let mut buffer = String::new();
    if io::stdin().read_line(&mut buffer)? == 0 {
        return Ok(None);
    }
    Ok(Some(buffer))
}
