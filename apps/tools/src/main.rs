use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::ChatId;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/movecall.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deactivate active chat sessions older than the given age.
    SweepStale {
        #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(i64).range(1..))]
        ttl_hours: i64,
    },
    ShowSession {
        chat_id: String,
    },
    ShowCall {
        call_sid: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::SweepStale { ttl_hours } => {
            let swept = storage.deactivate_sessions_older_than(ttl_hours).await?;
            println!("deactivated {swept} session(s) older than {ttl_hours}h");
        }
        Command::ShowSession { chat_id } => {
            let chat_id = ChatId(chat_id);
            let Some(session) = storage.load_session(&chat_id).await? else {
                bail!("no chat session {chat_id}");
            };
            println!("chat_id={} bot={}", session.chat_id, session.bot_name);
            println!(
                "state={} active={} confirmed={} created_at={}",
                session.state.as_str(),
                session.is_active,
                session.confirmed,
                session.created_at
            );
            if let Some(range) = session.estimated_cost {
                println!("estimate={range}");
            }
            if let Some(details) = storage.load_move_details(&chat_id).await? {
                println!("move_details={}", serde_json::to_string_pretty(&details)?);
            }
            for message in storage.list_messages(&chat_id).await? {
                println!(
                    "[{}] {}: {}",
                    message.created_at,
                    message.sender.as_str(),
                    message.text
                );
            }
        }
        Command::ShowCall { call_sid } => match storage.load_call_record(&call_sid).await? {
            Some(record) => println!(
                "call_sid={} phone_number={} created_at={}",
                record.call_sid, record.phone_number, record.created_at
            ),
            None => bail!("no call record {call_sid}"),
        },
    }

    Ok(())
}
