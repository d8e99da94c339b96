use anyhow::Result;
use call_client::{CallClient, CallForm, CountryCode, StatusSink, StatusText, COUNTRY_OPTIONS};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Asks the moving assistant to call a phone number.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server_url: String,
    /// Dialing prefix, with or without the leading `+`.
    #[arg(long, default_value = "+1")]
    country_code: CountryCode,
    /// Print the selectable countries and exit.
    #[arg(long)]
    list_countries: bool,
    #[arg(required_unless_present = "list_countries")]
    phone: Option<String>,
}

struct Terminal;

impl StatusSink for Terminal {
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }

    fn set_status(&self, status: &StatusText) {
        println!("{status}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    if args.list_countries {
        for option in COUNTRY_OPTIONS {
            println!("{:<16} {}", option.label, option.code);
        }
        return Ok(());
    }

    let form = CallForm::new(args.country_code, args.phone.unwrap_or_default());
    let client = CallClient::new(args.server_url);
    match client.submit(&form, &Terminal).await {
        Ok(StatusText::Failed(_)) => std::process::exit(1),
        Ok(_) => Ok(()),
        // The alert has already been shown.
        Err(_) => std::process::exit(2),
    }
}
