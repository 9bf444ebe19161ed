use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use console::style;
use pagescore::batch::fetch_lighthouse_reports;
use pagescore::network::{self, PageSpeedClient};
use pagescore::options::{self, ConfigFile};

// Fetches interleave on one thread; the semaphore bounds in-flight requests.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse terminal arguments.
    let mut options = options::Cli::parse();

    // Load config file and apply values (CLI args take priority).
    let config = ConfigFile::load(options.config.as_ref()).unwrap_or_else(|e| exit_with_error(&e));
    options
        .apply_config(&config)
        .unwrap_or_else(|e| exit_with_error(&e));

    let Some(api_key) = options.api_key.clone() else {
        exit_with_error(
            "No API key given. Pass --api-key, set PAGESPEED_API_KEY or add `api_key` to the config file.",
        );
    };
    let urls = options.collect_urls().unwrap_or_else(|e| exit_with_error(&e));

    // Build the PageSpeed client.
    let client = network::build_client(&options).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to build the HTTP client: {e}"))
    });
    let source = Arc::new(PageSpeedClient::new(
        client,
        options.endpoint.clone(),
        api_key,
    ));

    // Fetch reports concurrently and write the aggregate.
    let report = fetch_lighthouse_reports(urls, source, &options).await;

    if options.json {
        // Print clean JSON to stdout for piping.
        let json = report
            .to_json_string()
            .unwrap_or_else(|e| exit_with_error(&e.to_string()));
        println!("{json}");
    } else {
        report.show_text_report();
    }

    report.exit_code()
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("{} {}", style("[ERROR]").red(), message);
    std::process::exit(1);
}
