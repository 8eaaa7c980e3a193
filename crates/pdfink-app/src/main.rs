//! Main application entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting PdfInk");

    let result = pdfink_app::CliArgs::parse(std::env::args().skip(1)).and_then(|args| pdfink_app::run(&args));
    match result {
        Ok(output) => {
            println!("Exported {} pages to {}", output.page_count, output.path.display());
            ExitCode::SUCCESS
        }
        Err(pdfink_app::AppError::Usage(message)) => {
            eprintln!("{}\n{}", message, pdfink_app::cli::USAGE);
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
