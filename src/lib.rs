pub mod config;
pub mod metrics_source; // Synthetic / fixed metric windows
pub mod models;
pub mod report; // Plain-text report + prompt body
pub mod session; // Report session: window + summary lifecycle
pub mod share; // QR share code
pub mod summary; // Narrative service client
pub mod summary_state; // Single-flight summary state machine

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::metrics_source::SyntheticMetricsSource;
use crate::session::{ReportSession, SessionError};
use crate::summary::HttpSummaryClient;
use crate::summary_state::SummaryState;

/// Run one report session from the command line: print the metric report,
/// request a narrative, print the final report and write the share code.
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run_session())
}

async fn run_session() -> ExitCode {
    let client = match HttpSummaryClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Summary client unavailable");
            return ExitCode::FAILURE;
        }
    };

    let today = chrono::Local::now().date_naive();
    let session = match ReportSession::from_source(
        &SyntheticMetricsSource::new(),
        config::WINDOW_DAYS,
        today,
        client,
    ) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Could not build metric window");
            return ExitCode::FAILURE;
        }
    };

    match session.report_text() {
        Ok(text) => println!("{text}"),
        Err(e) => {
            tracing::error!(error = %e, "Report unavailable");
            return ExitCode::FAILURE;
        }
    }

    if let Err(e) = session.request_summary() {
        tracing::error!(error = %e, "Summary request could not be started");
        return ExitCode::FAILURE;
    }

    let settled = match session.settled().await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Summary state unavailable");
            return ExitCode::FAILURE;
        }
    };

    if let SummaryState::Failed(err) = &settled {
        // Report is still shareable without the narrative.
        eprintln!("Summary unavailable: {err}");
    }

    let report = match session.report_text() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Report unavailable");
            return ExitCode::FAILURE;
        }
    };
    if settled.narrative().is_some() {
        println!("\n{report}");
    }

    write_share_code(&session);
    ExitCode::SUCCESS
}

fn write_share_code(session: &ReportSession<HttpSummaryClient>) {
    let image = match session.share_code() {
        Ok(image) => image,
        Err(SessionError::Encode(e)) => {
            eprintln!("QR code unavailable: {e}");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Share code unavailable");
            return;
        }
    };

    let Some(dir) = config::share_dir() else {
        eprintln!("QR code not saved: no home directory and {} is unset", config::ENV_SHARE_DIR);
        return;
    };

    let path = dir.join(format!("report-{}.png", session.id()));
    match image.save_png(&path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), version = image.version(), "Share code written");
            println!("\nQR code saved to {}", path.display());
        }
        Err(e) => eprintln!("QR code not saved: {e}"),
    }
}
