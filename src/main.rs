use std::{process, sync::Arc};

use texflag::{
    application::{
        cancellation::{CancellationToken, RequestId},
        error::AppError,
        scheduler::TokioScheduler,
        session::{PreviewServices, PreviewSession},
        transport::RenderTransport,
    },
    config::{self, LinkArgs, RenderArgs, Settings, WatchArgs},
    domain::{diagnostic::extract_diagnostic, document::seed_document, link::LinkBuilder},
    infra::{
        artifacts::TempFileArtifacts, console::ConsoleView, error::InfraError,
        http::HttpRenderTransport, storage::FileStore, telemetry, watch::FileEditor,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Watch(args) => run_watch(settings, args).await,
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Link(args) => run_link(settings, args).await,
    }
}

async fn run_watch(settings: Settings, args: WatchArgs) -> Result<(), AppError> {
    let transport = HttpRenderTransport::new(&settings.service.endpoint)?;
    let services = PreviewServices {
        transport: Arc::new(transport),
        scheduler: Arc::new(TokioScheduler::new(tokio::runtime::Handle::current())),
        artifacts: Arc::new(TempFileArtifacts::new(&settings.artifacts.directory)),
        persistence: Arc::new(FileStore::new(&settings.storage.directory)),
        links: link_builder(&settings),
        debounce: settings.preview.debounce,
        view: Box::new(ConsoleView::new(args.output.clone())),
    };

    let (session, handle) = PreviewSession::new(services);
    let seed = session.initial_document();
    let (editor, document) =
        FileEditor::open(&args.file, &seed, settings.preview.poll_interval).await?;

    info!(
        path = %editor.path().display(),
        endpoint = %settings.service.endpoint,
        "watching source file"
    );

    let running = tokio::spawn(session.run(document));
    let watcher = tokio::spawn(editor.run(handle.clone()));

    tokio::signal::ctrl_c()
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!("shutting down preview");
    handle.shutdown()?;

    let state = running
        .await
        .map_err(|err| AppError::unexpected(format!("preview session task failed: {err}")))?;
    watcher.abort();
    let _ = watcher.await;

    info!(state = state.label(), "preview stopped");
    Ok(())
}

async fn run_render(settings: Settings, args: RenderArgs) -> Result<(), AppError> {
    let content = read_source(&args.file).await?;
    let transport = HttpRenderTransport::new(&settings.service.endpoint)?;

    let response = transport
        .render(content, CancellationToken::new(RequestId::new(1)))
        .await
        .map_err(|err| AppError::render(err.to_string()))?;

    if !response.status.is_success() {
        let raw = String::from_utf8_lossy(&response.body);
        return Err(AppError::render(extract_diagnostic(&raw)));
    }

    tokio::fs::write(&args.output, &response.body)
        .await
        .map_err(|err| InfraError::file(&args.output, err))?;
    println!(
        "rendered {} ({} bytes)",
        args.output.display(),
        response.body.len()
    );
    Ok(())
}

async fn run_link(settings: Settings, args: LinkArgs) -> Result<(), AppError> {
    let content = read_source(&args.file).await?;
    let links = link_builder(&settings);

    match links.build(&content) {
        Some(link) => {
            println!("{link}");
            Ok(())
        }
        None => {
            let length = links
                .candidate(&content)
                .map(|url| url.as_str().len())
                .map_err(|err| AppError::unexpected(format!("failed to build link: {err}")))?;
            Err(AppError::LinkTooLong {
                length,
                limit: links.max_length(),
            })
        }
    }
}

fn link_builder(settings: &Settings) -> LinkBuilder {
    LinkBuilder::new(
        settings.service.endpoint.clone(),
        settings.preview.max_link_length,
    )
}

/// Read a source file, falling back to the default document when it is empty.
async fn read_source(path: &std::path::Path) -> Result<String, AppError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| InfraError::file(path, err))?;
    if content.is_empty() {
        warn!(path = %path.display(), "source file is empty; using the default document");
    }
    Ok(seed_document(Some(content)))
}
