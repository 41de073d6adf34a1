use anyhow::Result;
use clap::{Parser, Subcommand};
use lms_assets::app::App;
use lms_assets::certificate::new_certificate_id;
use lms_assets::models::CertificateRequest;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "lms-assets")]
#[command(about = "Upload course media and issue completion certificates")]
struct CliArgs {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Upload an image file to object storage.
    UploadImage { path: PathBuf },
    /// Upload a video file to object storage.
    UploadVideo { path: PathBuf },
    /// Delete a stored image by its provider identifier.
    DeleteImage { identifier: String },
    /// Delete a stored video by its provider identifier.
    DeleteVideo { identifier: String },
    /// Render a certificate of completion.
    Certificate {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
        /// Certificate id; a fresh one is generated when omitted.
        #[arg(long)]
        id: Option<String>,
        /// Print the filled-in HTML instead of rendering a PDF.
        #[arg(long)]
        html_only: bool,
    },
}

#[derive(Debug, Serialize)]
struct Deleted {
    identifier: String,
    deleted: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(app: &App, command: CliCommand) -> Result<()> {
    match command {
        CliCommand::UploadImage { path } => print_json(&app.media.upload_image(&path).await?),
        CliCommand::UploadVideo { path } => print_json(&app.media.upload_video(&path).await?),
        CliCommand::DeleteImage { identifier } => {
            let deleted = app.media.delete_image(Some(identifier.as_str())).await?;
            print_json(&Deleted {
                identifier,
                deleted,
            })
        }
        CliCommand::DeleteVideo { identifier } => {
            let deleted = app.media.delete_video(Some(identifier.as_str())).await?;
            print_json(&Deleted {
                identifier,
                deleted,
            })
        }
        CliCommand::Certificate {
            student,
            course,
            id,
            html_only,
        } => {
            let request =
                CertificateRequest::new(student, course, id.unwrap_or_else(new_certificate_id));
            if html_only {
                println!("{}", app.certificates.render_html(&request).await?);
                Ok(())
            } else {
                print_json(&app.certificates.generate_pdf(&request).await?)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lms_assets=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    match App::new().await {
        Ok(app) => match run(&app, args.command).await {
            Ok(_) => {
                info!("Done");
                Ok(())
            }
            Err(e) => {
                error!("Command failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }
}
