use attachment_storage::core::config::Config;
use attachment_storage::{ObjectStorageAdapter, SourceFile, Style, UploadedFile};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "attachment-storage",
    about = "Store, locate and remove attachment styles in S3-compatible storage"
)]
struct Args {
    /// Primary key of the model instance owning the attachment
    #[arg(long)]
    id: Option<u64>,

    /// Original file name, used by {filename}, {basename} and {extension}
    #[arg(long)]
    filename: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the public URL of a style
    Url { style: String },
    /// Print the object key of a style
    Path { style: String },
    /// Upload a file as the given style
    Put {
        file: PathBuf,
        style: String,
        /// Treat the file as a fresh upload rather than a processed file
        #[arg(long)]
        uploaded: bool,
        /// Content type of the upload; guessed from the file extension when absent
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete every style of the attachment
    Remove,
    /// Create the bucket if it does not exist
    EnsureBucket,
}

fn main() -> anyhow::Result<()> {
    // One request at a time per adapter; no worker pool needed
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Configuration loaded: bucket={}, region={}, styles={}",
        config.s3.bucket,
        config.s3.region,
        config.attachment.styles.len()
    );

    let filename = match (&args.filename, &args.command) {
        (Some(name), _) => Some(name.clone()),
        (None, Command::Put { file, .. }) => file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        (None, _) => None,
    };

    let descriptor = config
        .descriptor(args.id, filename)
        .validated()
        .map_err(|e| anyhow::anyhow!("Invalid attachment configuration: {}", e))?;
    let mut adapter = ObjectStorageAdapter::new(&descriptor)
        .map_err(|e| anyhow::anyhow!("Failed to initialize storage client: {}", e))?;

    match args.command {
        Command::Url { style } => {
            let url = adapter.url(&style).await?;
            emit(args.json, json!({ "style": style, "url": url }), &url);
        }
        Command::Path { style } => {
            let key = adapter.path(&style)?;
            emit(args.json, json!({ "style": style, "path": key }), &key);
        }
        Command::Put {
            file,
            style,
            uploaded,
            content_type,
        } => {
            let style = descriptor
                .styles
                .iter()
                .find(|s| s.name == style)
                .cloned()
                .unwrap_or_else(|| Style::new(style));

            let source = if uploaded {
                let client_name = descriptor
                    .original_filename
                    .clone()
                    .unwrap_or_else(|| file.display().to_string());
                let upload = UploadedFile::new(file, client_name);
                SourceFile::Uploaded(match content_type {
                    Some(mime_type) => upload.with_mime_type(mime_type),
                    None => upload,
                })
            } else {
                SourceFile::Path(file)
            };

            adapter.move_file(&source, &style).await?;
            let url = adapter.url(&style.name).await?;
            emit(
                args.json,
                json!({ "style": style.name, "url": url }),
                &url,
            );
        }
        Command::Remove => {
            adapter.remove().await?;
            let keys = descriptor
                .style_names()
                .map(|name| adapter.path(name))
                .collect::<Result<Vec<_>, _>>()?;
            emit(args.json, json!({ "removed": keys }), &keys.join("\n"));
        }
        Command::EnsureBucket => {
            adapter.build_bucket(&descriptor.bucket).await?;
            emit(
                args.json,
                json!({ "bucket": descriptor.bucket, "exists": adapter.bucket_exists_flag() }),
                &descriptor.bucket,
            );
        }
    }

    Ok(())
}

fn emit(as_json: bool, value: serde_json::Value, plain: &str) {
    if as_json {
        println!("{}", value);
    } else {
        println!("{}", plain);
    }
}
