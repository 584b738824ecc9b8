//! npc-catalog - command-line client for the NPC catalogue backend.
//!
//! Every invocation restores the stored session first (refreshing the access
//! token), runs one command and prints the result as JSON on stdout.

mod cli;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use npc_catalog_core::auth::TokenStorage;
use npc_catalog_core::models::{ImageFile, NewNpc, Note, Npc, Paginated};
use npc_catalog_core::{ApiClient, ApiError, AuthState, Config, ErrorKind, SessionStore};

use cli::{Command, Invocation, USAGE};

/// Environment variable read before prompting for a password
const PASSWORD_ENV: &str = "NPC_CATALOG_PASSWORD";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG to raise the level (e.g. RUST_LOG=npc_catalog_core=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match cli::parse(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if invocation.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let client = match connect(&invocation) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&client, invocation.command).await {
        eprintln!("Error: {}", describe(&e));
        std::process::exit(1);
    }
    Ok(())
}

/// Build the client over the configured token storage
fn connect(invocation: &Invocation) -> Result<ApiClient> {
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {:#}", e);
        Config::default()
    });

    let storage = if invocation.ephemeral {
        TokenStorage::Memory
    } else {
        config.token_storage
    };
    let data_dir = config.data_dir()?;
    debug!(?storage, data_dir = %data_dir.display(), "Opening token storage");
    let session = Arc::new(SessionStore::from_boxed(storage.open(&data_dir)));

    info!(api_url = %config.api_url, "Starting npc-catalog");
    Ok(ApiClient::new(&config, session)?)
}

/// Turn a failure into a message for the terminal
fn describe(error: &anyhow::Error) -> String {
    let Some(api_error) = error.downcast_ref::<ApiError>() else {
        return format!("{:#}", error);
    };
    if let ApiError::InvalidCredentials = api_error {
        return "Invalid email or password".to_string();
    }
    if let ApiError::Storage(e) = api_error {
        return format!("Could not save the session: {:#}", e);
    }
    if api_error.is_forbidden() {
        return "Not permitted: you can only change your own images and notes".to_string();
    }
    match api_error.kind() {
        ErrorKind::AuthenticationExpired => {
            "Session expired. Run `npc-catalog login <email>` to sign in again".to_string()
        }
        ErrorKind::AuthenticationInvalid => format!("Not authorized: {}", api_error),
        ErrorKind::ValidationRejected => format!("Request rejected: {}", api_error),
        ErrorKind::NetworkOrServerFailure => format!("Backend unavailable: {}", api_error),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Image listing without the base64 payload
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NpcRow<'a> {
    id: i64,
    gender: Option<String>,
    class: String,
    age: Option<&'a str>,
    race: Option<&'a str>,
    culture: Option<&'a str>,
    uploader: Option<String>,
    note_count: u32,
}

impl<'a> From<&'a Npc> for NpcRow<'a> {
    fn from(npc: &'a Npc) -> Self {
        Self {
            id: npc.id,
            gender: npc.gender.map(|g| g.to_string()),
            class: npc.class_display(),
            age: npc.age.as_deref(),
            race: npc.race.as_deref(),
            culture: npc.culture.as_deref(),
            uploader: npc.uploader.as_ref().map(|u| u.display_name().to_string()),
            note_count: npc.note_count,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteRow<'a> {
    id: i64,
    npc: Option<i64>,
    name: &'a str,
    description: &'a str,
    is_private: bool,
    created_by: Option<String>,
    hash: Option<&'a str>,
}

impl<'a> From<&'a Note> for NoteRow<'a> {
    fn from(note: &'a Note) -> Self {
        Self {
            id: note.id,
            npc: note.npc.as_ref().map(|n| n.id),
            name: &note.name,
            description: &note.description,
            is_private: note.is_private,
            created_by: note.created_by.as_ref().map(|u| u.display_name().to_string()),
            hash: note.hash.as_deref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Page<R> {
    page: u32,
    page_count: u64,
    total_count: u64,
    data: Vec<R>,
}

fn page_of<'a, T, R>(page: &'a Paginated<T>) -> Page<R>
where
    R: From<&'a T>,
{
    Page {
        page: page.page,
        page_count: page.page_count(),
        total_count: page.total_count,
        data: page.data.iter().map(R::from).collect(),
    }
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn read_image(path: &Path) -> Result<ImageFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.png".to_string());
    Ok(ImageFile::from_path_bytes(file_name, bytes))
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
    if command.needs_session() {
        if let AuthState::Unauthenticated = client.initialize().await {
            bail!("Not logged in. Run `npc-catalog login <email>` first");
        }
    }

    match command {
        Command::Login { email } => {
            let password = read_password()?;
            let user = client.login(&email, &password).await?;
            eprintln!("Logged in as {}", user.display_name());
        }
        Command::Logout => {
            // Local tokens are gone even when the server call fails
            if let Err(e) = client.logout().await {
                warn!("Server logout failed: {}", e);
            }
            eprintln!("Logged out");
        }
        Command::Whoami => match client.current() {
            Some(current) => print_json(&current.user)?,
            None => bail!("Not logged in"),
        },
        Command::Users => print_json(&client.users().await?)?,
        Command::Npcs(pagination) => {
            let page = client.npcs(&pagination).await?;
            print_json(&page_of::<_, NpcRow>(&page))?;
        }
        Command::Upload { path, meta } => {
            let npc = NewNpc {
                gender: meta.gender,
                class: meta.class.unwrap_or_default(),
                age: meta.age,
                race: meta.race,
                culture: meta.culture,
                ..NewNpc::new(read_image(&path)?)
            };
            let created = client.create_npc(&npc).await?;
            print_json(&NpcRow::from(&created))?;
        }
        Command::UpdateNpc { id, update } => {
            let npc = client.update_npc(id, &update).await?;
            print_json(&NpcRow::from(&npc))?;
        }
        Command::DeleteNpc { id } => {
            client.delete_npc(id).await?;
            eprintln!("Deleted image {}", id);
        }
        Command::Classes { filter } => {
            print_json(&client.available_classes(filter.as_deref()).await?)?;
        }
        Command::Name(request) => println!("{}", client.generate_name(&request).await?),
        Command::Names { request, count } => {
            for name in client.generate_names(&request, count).await? {
                println!("{}", name);
            }
        }
        Command::Notes(pagination) => {
            let page = client.notes(&pagination).await?;
            print_json(&page_of::<_, NoteRow>(&page))?;
        }
        Command::AddNote(note) => {
            let created = client.create_note(&note).await?;
            print_json(&NoteRow::from(&created))?;
        }
        Command::UpdateNote { id, update } => {
            let note = client.update_note(id, &update).await?;
            print_json(&NoteRow::from(&note))?;
        }
        Command::DeleteNote { id } => {
            client.delete_note(id).await?;
            eprintln!("Deleted note {}", id);
        }
        Command::Preview { hash } => print_json(&client.preview(&hash).await?)?,
        Command::Help => println!("{}", USAGE),
    }
    Ok(())
}
