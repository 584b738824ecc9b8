//! Command-line argument parsing.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use npc_catalog_core::models::{
    Filter, Gender, NameRequest, NewNote, NoteUpdate, NpcUpdate, Pagination,
};

pub const USAGE: &str = "\
Usage: npc-catalog [--ephemeral] <command> [args]

Session:
  login <email>                    Log in (password from NPC_CATALOG_PASSWORD or prompt)
  logout                           Log out and forget stored tokens
  whoami                           Show the signed-in user

Images:
  npcs [--page N] [--limit N] [--sort F] [--order asc|desc] [--<filter> V]...
  upload <file> [--gender G] [--age A] [--race R] [--culture C] [--class C]...
  update-npc <id> [--gender G] [--age A] [--race R] [--culture C] [--class C]...
  delete-npc <id>
  classes [filter]
  users

Notes:
  notes [--page N] [--limit N] [--<filter> V]...
  add-note <npc-id> <name> [description] [--private]
  update-note <id> [--name N] [--description D] [--private | --public]
  delete-note <id>
  preview <hash>

Names:
  name <gender> <culture>
  names <gender> <culture> [count]

Filters: gender, class, age, race, culture, uploaderId, name, description";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: String },
    Logout,
    Whoami,
    Users,
    Npcs(Pagination),
    Upload { path: PathBuf, meta: NpcUpdate },
    UpdateNpc { id: i64, update: NpcUpdate },
    DeleteNpc { id: i64 },
    Classes { filter: Option<String> },
    Name(NameRequest),
    Names { request: NameRequest, count: Option<u32> },
    Notes(Pagination),
    AddNote(NewNote),
    UpdateNote { id: i64, update: NoteUpdate },
    DeleteNote { id: i64 },
    Preview { hash: String },
    Help,
}

impl Command {
    /// Whether the command needs a restored session before it runs
    pub fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Logout | Command::Preview { .. } | Command::Help
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Keep tokens in memory only
    pub ephemeral: bool,
    pub command: Command,
}

/// Positional arguments plus `--key value` options and bare `--flag`s.
#[derive(Debug, Default)]
struct Args {
    positional: Vec<String>,
    options: Vec<(String, String)>,
    flags: Vec<String>,
}

const BARE_FLAGS: &[&str] = &["private", "public", "ephemeral", "help"];

impl Args {
    fn split(args: &[String]) -> Result<Self> {
        let mut parsed = Args::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.strip_prefix("--") {
                Some(name) if BARE_FLAGS.contains(&name) => parsed.flags.push(name.to_string()),
                Some(name) => {
                    let value = iter
                        .next()
                        .ok_or_else(|| anyhow!("--{} needs a value", name))?;
                    parsed.options.push((name.to_string(), value.clone()));
                }
                None => parsed.positional.push(arg.clone()),
            }
        }
        Ok(parsed)
    }

    fn flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }

    fn positional(&self, index: usize, what: &str) -> Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing {}", what))
    }

    fn id(&self, index: usize) -> Result<i64> {
        let raw = self.positional(index, "id")?;
        raw.parse().with_context(|| format!("invalid id: {}", raw))
    }
}

fn parse_gender(raw: &str) -> Result<Gender> {
    raw.parse().map_err(|e: String| anyhow!(e))
}

fn name_request(args: &Args) -> Result<NameRequest> {
    Ok(NameRequest {
        gender: parse_gender(args.positional(1, "gender")?)?,
        culture: args.positional(2, "culture")?.to_string(),
    })
}

fn npc_update(args: &Args) -> Result<NpcUpdate> {
    let mut update = NpcUpdate::default();
    let mut classes = Vec::new();
    for (key, value) in &args.options {
        match key.as_str() {
            "gender" => update.gender = Some(parse_gender(value)?),
            "age" => update.age = Some(value.clone()),
            "race" => update.race = Some(value.clone()),
            "culture" => update.culture = Some(value.clone()),
            "class" => classes.push(value.clone()),
            other => bail!("unknown option --{}", other),
        }
    }
    if !classes.is_empty() {
        update.class = Some(classes);
    }
    Ok(update)
}

fn pagination(args: &Args) -> Result<Pagination> {
    let mut pagination = Pagination::default();
    let mut filter = Filter::default();
    for (key, value) in &args.options {
        match key.as_str() {
            "page" => pagination.page = value.parse().context("invalid --page")?,
            "limit" => pagination.limit = value.parse().context("invalid --limit")?,
            "sort" => pagination.sort = Some(value.clone()),
            "order" => pagination.order = Some(value.clone()),
            other => {
                if !filter.set(other, value) {
                    bail!("unknown filter or invalid value: --{} {}", other, value);
                }
            }
        }
    }
    Ok(pagination.with_filter(filter))
}

pub fn parse(args: &[String]) -> Result<Invocation> {
    let args = Args::split(args)?;
    let ephemeral = args.flag("ephemeral");

    let Some(name) = args.positional.first() else {
        return Ok(Invocation { ephemeral, command: Command::Help });
    };
    if args.flag("help") {
        return Ok(Invocation { ephemeral, command: Command::Help });
    }

    let command = match name.as_str() {
        "login" => Command::Login {
            email: args.positional(1, "email")?.to_string(),
        },
        "logout" => Command::Logout,
        "whoami" => Command::Whoami,
        "users" => Command::Users,
        "npcs" => Command::Npcs(pagination(&args)?),
        "upload" => Command::Upload {
            path: PathBuf::from(args.positional(1, "file")?),
            meta: npc_update(&args)?,
        },
        "update-npc" => {
            let update = npc_update(&args)?;
            if update.is_empty() {
                bail!("nothing to update");
            }
            Command::UpdateNpc { id: args.id(1)?, update }
        }
        "delete-npc" => Command::DeleteNpc { id: args.id(1)? },
        "classes" => Command::Classes {
            filter: args.positional.get(1).cloned(),
        },
        "name" => Command::Name(name_request(&args)?),
        "names" => Command::Names {
            request: name_request(&args)?,
            count: match args.positional.get(3) {
                Some(raw) => Some(raw.parse().with_context(|| format!("invalid count: {}", raw))?),
                None => None,
            },
        },
        "notes" => Command::Notes(pagination(&args)?),
        "add-note" => {
            let npc = args.id(1)?;
            Command::AddNote(NewNote {
                npc,
                name: args.positional(2, "name")?.to_string(),
                description: args.positional.get(3).cloned().unwrap_or_default(),
                is_private: args.flag("private"),
            })
        }
        "update-note" => {
            let mut update = NoteUpdate::default();
            for (key, value) in &args.options {
                match key.as_str() {
                    "name" => update.name = Some(value.clone()),
                    "description" => update.description = Some(value.clone()),
                    other => bail!("unknown option --{}", other),
                }
            }
            if args.flag("private") {
                update.is_private = Some(true);
            } else if args.flag("public") {
                update.is_private = Some(false);
            }
            if update == NoteUpdate::default() {
                bail!("nothing to update");
            }
            Command::UpdateNote { id: args.id(1)?, update }
        }
        "delete-note" => Command::DeleteNote { id: args.id(1)? },
        "preview" => Command::Preview {
            hash: args.positional(1, "hash")?.to_string(),
        },
        "help" => Command::Help,
        other => bail!("unknown command: {}", other),
    };

    Ok(Invocation { ephemeral, command })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(line: &str) -> Result<Invocation> {
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        parse(&args)
    }

    #[test]
    fn test_empty_args_show_help() {
        assert_eq!(parse_str("").unwrap().command, Command::Help);
        assert_eq!(parse_str("npcs --help").unwrap().command, Command::Help);
    }

    #[test]
    fn test_login_and_ephemeral() {
        let invocation = parse_str("--ephemeral login a@b.com").unwrap();
        assert!(invocation.ephemeral);
        assert_eq!(invocation.command, Command::Login { email: "a@b.com".to_string() });
        assert!(!invocation.command.needs_session());
    }

    #[test]
    fn test_npcs_with_filters() {
        let invocation = parse_str("npcs --page 2 --gender male --uploaderId 4 --age adult").unwrap();
        let Command::Npcs(pagination) = invocation.command else {
            panic!("expected npcs command");
        };
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.filter.gender, Some(Gender::Male));
        assert_eq!(pagination.filter.uploader_id, Some(4));
        assert_eq!(pagination.filter.age.as_deref(), Some("adult"));

        assert!(parse_str("npcs --colour red").is_err());
        assert!(parse_str("npcs --gender bogus").is_err());
        assert!(parse_str("notes --uploaderId four").is_err());
        assert!(parse_str("npcs --page").is_err());
    }

    #[test]
    fn test_upload_collects_classes() {
        let invocation = parse_str("upload p.png --class warrior --class mage --race elf").unwrap();
        let Command::Upload { path, meta } = invocation.command else {
            panic!("expected upload command");
        };
        assert_eq!(path, PathBuf::from("p.png"));
        assert_eq!(meta.class, Some(vec!["warrior".to_string(), "mage".to_string()]));
        assert_eq!(meta.race.as_deref(), Some("elf"));
    }

    #[test]
    fn test_update_commands_need_changes() {
        assert!(parse_str("update-npc 3").is_err());
        assert!(parse_str("update-note 3").is_err());
        let invocation = parse_str("update-note 3 --public").unwrap();
        assert_eq!(
            invocation.command,
            Command::UpdateNote {
                id: 3,
                update: NoteUpdate { is_private: Some(false), ..Default::default() },
            }
        );
    }

    #[test]
    fn test_names_and_notes() {
        let invocation = parse_str("names female pyarroni 5").unwrap();
        assert_eq!(
            invocation.command,
            Command::Names {
                request: NameRequest { gender: Gender::Female, culture: "pyarroni".to_string() },
                count: Some(5),
            }
        );

        let invocation = parse_str("add-note 12 Aldric --private").unwrap();
        let Command::AddNote(note) = invocation.command else {
            panic!("expected add-note command");
        };
        assert_eq!(note.npc, 12);
        assert!(note.is_private);
        assert!(note.description.is_empty());

        assert!(parse_str("name other pyarroni").is_err());
        assert!(parse_str("delete-note abc").is_err());
        assert!(parse_str("frobnicate").is_err());
    }
}
