//! Data models for NPC catalogue entities.
//!
//! This module contains the records exchanged with the backend:
//!
//! - `User`, `Avatar`, `TokenPair`: accounts and session credentials
//! - `Npc`, `NewNpc`, `NpcUpdate`, `ImageFile`: uploaded character images
//! - `Note`, `NewNote`, `NoteUpdate`, `NotePreview`: notes attached to images
//! - `Filter`, `Pagination`, `Paginated`: list queries and response envelopes
//! - `NameRequest`: culture/gender input for the name generator
//!
//! Every entity except the token pair is a read-only mirror of server state.

pub mod note;
pub mod npc;
pub mod pagination;
pub mod user;

pub use note::{NewNote, Note, NotePreview, NoteUpdate};
pub use npc::{Gender, ImageFile, NameRequest, NewNpc, Npc, NpcUpdate};
pub use pagination::{Filter, Paginated, Pagination};
pub use user::{Avatar, TokenPair, User};
