//! Poll creation, voting and share links.
//!
//! [`store::PollStore`] owns the polls and talks to a [`db::PollStorage`]
//! backend, [`share::ShareLinkCodec`] turns polls into links and back, and
//! [`handlers`] exposes both over HTTP.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod share;
pub mod store;
pub mod view;
pub mod voting;
