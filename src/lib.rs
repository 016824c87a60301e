//! trackdex - indexes media messages from chat channels by the music track
//! links they carry.
//!
//! Messages are read from a [`source::MessageSource`], track links are
//! pulled out of their text, entities, and buttons by [`extract`], and the
//! resulting file records are persisted through [`repository`]. The
//! [`services::indexer`] loop ties these together with resumable cursors.

pub mod cli;
pub mod config;
pub mod extract;
pub mod models;
pub mod repository;
pub mod services;
pub mod source;
