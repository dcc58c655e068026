//! Current-chapter summaries for ebooks.
//!
//! Given a book and a reading position, the crate finds the enclosing
//! chapter from the table of contents, extracts and budgets its text, asks a
//! chat-completion endpoint for a summary and files the result.
//!
//! The stages live in their own modules and can be driven separately;
//! [`pipeline::summarize_current_chapter`] runs them in order.

pub mod budget;
pub mod cache;
pub mod cancellation;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod pagination;
pub mod pipeline;
pub mod store;
pub mod toc;

pub use error::{ErrorKind, RecapError, Result};
