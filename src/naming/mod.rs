//! Output naming: a short, filesystem-safe document name per handover record.
//!
//! ```text
//! consolidated devices ─┐
//! company name ──▶ company::shorten ─┼──▶ filename::synthesize_file_name
//! identifier ───────────┘
//! ```
//!
//! Both steps are pure and never fail; missing inputs degrade to placeholder
//! tokens.

pub mod company;
pub mod filename;

pub use company::{shorten_company_name, shorten_company_name_with, CompanyFallback};
pub use filename::{synthesize_file_name, DOCUMENT_EXTENSION};
