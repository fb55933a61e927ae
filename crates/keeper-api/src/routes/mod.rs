//! # Route Modules
//!
//! | Prefix | Module | Auth |
//! |--------|--------|------|
//! | `/health` | [`health`] | none |
//! | `/api/uploads/*` | [`uploads`] | bearer gate |
//! | `/media/*` | [`media`] | none |

pub mod health;
pub mod media;
pub mod uploads;
