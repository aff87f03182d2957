//! Database models split into domain-specific modules.

pub mod access;
pub mod audit;
pub mod budget;
pub mod collaborator;
pub mod guest;
pub mod guest_book;
pub mod invitation;
pub mod milestone;
pub mod photo;
pub mod stats;
pub mod user;
pub mod wedding;

pub use access::*;
pub use audit::*;
pub use budget::*;
pub use collaborator::*;
pub use guest::*;
pub use guest_book::*;
pub use invitation::*;
pub use milestone::*;
pub use photo::*;
pub use stats::*;
pub use user::*;
pub use wedding::*;
