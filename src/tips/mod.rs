//! Tips — content model and read-only selection queries.

pub mod model;
pub mod repository;

pub use model::{NewTip, Tip, MOST_RECENT_LABEL, RANDOM_CATEGORY};
pub use repository::TipRepository;
