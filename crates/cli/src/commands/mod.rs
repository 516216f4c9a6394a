pub mod classify;
pub mod health;
pub mod search;

pub use classify::ClassifyCommand;
pub use health::HealthCommand;
pub use search::SearchCommand;
