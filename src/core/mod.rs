pub mod analytics;
pub mod assistant;
pub mod group;
pub mod purpose;
pub mod reminder;
pub mod streak;
pub mod suggestion;
pub mod task;
pub mod user;
