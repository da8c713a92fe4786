pub mod bugs;
pub mod health;
pub mod notifications;
pub mod projects;
