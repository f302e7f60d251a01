pub mod auth;
pub mod detect;
pub mod specs;
