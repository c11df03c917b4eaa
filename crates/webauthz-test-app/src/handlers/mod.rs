pub mod auth;
pub mod main_page;
pub mod resource;
pub mod webauthz;
