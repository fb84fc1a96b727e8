pub mod admin;
pub mod components;
pub mod login;
pub mod member;
