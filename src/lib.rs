pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod display;
pub mod entity;
pub mod filter;
pub mod notify;
pub mod output;
pub mod pagination;
pub mod resolver;
pub mod screens;
pub mod source;
pub mod view;

#[cfg(test)]
mod tests;
