pub mod builder;
pub mod cloud;
pub mod factory;
pub mod launcher;
pub mod services;
