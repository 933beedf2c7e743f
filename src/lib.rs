pub mod assets;
pub mod config;
pub mod database;
pub mod error;
pub mod logger;
pub mod model;
pub mod service;
pub mod session;

mod macros;

#[cfg(test)]
mod testing;

pub trait Located {
    fn location(&self) -> snafu::Location;
}
