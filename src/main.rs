mod app;
mod capture;
mod commands;
mod config;
mod error;
mod logging;
mod render;
mod setup;
mod ui;

fn main() {
    if let Err(e) = app::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
