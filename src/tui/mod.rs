mod app;
mod event;
mod form;
mod keymap;
pub mod theme;
mod ui;

use anyhow::Result;

use crate::config::Config;
use crate::routes::Route;
use crate::store::Store;

/// Take over the terminal until the user quits.
pub fn run(store: Store, config: Config, route: Route) -> Result<()> {
    let mut app = app::App::new(store, config, route)?;
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}
