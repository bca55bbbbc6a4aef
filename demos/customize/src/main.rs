//! Opens the customizer. Usage: `customize [config.json] [upload-image]`.
//!
//! Finishing a design (Enter) saves both captures into the configured output
//! directory and files a checkout order into `<output_dir>/orders`. Screen
//! changes are only logged.

use std::path::{Path, PathBuf};

use tee_studio::{
    StudioConfig,
    order::{CheckoutOrder, Navigator, Order, OutboxBackend, Route, place_order},
    scene::HandOff,
};

struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&mut self, route: Route) {
        log::info!("navigating to {route:?}");
    }
}

fn file_order(hand_off: &HandOff, output_dir: &Path, outbox: &mut OutboxBackend) -> tee_studio::Result<()> {
    hand_off.views.save_in(output_dir)?;
    let order = Order::Checkout(CheckoutOrder::new("Walk-in customer", "Pick up in store", hand_off)?);
    let receipt = place_order(outbox, &mut LogNavigator, &order)?;
    log::info!("design filed as {}", receipt.order_id);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "studio.json".to_string());
    let upload_path = args.next().map(PathBuf::from);

    let config = StudioConfig::load(&config_path)?;
    let output_dir = config.output_dir.clone();
    let mut outbox = OutboxBackend::new(output_dir.join("orders"));

    tee_studio::run(config, upload_path, LogNavigator, move |hand_off| {
        if let Err(e) = file_order(&hand_off, &output_dir, &mut outbox) {
            log::error!("could not file the design: {e}");
        }
    })
}
