mod progress;
mod walker;

pub use progress::{TreeMessage, TreeProgress};
pub use walker::{CancellationToken, TreeConfig, TreeScanner};
