mod options;
mod settings;

pub use options::{expand_home, Options};
pub use settings::Settings;
