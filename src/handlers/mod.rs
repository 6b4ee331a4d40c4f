pub mod landing_handler;
pub mod oauth;
pub mod page;

pub use landing_handler::landing_handler;
pub use oauth::{authorize_handler, callback_handler, exchange_handler};
